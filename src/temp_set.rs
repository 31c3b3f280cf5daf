use hashbrown::HashSet;

/// A reusable scratch set of string slices, used to diff class token lists without reallocating.
#[derive(Default)]
pub struct TempTokenSet(HashSet<&'static str>);
impl TempTokenSet {
	pub fn new() -> Self {
		Self(HashSet::new())
	}

	pub fn temp<'a>(&mut self) -> &mut HashSet<&'a str> {
		unsafe {
			//SAFETY: The collection is cleared before each borrow, so no values can leak between them.
			// The returned borrow is tied to `self`, so the set can't be reached through another `temp` call while in use.
			self.0.clear();
			&mut *(&mut self.0 as *mut HashSet<&'static str>).cast()
		}
	}

	/// Retrieves the cache set's capacity without clearing it first.
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}
