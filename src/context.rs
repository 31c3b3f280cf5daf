//! Renderer bookkeeping, kept in side tables instead of on the nodes themselves.
//!
//! Entries hold a [`WeakNode`] back-reference and are swept once their node is dropped.

use crate::{
	component::Instance,
	diff::WeakGoverned,
	dom::{Namespace, Node, NodeId, WeakNode},
	template::{FunctionComponent, Props, State, VFunction},
	value::Key,
};
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

/// What the renderer remembers about one node.
#[derive(Default)]
pub(crate) struct Context {
	pub key: RefCell<Option<Key>>,
	/// The last applied property bag.
	pub props: RefCell<Props>,
	/// Keys and fragments of this node's child list.
	pub children: RefCell<ScopeState>,
	/// An empty text node standing in for a functional component that rendered nothing.
	pub placeholder: Cell<bool>,
	/// The instance whose slot list this node is in.
	pub slotted_in: RefCell<Weak<Instance>>,
	/// Fragments whose range was recorded as starting or ending here.
	pub boundary_of: RefCell<Vec<Weak<FragmentContext>>>,
}

/// Keyed nodes and functional fragments of one reconciliation scope.
#[derive(Default)]
pub(crate) struct ScopeState {
	pub keys: HashMap<Key, Node>,
	pub fragments: Vec<Rc<FragmentContext>>,
}
impl ScopeState {
	pub fn kill(self) {
		for fragment in self.fragments {
			fragment.kill();
		}
	}
}

/// Where a fragment's nodes live.
#[derive(Clone)]
pub(crate) struct Site {
	pub governed: WeakGoverned,
	pub host: Weak<Instance>,
	pub namespace: Namespace,
}

/// The persistent part of one functional component instance.
pub(crate) struct FragmentContext {
	pub function: FunctionComponent,
	pub key: Option<Key>,
	pub state: RefCell<State>,
	alive: Cell<bool>,
	pub invocation: RefCell<Option<Rc<VFunction>>>,
	/// First and last node of the range rendered last.
	pub start: RefCell<Option<Node>>,
	pub end: RefCell<Option<Node>>,
	pub placeholder: RefCell<Option<Node>>,
	pub scope: RefCell<ScopeState>,
	pub parent: RefCell<Weak<FragmentContext>>,
	pub site: RefCell<Option<Site>>,
	pub update_scheduled: Cell<bool>,
	cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
}
impl FragmentContext {
	pub fn new(function: FunctionComponent, key: Option<Key>) -> Self {
		Self {
			function,
			key,
			state: RefCell::default(),
			alive: Cell::new(true),
			invocation: RefCell::default(),
			start: RefCell::default(),
			end: RefCell::default(),
			placeholder: RefCell::default(),
			scope: RefCell::default(),
			parent: RefCell::default(),
			site: RefCell::default(),
			update_scheduled: Cell::new(false),
			cleanups: RefCell::default(),
		}
	}

	pub fn is_alive(&self) -> bool {
		self.alive.get()
	}

	fn is_bounded_by(&self, node: &Node) -> bool {
		self.start.borrow().as_ref() == Some(node) || self.end.borrow().as_ref() == Some(node)
	}

	pub fn on_stale(&self, cleanup: Box<dyn FnOnce()>) {
		self.cleanups.borrow_mut().push(cleanup);
	}

	/// Marks this fragment and its nested ones stale. Pending updates are discarded from here on.
	pub fn kill(&self) {
		if !self.alive.replace(false) {
			return;
		}
		trace!("Killing fragment of {:?}", self.function);
		self.run_cleanups();
		let scope = self.scope.take();
		scope.kill();
	}

	fn run_cleanups(&self) {
		let cleanups = self.cleanups.take();
		for cleanup in cleanups {
			cleanup();
		}
	}
}
impl Drop for FragmentContext {
	fn drop(&mut self) {
		self.alive.set(false);
		self.run_cleanups();
	}
}

#[derive(Default)]
pub(crate) struct ContextStore(RefCell<HashMap<NodeId, (WeakNode, Rc<Context>)>>);
impl ContextStore {
	pub fn get(&self, node: &Node) -> Option<Rc<Context>> {
		self.0.borrow().get(&node.id()).map(|(_, context)| context.clone())
	}

	pub fn get_or_create(&self, node: &Node) -> Rc<Context> {
		self.0
			.borrow_mut()
			.entry(node.id())
			.or_insert_with(|| (node.downgrade(), Rc::default()))
			.1
			.clone()
	}

	pub fn remove(&self, node: &Node) -> Option<Rc<Context>> {
		self.0.borrow_mut().remove(&node.id()).map(|(_, context)| context)
	}

	pub fn key(&self, node: &Node) -> Option<Key> {
		self.get(node).and_then(|context| context.key.borrow().clone())
	}

	pub fn is_placeholder(&self, node: &Node) -> bool {
		self.get(node).map_or(false, |context| context.placeholder.get())
	}

	pub fn slotted_in(&self, node: &Node) -> Option<Rc<Instance>> {
		self.get(node).and_then(|context| context.slotted_in.borrow().upgrade())
	}

	pub fn set_slotted_in(&self, node: &Node, instance: Option<&Rc<Instance>>) {
		match instance {
			Some(instance) => *self.get_or_create(node).slotted_in.borrow_mut() = Rc::downgrade(instance),
			None => {
				if let Some(context) = self.get(node) {
					*context.slotted_in.borrow_mut() = Weak::new();
				}
			}
		}
	}

	/// Records that `fragment`'s range starts or ends at `node`.
	pub fn mark_boundary(&self, node: &Node, fragment: &Rc<FragmentContext>) {
		let context = self.get_or_create(node);
		let mut boundary_of = context.boundary_of.borrow_mut();
		boundary_of.retain(|bounded| {
			bounded
				.upgrade()
				.map_or(false, |bounded| bounded.is_alive() && !Rc::ptr_eq(&bounded, fragment) && bounded.is_bounded_by(node))
		});
		boundary_of.push(Rc::downgrade(fragment));
	}

	/// The live fragments whose range currently starts or ends at `node`.
	pub fn boundary_of(&self, node: &Node) -> Vec<Rc<FragmentContext>> {
		self.get(node).map_or_else(Vec::new, |context| {
			context
				.boundary_of
				.borrow()
				.iter()
				.filter_map(Weak::upgrade)
				.filter(|fragment| fragment.is_alive() && fragment.is_bounded_by(node))
				.collect()
		})
	}

	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	/// Drops the entries of dropped nodes. Returns how many were removed.
	pub fn sweep(&self) -> usize {
		let dead: Vec<Rc<Context>> = self
			.0
			.borrow_mut()
			.drain_filter(|_, (node, _)| !node.is_alive())
			.map(|(_, (_, context))| context)
			.collect();
		let count = dead.len();
		for context in dead {
			if let Ok(context) = Rc::try_unwrap(context) {
				context.children.into_inner().kill();
			}
		}
		count
	}
}
