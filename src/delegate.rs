//! Event delegation.
//!
//! Each (root, event name) pair gets exactly one native listener, shared by all delegations of that event on the root
//! and reference-counted through an [`RcHashMap`].

use crate::{
	dom::{Event, Node},
	error::DelegationError,
	rc_hash_map::RcHashMap,
	runtime::Runtime,
	selector::SelectorList,
	value::Callback,
};
use std::rc::Rc;
use tracing::{error, instrument, trace, trace_span};

#[derive(Clone)]
struct Delegation {
	event: Rc<str>,
	selector: Option<SelectorList>,
	callback: Callback,
}
impl Delegation {
	fn is(&self, event: &str, selector: Option<&str>, callback: &Callback) -> bool {
		*self.event == *event && self.selector.as_ref().map(SelectorList::source) == selector && self.callback == *callback
	}
}

/// The delegations of one root.
#[derive(Default)]
pub(crate) struct Delegations {
	listeners: RcHashMap<Rc<str>, u32, Callback>,
	entries: Vec<Delegation>,
}

fn validate(root: &Node, event: &str, selector: Option<&str>) -> Result<Option<SelectorList>, DelegationError> {
	if !root.is_element() {
		return Err(DelegationError::InvalidRoot);
	}
	if event.is_empty() {
		return Err(DelegationError::EmptyEventName);
	}
	Ok(selector.map(SelectorList::parse).transpose()?)
}

impl Runtime {
	/// Calls `callback` for `event`s reaching `root` from a descendant matching `selector`,
	/// or for every such event reaching `root` if `selector` is [`None`].
	///
	/// Registering the same (event, selector, callback) triple again has no effect.
	///
	/// # Errors
	///
	/// Iff the root isn't an element, the event name is empty or the selector is invalid. Nothing is attached then.
	#[instrument(skip(self, callback))]
	pub fn delegate_event_listener(&self, root: &Node, event: &str, selector: Option<&str>, callback: Callback) -> Result<(), DelegationError> {
		let parsed = validate(root, event, selector)?;
		let listener = {
			let mut delegations = self.shared().delegations.borrow_mut();
			let (_, delegations) = delegations
				.entry(root.id())
				.or_insert_with(|| (root.downgrade(), Delegations::default()));
			if delegations.entries.iter().any(|entry| entry.is(event, selector, &callback)) {
				trace!("Already delegated.");
				return Ok(());
			}
			delegations.entries.push(Delegation {
				event: event.into(),
				selector: parsed,
				callback,
			});
			match delegations
				.listeners
				.increment_or_insert_with(event.into(), || self.native_listener(root))
			{
				Ok((listener, true)) => Some(listener.clone()),
				Ok((_, false)) => None,
				Err(error) => {
					error!("Could not count delegation of {:?}: {}", event, error);
					None
				}
			}
		};
		if let Some(listener) = listener {
			trace!("Attaching native {:?} listener.", event);
			root.add_event_listener(event, listener);
		}
		Ok(())
	}

	/// Removes the delegation registered with exactly these arguments, if any.
	///
	/// # Errors
	///
	/// As for [`Runtime::delegate_event_listener`].
	#[instrument(skip(self, callback))]
	pub fn undelegate_event_listener(&self, root: &Node, event: &str, selector: Option<&str>, callback: &Callback) -> Result<(), DelegationError> {
		validate(root, event, selector)?;
		let detached: Vec<(Rc<str>, Callback)> = {
			let mut delegations = self.shared().delegations.borrow_mut();
			let delegations = match delegations.get_mut(&root.id()) {
				Some((_, delegations)) => delegations,
				None => return Ok(()),
			};
			match delegations.entries.iter().position(|entry| entry.is(event, selector, callback)) {
				Some(index) => {
					delegations.entries.remove(index);
					if let Err(error) = delegations.listeners.weak_decrement(event) {
						error!("Could not count delegation of {:?}: {}", event, error);
					}
					delegations.listeners.drain_weak().collect()
				}
				None => vec![],
			}
		};
		for (event, listener) in detached {
			trace!("Detaching native {:?} listener.", event);
			root.remove_event_listener(&event, &listener);
		}
		Ok(())
	}

	/// Removes every delegation on `root`, for all events.
	///
	/// # Errors
	///
	/// [`DelegationError::InvalidRoot`] iff `root` isn't an element.
	#[instrument(skip(self))]
	pub fn undelegate_all_event_listeners(&self, root: &Node) -> Result<(), DelegationError> {
		if !root.is_element() {
			return Err(DelegationError::InvalidRoot);
		}
		let removed = self.shared().delegations.borrow_mut().remove(&root.id());
		if let Some((_, mut delegations)) = removed {
			for (event, listener) in delegations.listeners.drain() {
				root.remove_event_listener(&event, &listener);
			}
		}
		Ok(())
	}

	fn native_listener(&self, root: &Node) -> Callback {
		let runtime = self.downgrade();
		let root = root.downgrade();
		Callback::new(move |event| {
			if let (Some(shared), Some(root)) = (runtime.upgrade(), root.upgrade()) {
				Runtime::from_shared(shared).dispatch_delegated(&root, event);
			}
		})
	}

	fn dispatch_delegated(&self, root: &Node, event: &Event) {
		let entries: Vec<Delegation> = match self.shared().delegations.borrow().get(&root.id()) {
			Some((_, delegations)) => delegations
				.entries
				.iter()
				.filter(|entry| *entry.event == *event.event_type())
				.cloned()
				.collect(),
			None => return,
		};

		let span = trace_span!("Delegating event", event = event.event_type(), candidates = entries.len());
		let _enter = span.enter();

		self.batch(|| {
			let mut fired = vec![false; entries.len()];
			let mut node = event.target();
			while let Some(current) = node {
				if current == *root {
					break;
				}
				for (entry, fired) in entries.iter().zip(fired.iter_mut()) {
					match &entry.selector {
						Some(selector) if !*fired && selector.matches(&current) => {
							*fired = true;
							entry.callback.call(event);
							if event.immediate_propagation_stopped() {
								return;
							}
						}
						_ => (),
					}
				}
				if event.propagation_stopped() {
					return;
				}
				node = current.parent_node();
			}
			for entry in entries.iter().filter(|entry| entry.selector.is_none()) {
				entry.callback.call(event);
				if event.immediate_propagation_stopped() {
					return;
				}
			}
		});
	}
}
