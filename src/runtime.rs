//! The explicit registry object everything else hangs off.

use crate::{
	component::{ComponentClass, Host, Instance},
	context::{ContextStore, FragmentContext},
	css::css,
	delegate::Delegations,
	diff::Differ,
	dom::{Document, Namespace, Node, NodeId, WeakNode},
	error::{DomError, PropertyError},
	property::Reflection,
	template::{h, Props, Template},
	temp_set::TempTokenSet,
	value::Callback,
};
use core::{
	cell::{Cell, RefCell, RefMut},
	fmt::{self, Debug, Formatter},
	iter,
};
use futures::{
	channel::oneshot,
	executor::{LocalPool, LocalSpawner},
	future::LocalBoxFuture,
	task::LocalSpawnExt,
};
use hashbrown::HashMap;
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, trace_span, warn};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Options {
	/// How deep templates may nest before the renderer gives up on a branch (logging an error).
	pub depth_limit: usize,
	/// Whether [`Runtime::define`] upgrades matching elements already in the document.
	pub upgrade_on_define: bool,
}
impl Default for Options {
	fn default() -> Self {
		Self {
			depth_limit: 512,
			upgrade_on_define: true,
		}
	}
}

/// How many queued updates one batch may run before the rest is dropped.
const FLUSH_LIMIT: usize = 100_000;

pub(crate) enum Task {
	Instance(Weak<Instance>),
	Fragment(Weak<FragmentContext>),
}

/// Owns a [`Document`] and everything the custom element machinery tracks about it.
///
/// Cloning shares the runtime.
#[derive(Clone)]
pub struct Runtime(Rc<Shared>);
pub(crate) struct Shared {
	document: Document,
	options: Options,
	pub(crate) definitions: RefCell<HashMap<Rc<str>, ComponentClass>>,
	pub(crate) pending: RefCell<HashMap<Rc<str>, Vec<oneshot::Sender<()>>>>,
	instances: RefCell<HashMap<NodeId, (WeakNode, Rc<Instance>)>>,
	contexts: ContextStore,
	pub(crate) delegations: RefCell<HashMap<NodeId, (WeakNode, Delegations)>>,
	styles: RefCell<HashMap<(Rc<str>, Rc<str>), Rc<str>>>,
	token_set: RefCell<TempTokenSet>,
	queue: RefCell<VecDeque<Task>>,
	batch_depth: Cell<usize>,
	pool: RefCell<LocalPool>,
	spawner: LocalSpawner,
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

impl Runtime {
	#[must_use]
	pub fn new() -> Self {
		Self::with_options(Options::default())
	}

	#[must_use]
	pub fn with_options(options: Options) -> Self {
		Self::with_document(Document::new(), options)
	}

	/// A runtime for an existing document, for example one filled by [`load`](`crate::load`).
	///
	/// Nothing is upgraded until [`Runtime::define`] or [`Runtime::upgrade`] runs.
	#[must_use]
	pub fn with_document(document: Document, options: Options) -> Self {
		let pool = LocalPool::new();
		let spawner = pool.spawner();
		Self(Rc::new(Shared {
			document,
			options,
			definitions: RefCell::default(),
			pending: RefCell::default(),
			instances: RefCell::default(),
			contexts: ContextStore::default(),
			delegations: RefCell::default(),
			styles: RefCell::default(),
			token_set: RefCell::new(TempTokenSet::new()),
			queue: RefCell::default(),
			batch_depth: Cell::new(0),
			pool: RefCell::new(pool),
			spawner,
		}))
	}

	pub(crate) fn from_shared(shared: Rc<Shared>) -> Self {
		Self(shared)
	}

	pub(crate) fn downgrade(&self) -> Weak<Shared> {
		Rc::downgrade(&self.0)
	}

	pub(crate) fn shared(&self) -> &Shared {
		&self.0
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.0.document
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.0.options
	}

	pub(crate) fn contexts(&self) -> &ContextStore {
		&self.0.contexts
	}

	pub(crate) fn token_set(&self) -> RefMut<'_, TempTokenSet> {
		self.0.token_set.borrow_mut()
	}

	pub(crate) fn token_set_capacity(&self) -> usize {
		self.0.token_set.borrow().capacity()
	}

	pub(crate) fn definition(&self, name: &str) -> Option<ComponentClass> {
		self.0.definitions.borrow().get(name).cloned()
	}

	pub(crate) fn instance(&self, node: &Node) -> Option<Rc<Instance>> {
		self.0.instances.borrow().get(&node.id()).map(|(_, instance)| instance.clone())
	}

	/// The component handle of an upgraded element.
	#[must_use]
	pub fn host(&self, node: &Node) -> Option<Host> {
		self.instance(node).map(|instance| Host::new(self.clone(), instance))
	}

	/// Makes `template` the complete description of `root`'s children.
	///
	/// For an upgraded component, that's its light-DOM children, which it projects through its slots.
	///
	/// Returns the rendered children afterwards. Roots that can't have children are left alone.
	#[instrument(skip(self, template))]
	pub fn render(&self, root: &Node, template: impl Into<Template>) -> Vec<Node> {
		if !root.is_container() {
			warn!("Render root {:?} can't have children; nothing was rendered.", root);
			return vec![];
		}
		let template = template.into();
		match self.instance(root) {
			Some(instance) => {
				self.batch(|| Differ::new(self).update_slot_children(root, &instance, &template));
				instance.slot_children.borrow().clone()
			}
			None => {
				self.batch(|| Differ::new(self).update_child_nodes(root, None, &template));
				root.child_nodes()
			}
		}
	}

	// Batching.

	/// Runs `f`, then (for the outermost call) every update it scheduled.
	pub(crate) fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
		let depth = self.0.batch_depth.get();
		self.0.batch_depth.set(depth + 1);
		let result = f();
		if depth == 0 {
			self.flush();
		}
		self.0.batch_depth.set(depth);
		result
	}

	fn flush(&self) {
		let span = trace_span!("Flushing updates");
		let _enter = span.enter();

		let mut count = 0_usize;
		loop {
			let task = self.0.queue.borrow_mut().pop_front();
			let task = match task {
				Some(task) => task,
				None => break,
			};
			count += 1;
			if count > FLUSH_LIMIT {
				error!("Update limit of {} reached in one batch; dropping the remaining updates. Is something re-rendering itself unconditionally?", FLUSH_LIMIT);
				self.0.queue.borrow_mut().clear();
				break;
			}
			match task {
				Task::Instance(instance) => {
					if let Some(instance) = instance.upgrade() {
						if instance.update_scheduled.get() {
							self.render_instance(&instance);
						}
					}
				}
				Task::Fragment(fragment) => {
					if let Some(fragment) = fragment.upgrade() {
						if fragment.update_scheduled.replace(false) {
							Differ::new(self).update_fragment(&fragment);
						}
					}
				}
			}
		}
		if count > 0 {
			trace!("Ran {} update(s).", count);
		}
		self.sweep();
	}

	pub(crate) fn schedule_instance(&self, instance: &Rc<Instance>) {
		if !instance.update_scheduled.replace(true) {
			trace!("Scheduling render of {:?}", instance);
			self.batch(|| self.0.queue.borrow_mut().push_back(Task::Instance(Rc::downgrade(instance))));
		}
	}

	pub(crate) fn schedule_fragment(&self, fragment: &Rc<FragmentContext>) {
		if !fragment.update_scheduled.replace(true) {
			self.batch(|| self.0.queue.borrow_mut().push_back(Task::Fragment(Rc::downgrade(fragment))));
		}
	}

	/// Drops side table entries of dropped nodes.
	fn sweep(&self) {
		let contexts = self.0.contexts.sweep();
		let instances: Vec<_> = self
			.0
			.instances
			.borrow_mut()
			.drain_filter(|_, (element, _)| !element.is_alive())
			.collect();
		let delegations: Vec<_> = self
			.0
			.delegations
			.borrow_mut()
			.drain_filter(|_, (root, _)| !root.is_alive())
			.collect();
		if contexts + instances.len() + delegations.len() > 0 {
			trace!(
				"Swept {} context(s), {} instance(s) and {} delegation root(s).",
				contexts,
				instances.len(),
				delegations.len()
			);
		}
	}

	// Async interpolation.

	pub(crate) fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		if let Err(error) = self.0.spawner.spawn_local(future) {
			error!("Could not spawn interpolation task: {}", error);
		}
	}

	/// Polls pending thenables and observables until none can make progress, applying the updates they request.
	pub fn run_until_stalled(&self) {
		match self.0.pool.try_borrow_mut() {
			Ok(mut pool) => pool.run_until_stalled(),
			Err(_) => warn!("`run_until_stalled` called from within an interpolation task; ignored."),
		}
	}

	// Components.

	/// Creates the instance for `element`, up to (but excluding) its initial render.
	#[instrument(skip(self), fields(class = class.name()))]
	pub(crate) fn construct(&self, element: &Node, class: &ComponentClass) -> Rc<Instance> {
		let instance = Rc::new(Instance::new(class.clone(), element));
		self.0
			.instances
			.borrow_mut()
			.insert(element.id(), (element.downgrade(), instance.clone()));

		let slot_children = element.child_nodes();
		for child in &slot_children {
			self.0.contexts.set_slotted_in(child, Some(&instance));
		}
		*instance.slot_children.borrow_mut() = slot_children;

		let flattened = class.flattened();
		let mut properties: Vec<_> = flattened.properties.values().collect();
		properties.sort_by(|a, b| a.name().cmp(b.name()));
		for property in properties {
			let default = property.default_value();
			if default.is_null() {
				continue;
			}
			instance.values.borrow_mut().insert(property.name().into(), default.clone());
			if let Some(attribute) = property.attribute_name() {
				if let (false, Reflection::Set(value)) = (element.has_attribute(attribute), property.to_attribute(default)) {
					element.set_attribute(attribute, &value);
				}
			}
		}

		if !flattened.styles.is_empty() {
			if let Some(definition) = class.definition() {
				element.set_attribute(":scope", &definition.name);
			}
		}

		for listener in &flattened.listeners {
			let runtime = self.downgrade();
			let weak_instance = Rc::downgrade(&instance);
			let callback = listener.callback.clone();
			let callback = Callback::new(move |event| {
				if let (Some(shared), Some(instance)) = (runtime.upgrade(), weak_instance.upgrade()) {
					callback(&Host::new(Runtime(shared), instance), event);
				}
			});
			if let Err(error) = self.delegate_event_listener(element, &listener.event, listener.selector.as_deref(), callback) {
				error!("Could not attach class listener for {:?}: {}", listener.event, error);
			}
		}

		instance
	}

	/// Marks `instance` initialized and runs its initial render.
	pub(crate) fn initialize(&self, instance: &Rc<Instance>) {
		instance.initialized.set(true);
		self.render_instance(instance);
	}

	pub(crate) fn render_instance(&self, instance: &Rc<Instance>) {
		let element = match instance.element.upgrade() {
			Some(element) => element,
			None => return,
		};
		if instance.rendering.replace(true) {
			trace!("Render of {:?} requested while rendering; deferring.", instance);
			instance.update_scheduled.set(false);
			self.schedule_instance(instance);
			return;
		}
		instance.update_scheduled.set(false);

		let span = trace_span!("Rendering component", class = instance.class.name());
		let _enter = span.enter();

		let host = Host::new(self.clone(), instance.clone());
		let template = instance.behavior.render(&host);
		let template = match self.scoped_styles(&instance.class) {
			Some(styles) => Template::List(vec![h("style", Props::new(), vec![Template::Text(styles)]), template].into()),
			None => template,
		};
		Differ::new(self).update_child_nodes(&element, Some(instance), &template);
		instance.rendering.set(false);
	}

	/// The class's stylesheets scoped to its tag, cached per (tag, stylesheet).
	fn scoped_styles(&self, class: &ComponentClass) -> Option<Rc<str>> {
		let styles = &class.flattened().styles;
		if styles.is_empty() {
			return None;
		}
		let tag: Rc<str> = class.tag_name()?.into();
		let mut cache = self.0.styles.borrow_mut();
		let scoped: Vec<Rc<str>> = styles
			.iter()
			.map(|style| {
				cache
					.entry((tag.clone(), style.clone()))
					.or_insert_with(|| css(&tag, style).into())
					.clone()
			})
			.collect();
		Some(scoped.join("\n").into())
	}

	/// Creates an element, as a component instance if `tag` names a defined (autonomous) custom element.
	#[must_use]
	pub fn create_element(&self, tag: &str) -> Node {
		let element = self.0.document.create_element(tag);
		if let Some(class) = self.definition(&tag.to_ascii_lowercase()).filter(|class| class.extends().is_none()) {
			self.batch(|| {
				let instance = self.construct(&element, &class);
				self.initialize(&instance);
			});
		}
		element
	}

	/// Creates a customized built-in element `<tag is="is">`.
	#[must_use]
	pub fn create_customized_element(&self, tag: &str, is: &str) -> Node {
		let element = self.0.document.create_element(tag);
		element.set_attribute("is", is);
		if let Some(class) = self
			.definition(is)
			.filter(|class| class.extends() == element.local_name().as_deref())
		{
			self.batch(|| {
				let instance = self.construct(&element, &class);
				self.initialize(&instance);
			});
		}
		element
	}

	// Life-cycle aware DOM operations.

	/// [`Node::append_child`], firing `connected`/`disconnected` callbacks.
	///
	/// # Errors
	///
	/// See [`Node::insert_before`].
	pub fn append_child(&self, parent: &Node, child: &Node) -> Result<(), DomError> {
		self.insert_before(parent, child, None)
	}

	/// [`Node::insert_before`], firing `connected`/`disconnected` callbacks.
	///
	/// # Errors
	///
	/// See [`Node::insert_before`].
	pub fn insert_before(&self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		self.batch(|| self.insert_node(parent, child, reference))
	}

	/// [`Node::remove_child`], firing `disconnected` callbacks.
	///
	/// # Errors
	///
	/// [`DomError::NotFound`] if `child` is not a child of `parent`.
	pub fn remove_child(&self, parent: &Node, child: &Node) -> Result<(), DomError> {
		if child.parent_node().as_ref() != Some(parent) {
			return Err(DomError::NotFound);
		}
		self.batch(|| self.remove_node(child));
		Ok(())
	}

	pub(crate) fn insert_node(&self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		let was_connected = child.is_connected();
		parent.insert_before(child, reference)?;
		self.connection_changed(child, was_connected);
		Ok(())
	}

	pub(crate) fn remove_node(&self, node: &Node) {
		let was_connected = node.is_connected();
		node.remove();
		self.connection_changed(node, was_connected);
	}

	fn connection_changed(&self, node: &Node, was_connected: bool) {
		match (was_connected, node.is_connected()) {
			(false, true) => {
				for node in iter::once(node.clone()).chain(node.descendants()) {
					if let Some(instance) = self.instance(&node) {
						if !instance.connected.replace(true) {
							trace!("Connected {:?}", instance);
							instance.behavior.connected(&Host::new(self.clone(), instance.clone()));
						}
					}
				}
			}
			(true, false) => {
				for node in iter::once(node.clone()).chain(node.descendants()) {
					if let Some(instance) = self.instance(&node) {
						if instance.connected.replace(false) {
							trace!("Disconnected {:?}", instance);
							instance.behavior.disconnected(&Host::new(self.clone(), instance.clone()));
						}
					}
				}
			}
			_ => (),
		}
	}

	/// [`Node::set_attribute`], notifying the component (if `element` is one and observes `name`).
	///
	/// A mapped property is updated before [`Component::attribute_changed`](`crate::Component::attribute_changed`) runs.
	///
	/// # Errors
	///
	/// If the mapped property rejected the converted value. The attribute is set regardless.
	pub fn set_attribute(&self, element: &Node, name: &str, value: &str) -> Result<(), PropertyError> {
		self.batch(|| {
			let old_value = element.set_attribute(name, value);
			if old_value.as_deref() == Some(value) {
				return Ok(());
			}
			self.attribute_changed(element, name, old_value.as_deref(), Some(value))
		})
	}

	/// [`Node::remove_attribute`], notifying the component (if `element` is one and observes `name`).
	///
	/// # Errors
	///
	/// If the mapped property rejected the converted value. The attribute is removed regardless.
	pub fn remove_attribute(&self, element: &Node, name: &str) -> Result<(), PropertyError> {
		self.batch(|| match element.remove_attribute(name) {
			Some(old_value) => self.attribute_changed(element, name, Some(&old_value), None),
			None => Ok(()),
		})
	}

	pub(crate) fn attribute_changed(&self, element: &Node, name: &str, old_value: Option<&str>, value: Option<&str>) -> Result<(), PropertyError> {
		let instance = match self.instance(element) {
			Some(instance) => instance,
			None => return Ok(()),
		};
		let name = match element.namespace() {
			Some(Namespace::Html) => name.to_ascii_lowercase(),
			_ => name.to_owned(),
		};
		if !instance.is_observed(&name) {
			return Ok(());
		}

		let span = trace_span!("Attribute changed", name = %name);
		let _enter = span.enter();

		let host = Host::new(self.clone(), instance.clone());
		let mut result = Ok(());
		if !instance.reflecting.get() {
			let class = instance.class.clone();
			if let Some(property) = class.flattened().attributes.get(&*name).and_then(|property| class.property(property)) {
				result = host.set(property.name(), property.from_attribute(value));
			}
		}
		instance.behavior.attribute_changed(&host, &name, old_value, value);
		result
	}
}

impl Debug for Runtime {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("definitions", &self.0.definitions.borrow().len())
			.field("instances", &self.0.instances.borrow().len())
			.field("contexts", &self.0.contexts.len())
			.field("options", &self.0.options)
			.finish_non_exhaustive()
	}
}
