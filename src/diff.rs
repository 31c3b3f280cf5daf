//! The reconciler.
//!
//! A pass walks templates against one *governed list* with a cursor, reusing the live node at the cursor where it's compatible
//! and inserting before it otherwise. Whatever is left between the cursor and the end of the range afterwards is removed.
//!
//! A governed list is either an element's child nodes or a component's slot list (its light-DOM children, which the component
//! projects into its own render output through slot markers).

use crate::{
	component::{ComponentClass, Host, Instance},
	context::{FragmentContext, ScopeState, Site},
	dom::{self, Namespace, Node, WeakNode},
	runtime::Runtime,
	template::{ElementKind, FunctionComponent, Invocation, Props, Template, Updater, VElement, VFunction, VSlot},
	value::{number_to_string, Key, Value},
};
use core::{
	fmt::{self, Debug, Formatter},
	slice,
};
use hashbrown::HashMap;
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Stand-in for user content in log fields.
fn redact(text: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		text
	} else {
		"<redacted>"
	}
}

#[derive(Clone)]
pub(crate) enum Governed {
	Children(Node),
	Slot(Rc<Instance>),
}
#[derive(Clone)]
pub(crate) enum WeakGoverned {
	Children(WeakNode),
	Slot(Weak<Instance>),
}
impl Governed {
	pub fn downgrade(&self) -> WeakGoverned {
		match self {
			Governed::Children(parent) => WeakGoverned::Children(parent.downgrade()),
			Governed::Slot(instance) => WeakGoverned::Slot(Rc::downgrade(instance)),
		}
	}

	fn item(&self, index: usize) -> Option<Node> {
		match self {
			Governed::Children(parent) => parent.child_at(index),
			Governed::Slot(instance) => instance.slot_children.borrow().get(index).cloned(),
		}
	}

	fn index_of(&self, node: &Node) -> Option<usize> {
		match self {
			Governed::Children(parent) => parent.index_of(node),
			Governed::Slot(instance) => instance.slot_children.borrow().iter().position(|child| child == node),
		}
	}
}
impl WeakGoverned {
	pub fn upgrade(&self) -> Option<Governed> {
		match self {
			WeakGoverned::Children(parent) => parent.upgrade().map(Governed::Children),
			WeakGoverned::Slot(instance) => instance.upgrade().map(Governed::Slot),
		}
	}
}
impl Debug for Governed {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Governed::Children(parent) => f.debug_tuple("Children").field(parent).finish(),
			Governed::Slot(instance) => f.debug_tuple("Slot").field(instance).finish(),
		}
	}
}

/// The cursor state of one pass over (a range of) a governed list.
struct Cursor {
	governed: Governed,
	/// The component whose render output this is, for slot markers.
	host: Option<Rc<Instance>>,
	namespace: Namespace,
	index: usize,
	/// The first node after the range, for partial passes.
	stop: Option<Node>,
	fragment: Option<Rc<FragmentContext>>,
	/// Whether a slot list was modified.
	changed: bool,
}

/// Matching state of one key/fragment scope during a pass.
struct Scope {
	keys: HashMap<Key, Node>,
	keyed: HashMap<Key, Rc<FragmentContext>>,
	unkeyed: VecDeque<Rc<FragmentContext>>,
	stale: Vec<Rc<FragmentContext>>,
	dropped: Vec<Node>,
	next: ScopeState,
}
impl Scope {
	fn open(previous: ScopeState) -> Self {
		let mut keyed = HashMap::new();
		let mut unkeyed = VecDeque::new();
		let mut stale = vec![];
		for fragment in previous.fragments {
			match fragment.key.clone() {
				Some(key) => {
					if let Some(duplicate) = keyed.insert(key, fragment) {
						stale.push(duplicate);
					}
				}
				None => unkeyed.push_back(fragment),
			}
		}
		Self {
			keys: previous.keys,
			keyed,
			unkeyed,
			stale,
			dropped: vec![],
			next: ScopeState::default(),
		}
	}

	/// The previous fragment to reuse for `function` at this position, if any.
	fn take_fragment(&mut self, function: &FunctionComponent, key: Option<&Key>) -> Option<Rc<FragmentContext>> {
		let candidate = match key {
			Some(key) => self.keyed.remove(key),
			None => self.unkeyed.pop_front(),
		}?;
		if candidate.function == *function {
			Some(candidate)
		} else {
			trace!("Function changed from {:?} to {:?}; state is reset.", candidate.function, function);
			self.stale.push(candidate);
			None
		}
	}

	/// Kills unmatched fragments and discards unclaimed detached keyed nodes.
	fn close(self, differ: &Differ<'_>) -> ScopeState {
		for fragment in self
			.stale
			.into_iter()
			.chain(self.keyed.into_iter().map(|(_, fragment)| fragment))
			.chain(self.unkeyed)
		{
			fragment.kill();
		}
		for node in self.keys.into_iter().map(|(_, node)| node).chain(self.dropped) {
			differ.discard(&node);
		}
		self.next
	}
}

pub(crate) struct Differ<'a> {
	runtime: &'a Runtime,
}
impl<'a> Differ<'a> {
	pub fn new(runtime: &'a Runtime) -> Self {
		Self { runtime }
	}

	/// Makes `template` the complete description of `parent`'s child nodes.
	#[instrument(skip(self, template))]
	pub fn update_child_nodes(&self, parent: &Node, host: Option<&Rc<Instance>>, template: &Template) {
		self.update_list(
			Governed::Children(parent.clone()),
			host.cloned(),
			child_namespace(parent),
			slice::from_ref(template),
			self.runtime.options().depth_limit,
		);
		self.check_token_set();
	}

	/// Makes `template` the complete description of `instance`'s slot list (its light-DOM children).
	///
	/// Schedules a render of the instance if the list changed.
	#[instrument(skip(self, instance, template))]
	pub fn update_slot_children(&self, element: &Node, instance: &Rc<Instance>, template: &Template) {
		let changed = self.update_list(
			Governed::Slot(instance.clone()),
			None,
			child_namespace(element),
			slice::from_ref(template),
			self.runtime.options().depth_limit,
		);
		if changed && instance.initialized.get() {
			self.runtime.schedule_instance(instance);
		}
		self.check_token_set();
	}

	fn check_token_set(&self) {
		if STATIC_MAX_LEVEL >= Level::WARN && self.runtime.token_set_capacity() >= 100 {
			warn!(
				"The class token diff set capacity is large ({}).\n\
				This may point to very long class lists in templates.",
				self.runtime.token_set_capacity()
			);
		}
	}

	/// Returns whether a slot list was modified.
	fn update_list(&self, governed: Governed, host: Option<Rc<Instance>>, namespace: Namespace, templates: &[Template], depth_limit: usize) -> bool {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return false;
		}

		let mut scope = Scope::open(self.take_scope(&governed));
		let mut level = Cursor {
			governed,
			host,
			namespace,
			index: 0,
			stop: None,
			fragment: None,
			changed: false,
		};
		for template in templates {
			self.diff(&mut level, &mut scope, template, depth_limit - 1);
		}
		let removed = self.remove_trailing(&mut level);
		let state = scope.close(self);
		self.store_scope(&level.governed, state);
		for node in removed {
			self.discard(&node);
		}
		level.changed
	}

	fn take_scope(&self, governed: &Governed) -> ScopeState {
		match governed {
			Governed::Children(parent) => self.runtime.contexts().get_or_create(parent).children.take(),
			Governed::Slot(instance) => instance.slot_scope.take(),
		}
	}

	fn store_scope(&self, governed: &Governed, state: ScopeState) {
		let previous = match governed {
			Governed::Children(parent) => self.runtime.contexts().get_or_create(parent).children.replace(state),
			Governed::Slot(instance) => instance.slot_scope.replace(state),
		};
		// Only set if a nested pass ran over the same list, which the batch queue prevents.
		previous.kill();
	}

	fn diff(&self, level: &mut Cursor, scope: &mut Scope, template: &Template, depth_limit: usize) {
		if depth_limit == 0 {
			return error!("Depth limit reached");
		}

		match template {
			Template::Empty => (),
			Template::Text(text) => self.diff_text(level, text),
			Template::Fragment(items) | Template::List(items) => {
				for item in items.iter() {
					self.diff(level, scope, item, depth_limit - 1);
				}
			}
			Template::Element(element) => self.diff_element(level, scope, element, depth_limit),
			Template::Function(function) => self.diff_function(level, scope, function, depth_limit),
			Template::Slot(slot) => self.diff_slot(level, scope, slot, depth_limit),
			Template::Node(node) => {
				let span = trace_span!("Placing node", ?node);
				let _enter = span.enter();
				self.place(level, node);
			}
			Template::Thenable(thenable) => {
				let function = interpolation(thenable.component());
				self.diff_function(level, scope, &function, depth_limit);
			}
			Template::Observable(observable) => {
				let function = interpolation(observable.component());
				self.diff_function(level, scope, &function, depth_limit);
			}
		}
	}

	/// The live node at the cursor, unless the range ends there.
	fn current(&self, level: &Cursor) -> Option<Node> {
		level.governed.item(level.index).filter(|node| Some(node) != level.stop.as_ref())
	}

	/// Whether this pass may reuse or key-discard `node`.
	fn owns(&self, level: &Cursor, node: &Node) -> bool {
		let contexts = self.runtime.contexts();
		if contexts.is_placeholder(node) {
			return false;
		}
		match (contexts.slotted_in(node), &level.governed) {
			(None, _) => true,
			(Some(slotted_in), Governed::Slot(instance)) => Rc::ptr_eq(&slotted_in, instance),
			(Some(_), Governed::Children(_)) => false,
		}
	}

	fn place(&self, level: &mut Cursor, node: &Node) {
		self.place_as(level, node, true);
	}

	/// Places `node` at the cursor. Unless `claim` is set, a slot list it's added to doesn't take it over
	/// from the component whose light DOM it is.
	fn place_as(&self, level: &mut Cursor, node: &Node, claim: bool) {
		let current = level.governed.item(level.index);
		if current.as_ref() == Some(node) {
			level.index += 1;
			return;
		}
		self.insert(level, node, current.as_ref(), claim);
		level.index = level.governed.index_of(node).map_or(level.index + 1, |index| index + 1);
	}

	fn insert(&self, level: &mut Cursor, node: &Node, before: Option<&Node>, claim: bool) {
		match &level.governed {
			Governed::Children(parent) => {
				if let Err(error) = self.runtime.insert_node(parent, node, before) {
					error!("Could not insert {:?} into {:?}: {}", node, parent, error);
				}
			}
			Governed::Slot(instance) => {
				{
					let mut children = instance.slot_children.borrow_mut();
					children.retain(|child| child != node);
					let index = before
						.and_then(|before| children.iter().position(|child| child == before))
						.unwrap_or(children.len());
					children.insert(index, node.clone());
				}
				if claim {
					self.runtime.contexts().set_slotted_in(node, Some(instance));
				}
				level.changed = true;
			}
		}
	}

	fn remove(&self, level: &mut Cursor, node: &Node) {
		match &level.governed {
			Governed::Children(parent) => {
				if node.parent_node().as_ref() == Some(parent) {
					self.runtime.remove_node(node);
				}
			}
			Governed::Slot(instance) => {
				instance.slot_children.borrow_mut().retain(|child| child != node);
				let contexts = self.runtime.contexts();
				// A forwarded node stays where its owner put it. Re-rendering this component takes it out of its output.
				if contexts.slotted_in(node).map_or(true, |owner| Rc::ptr_eq(&owner, instance)) {
					contexts.set_slotted_in(node, None);
					if node.parent_node().is_some() {
						self.runtime.remove_node(node);
					}
				}
				level.changed = true;
			}
		}
	}

	/// Removes everything from the cursor up to the end of the range.
	fn remove_trailing(&self, level: &mut Cursor) -> Vec<Node> {
		let mut removed = vec![];
		while let Some(node) = self.current(level) {
			trace!("Removing {:?}", node);
			self.remove(level, &node);
			if level.governed.item(level.index).as_ref() == Some(&node) {
				error!("{:?} could not be removed from {:?}", node, level.governed);
				break;
			}
			removed.push(node);
		}
		removed
	}

	/// Drops the renderer state of a detached subtree and kills its fragments.
	///
	/// Slot children of discarded components go with them.
	/// Projected nodes of components outside the subtree are left alone.
	fn discard(&self, node: &Node) {
		let contexts = self.runtime.contexts();
		if node.parent_node().is_some() || contexts.slotted_in(node).is_some() {
			return;
		}

		let mut stack = vec![(node.clone(), true)];
		while let Some((node, claimed)) = stack.pop() {
			if !claimed && contexts.slotted_in(&node).is_some() {
				continue;
			}
			if let Some(context) = contexts.remove(&node) {
				context.children.take().kill();
			}
			if let Some(instance) = self.runtime.instance(&node) {
				instance.slot_scope.take().kill();
				stack.extend(instance.slot_children.borrow().iter().map(|child| (child.clone(), true)));
			}
			stack.extend(node.child_nodes().into_iter().map(|child| (child, false)));
		}
	}

	/// Whether `node` starts or ends the range of a live fragment this pass isn't rendering into.
	fn is_foreign_boundary(&self, level: &Cursor, node: &Node) -> bool {
		self.runtime.contexts().boundary_of(node).iter().any(|fragment| {
			let mut enclosing = level.fragment.clone();
			while let Some(current) = enclosing {
				if Rc::ptr_eq(&current, fragment) {
					return false;
				}
				enclosing = current.parent.borrow().upgrade();
			}
			true
		})
	}

	fn diff_text(&self, level: &mut Cursor, text: &str) {
		let span = trace_span!("Diffing text", text = redact(text));
		let _enter = span.enter();

		let contexts = self.runtime.contexts();
		match self
			.current(level)
			.filter(|node| {
				node.is_text() && self.owns(level, node) && contexts.key(node).is_none() && !self.is_foreign_boundary(level, node)
			})
		{
			Some(node) => {
				if node.data() != text {
					node.set_data(text);
				}
				level.index += 1;
			}
			None => {
				let node = self.runtime.document().create_text_node(text);
				self.place(level, &node);
			}
		}
	}

	#[allow(clippy::too_many_lines)]
	fn diff_element(&self, level: &mut Cursor, scope: &mut Scope, element: &VElement, depth_limit: usize) {
		let (tag, namespace, is, class) = match &element.kind {
			ElementKind::Tag(tag) => {
				let namespace = match &*tag.to_ascii_lowercase() {
					"svg" => Namespace::Svg,
					"math" => Namespace::MathMl,
					_ => level.namespace,
				};
				let tag: Rc<str> = match namespace {
					Namespace::Html => tag.to_ascii_lowercase().into(),
					Namespace::Svg | Namespace::MathMl => tag.clone(),
				};
				let class = match &element.is {
					Some(is) => self.runtime.definition(is).filter(|class| class.extends() == Some(&*tag)),
					None => self.runtime.definition(&tag).filter(|class| class.extends().is_none()),
				};
				(tag, namespace, element.is.clone(), class)
			}
			ElementKind::Class(class) => match class.definition() {
				Some(definition) => (
					definition.tag().into(),
					level.namespace,
					definition.extends.as_ref().map(|_| definition.name.clone()),
					Some(class.clone()),
				),
				None => return error!("Component class {:?} was never defined; rendering nothing in its place.", class.name()),
			},
		};

		let span = trace_span!("Diffing element", %tag, key = ?element.key);
		let _enter = span.enter();

		let contexts = self.runtime.contexts();

		// A live node keyed differently is taken out before anything else is matched.
		let mut current = self.current(level);
		if let Some(node) = current.clone() {
			if let Some(key) = contexts.key(&node) {
				if Some(&key) != element.key.as_ref() && self.owns(level, &node) {
					trace!("Key mismatch at the cursor ({:?}); removing {:?}", key, node);
					self.remove(level, &node);
					current = self.current(level);
				}
			}
		}

		let reused = match element.key.as_ref().and_then(|key| scope.keys.remove(key)) {
			Some(node) if self.is_compatible(&node, &tag, namespace, is.as_deref(), class.as_ref()) => Some(node),
			Some(node) => {
				trace!("Keyed {:?} changed type; recreating it.", node);
				scope.dropped.push(node);
				None
			}
			None => current.filter(|node| {
				self.owns(level, node)
					&& contexts.key(node).as_ref() == element.key.as_ref()
					&& self.is_compatible(node, &tag, namespace, is.as_deref(), class.as_ref())
			}),
		};
		let (node, created) = match reused {
			Some(node) => (node, false),
			None => (self.create(&tag, namespace, is.as_deref(), class.as_ref()), true),
		};

		let context = contexts.get_or_create(&node);
		*context.key.borrow_mut() = element.key.clone();
		let instance = self.runtime.instance(&node);

		let previous = context.props.replace(element.props.clone());
		self.update_props(&node, instance.as_ref(), &previous, &element.props);

		match &instance {
			Some(instance) => {
				let changed = self.update_list(Governed::Slot(instance.clone()), level.host.clone(), namespace, &element.children, depth_limit - 1);
				if changed && !created && instance.initialized.get() {
					self.runtime.schedule_instance(instance);
				}
			}
			None => {
				let namespace = if &*tag == "foreignObject" { Namespace::Html } else { namespace };
				self.update_list(Governed::Children(node.clone()), level.host.clone(), namespace, &element.children, depth_limit - 1);
			}
		}

		if let Some(instance) = instance.filter(|instance| !instance.initialized.get()) {
			self.runtime.initialize(&instance);
		}

		self.place(level, &node);

		if let Some(key) = &element.key {
			if scope.next.keys.insert(key.clone(), node.clone()).is_some() {
				warn!("Duplicate key {} in one list; only the last node keeps it.", key);
			}
		}
	}

	fn is_compatible(&self, node: &Node, tag: &str, namespace: Namespace, is: Option<&str>, class: Option<&ComponentClass>) -> bool {
		node.is_element()
			&& node.namespace() == Some(namespace)
			&& node.local_name().as_deref() == Some(tag)
			&& node.get_attribute("is").as_deref() == is
			&& !self.runtime.contexts().is_placeholder(node)
			&& match (self.runtime.instance(node), class) {
				(Some(instance), Some(class)) => instance.class.ptr_eq(class),
				(None, None) => true,
				_ => false,
			}
	}

	fn create(&self, tag: &str, namespace: Namespace, is: Option<&str>, class: Option<&ComponentClass>) -> Node {
		trace!("Creating <{}>", tag);
		let node = self.runtime.document().create_element_ns(namespace, tag);
		if let Some(is) = is {
			node.set_attribute("is", is);
		}
		if let Some(class) = class {
			self.runtime.construct(&node, class);
		}
		node
	}

	fn update_props(&self, node: &Node, instance: Option<&Rc<Instance>>, previous: &Props, next: &Props) {
		for (name, old_value) in previous.iter() {
			if next.get(name).is_none() {
				self.apply_prop(node, instance, name, old_value, &Value::Null);
			}
		}
		for (name, value) in next.iter() {
			let old_value = previous.get(name).unwrap_or(&Value::Null);
			if old_value != value {
				self.apply_prop(node, instance, name, old_value, value);
			}
		}
	}

	fn apply_prop(&self, node: &Node, instance: Option<&Rc<Instance>>, name: &str, old_value: &Value, value: &Value) {
		let span = trace_span!("Applying prop", name);
		let _enter = span.enter();

		match name {
			"class" => return self.update_class(node, old_value, value),
			"style" => return self.update_style(node, old_value, value),
			_ => (),
		}

		if let Some(instance) = instance.filter(|instance| instance.class.property(name).is_some()) {
			let host = Host::new(self.runtime.clone(), instance.clone());
			if let Err(error) = host.set(name, value.clone()) {
				error!("Prop {:?} was rejected by {:?}: {}", name, node, error);
			}
			return;
		}

		if let Some(event) = name.strip_prefix("on").filter(|event| !event.is_empty()) {
			if matches!(old_value, Value::Function(_)) || matches!(value, Value::Function(_)) {
				let event = event.to_ascii_lowercase();
				if let Value::Function(old_callback) = old_value {
					node.remove_event_listener(&event, old_callback);
				}
				if let Value::Function(callback) = value {
					node.add_event_listener(&event, callback.clone());
				}
				return;
			}
		}

		if value.is_live() || old_value.is_live() {
			node.set_property(name, if value.is_live() { value.clone() } else { Value::Null });
			if value.is_live() {
				return;
			}
		}

		let result = match value {
			Value::Null | Value::Bool(false) => self.runtime.remove_attribute(node, name),
			Value::Bool(true) => self.runtime.set_attribute(node, name, ""),
			Value::Number(n) => self.runtime.set_attribute(node, name, &number_to_string(*n)),
			Value::String(s) => self.runtime.set_attribute(node, name, s),
			Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_) => Ok(()),
		};
		if let Err(error) = result {
			error!("Attribute {:?} on {:?} was rejected: {}", name, node, error);
		}
	}

	fn update_class(&self, node: &Node, old_value: &Value, value: &Value) {
		let previous = class_tokens(old_value);
		let next = class_tokens(value);
		let removed: Vec<String> = {
			let mut token_set = self.runtime.token_set();
			let retained = token_set.temp();
			retained.extend(next.iter().map(String::as_str));
			previous.iter().filter(|token| !retained.contains(token.as_str())).cloned().collect()
		};
		for token in &removed {
			node.remove_class(token);
		}
		for token in &next {
			node.add_class(token);
		}
	}

	fn update_style(&self, node: &Node, old_value: &Value, value: &Value) {
		let previous = style_declarations(old_value);
		let next = style_declarations(value);
		for (name, _) in &previous {
			if !next.iter().any(|(n, _)| n == name) {
				node.remove_style_property(name);
			}
		}
		for (name, value) in &next {
			if node.style_property(name).as_ref() != Some(value) {
				node.set_style_property(name, value);
			}
		}
	}

	fn diff_function(&self, level: &mut Cursor, scope: &mut Scope, function: &Rc<VFunction>, depth_limit: usize) {
		let fragment = scope.take_fragment(&function.function, function.key.as_ref()).unwrap_or_else(|| {
			trace!("New fragment for {:?}", function.function);
			Rc::new(FragmentContext::new(function.function.clone(), function.key.clone()))
		});
		*fragment.parent.borrow_mut() = level.fragment.as_ref().map_or_else(Weak::new, Rc::downgrade);
		scope.next.fragments.push(fragment.clone());
		self.invoke(level, &fragment, function, depth_limit);
	}

	fn invoke(&self, level: &mut Cursor, fragment: &Rc<FragmentContext>, function: &Rc<VFunction>, depth_limit: usize) {
		if depth_limit == 0 {
			return error!("Depth limit reached");
		}

		let span = trace_span!("Invoking function component", function = ?function.function, key = ?function.key);
		let _enter = span.enter();

		fragment.update_scheduled.set(false);
		*fragment.invocation.borrow_mut() = Some(function.clone());
		*fragment.site.borrow_mut() = Some(Site {
			governed: level.governed.downgrade(),
			host: level.host.as_ref().map_or_else(Weak::new, Rc::downgrade),
			namespace: level.namespace,
		});

		let updater = Updater::new(self.runtime, fragment);
		let output = {
			let mut state = fragment.state.borrow_mut();
			function.function.call(Invocation {
				props: &function.props,
				children: &function.children,
				state: &mut *state,
				updater: &updater,
			})
		};

		let first = level.index;
		let mut scope = Scope::open(fragment.scope.take());
		let parent = level.fragment.replace(fragment.clone());
		self.diff(level, &mut scope, &output, depth_limit - 1);
		level.fragment = parent;
		let nested = scope.close(self);
		*fragment.scope.borrow_mut() = nested;

		if level.index == first {
			let placeholder = fragment
				.placeholder
				.borrow()
				.clone()
				.unwrap_or_else(|| self.runtime.document().create_text_node(""));
			self.runtime.contexts().get_or_create(&placeholder).placeholder.set(true);
			*fragment.placeholder.borrow_mut() = Some(placeholder.clone());
			self.place(level, &placeholder);
		}
		*fragment.start.borrow_mut() = level.governed.item(first);
		*fragment.end.borrow_mut() = level.governed.item(level.index - 1);
		self.mark_range(fragment);
	}

	fn mark_range(&self, fragment: &Rc<FragmentContext>) {
		let contexts = self.runtime.contexts();
		let (start, end) = (fragment.start.borrow().clone(), fragment.end.borrow().clone());
		for node in start.iter().chain(end.iter()) {
			contexts.mark_boundary(node, fragment);
		}
	}

	/// Re-renders only the range of `fragment`.
	#[instrument(skip(self, fragment), fields(function = ?fragment.function))]
	pub fn update_fragment(&self, fragment: &Rc<FragmentContext>) {
		if !fragment.is_alive() {
			return trace!("Fragment went stale; discarding the update.");
		}
		let site = match fragment.site.borrow().clone() {
			Some(site) => site,
			None => return trace!("Fragment was never rendered."),
		};
		let governed = match site.governed.upgrade() {
			Some(governed) => governed,
			None => return trace!("Fragment site is gone; discarding the update."),
		};
		let (start, end) = match (fragment.start.borrow().clone(), fragment.end.borrow().clone()) {
			(Some(start), Some(end)) => (start, end),
			_ => return warn!("Fragment has no recorded range; discarding the update."),
		};
		let (first, last) = match (governed.index_of(&start), governed.index_of(&end)) {
			(Some(first), Some(last)) if first <= last => (first, last),
			_ => return warn!("Fragment range was moved out of place externally; discarding the update."),
		};
		let invocation = match fragment.invocation.borrow().clone() {
			Some(invocation) => invocation,
			None => return,
		};

		let mut level = Cursor {
			stop: governed.item(last + 1),
			governed,
			host: site.host.upgrade(),
			namespace: site.namespace,
			index: first,
			fragment: fragment.parent.borrow().upgrade(),
			changed: false,
		};
		self.invoke(&mut level, fragment, &invocation, self.runtime.options().depth_limit);
		let removed = self.remove_trailing(&mut level);

		let new_start = fragment.start.borrow().clone();
		let new_end = fragment.end.borrow().clone();
		let mut ancestor = fragment.parent.borrow().upgrade();
		while let Some(current) = ancestor {
			{
				let mut ancestor_start = current.start.borrow_mut();
				if ancestor_start.as_ref() == Some(&start) {
					*ancestor_start = new_start.clone();
				}
			}
			{
				let mut ancestor_end = current.end.borrow_mut();
				if ancestor_end.as_ref() == Some(&end) {
					*ancestor_end = new_end.clone();
				}
			}
			self.mark_range(&current);
			ancestor = current.parent.borrow().upgrade();
		}

		for node in removed {
			self.discard(&node);
		}
		if let (true, Governed::Slot(instance)) = (level.changed, &level.governed) {
			if instance.initialized.get() {
				self.runtime.schedule_instance(instance);
			}
		}
	}

	fn diff_slot(&self, level: &mut Cursor, scope: &mut Scope, slot: &VSlot, depth_limit: usize) {
		let span = trace_span!("Projecting slot", name = ?slot.name);
		let _enter = span.enter();

		let host = match &level.host {
			Some(host) => host.clone(),
			None => {
				warn!("Slot marker outside of a component render; rendering its fallback.");
				for template in slot.fallback.iter() {
					self.diff(level, scope, template, depth_limit - 1);
				}
				return;
			}
		};

		let name = slot.name.as_deref().filter(|name| !name.is_empty());
		let assigned: Vec<Node> = host
			.slot_children
			.borrow()
			.iter()
			.filter(|child| child.get_attribute("slot").as_deref().filter(|slot| !slot.is_empty()) == name)
			.cloned()
			.collect();
		if assigned.is_empty() {
			for template in slot.fallback.iter() {
				self.diff(level, scope, template, depth_limit - 1);
			}
		} else {
			for node in &assigned {
				self.place_as(level, node, false);
			}
		}
	}
}

/// The namespace children of `parent` are created in by default.
fn child_namespace(parent: &Node) -> Namespace {
	match (parent.namespace(), parent.local_name().as_deref()) {
		(Some(Namespace::Svg), Some("foreignObject")) | (Some(Namespace::Html) | None, _) => Namespace::Html,
		(Some(namespace), _) => namespace,
	}
}

fn interpolation(function: FunctionComponent) -> Rc<VFunction> {
	Rc::new(VFunction {
		function,
		props: Props::new(),
		children: Vec::new().into(),
		key: None,
	})
}

/// Class tokens of a `class` prop: a string, an array of tokens, or an object of token → condition.
fn class_tokens(value: &Value) -> Vec<String> {
	match value {
		Value::String(s) => s.split_ascii_whitespace().map(ToOwned::to_owned).collect(),
		Value::Array(items) => items
			.iter()
			.filter(|item| item.truthy())
			.filter_map(Value::to_js_string)
			.flat_map(|token| token.split_ascii_whitespace().map(ToOwned::to_owned).collect::<Vec<_>>())
			.collect(),
		Value::Object(entries) => entries
			.iter()
			.filter(|(_, condition)| condition.truthy())
			.map(|(token, _)| token.clone())
			.collect(),
		_ => vec![],
	}
}

/// Declarations of a `style` prop: a declaration string or an object of property → value.
fn style_declarations(value: &Value) -> Vec<(String, String)> {
	match value {
		Value::String(s) => dom::parse_style(s),
		Value::Object(entries) => entries
			.iter()
			.filter_map(|(name, value)| match value {
				Value::Null | Value::Bool(false) => None,
				value => value.to_js_string().filter(|value| !value.is_empty()).map(|value| (name.clone(), value)),
			})
			.collect(),
		_ => vec![],
	}
}

#[cfg(test)]
mod tests {
	use super::{class_tokens, style_declarations};
	use crate::value::Value;

	#[test]
	fn class_forms() {
		assert_eq!(class_tokens(&Value::from("a  b")), ["a", "b"]);
		assert_eq!(class_tokens(&Value::array(vec![Value::from("a"), Value::Null, Value::from("b c")])), ["a", "b", "c"]);
		assert_eq!(
			class_tokens(&Value::object(vec![("on", Value::Bool(true)), ("off", Value::Bool(false))])),
			["on"]
		);
	}

	#[test]
	fn style_forms() {
		assert_eq!(
			style_declarations(&Value::from("color: red; margin: 0")),
			[("color".to_owned(), "red".to_owned()), ("margin".to_owned(), "0".to_owned())]
		);
		assert_eq!(
			style_declarations(&Value::object(vec![("width", Value::from(2)), ("height", Value::Null)])),
			[("width".to_owned(), "2".to_owned())]
		);
	}
}
