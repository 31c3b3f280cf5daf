//! The DOM substrate.
//!
//! This is a deliberately small, single-threaded model of the parts of the
//! [***DOM***](https://developer.mozilla.org/en-US/docs/Web/API/Document_Object_Model) that the rest of the crate talks to:
//! a node tree with [***Element***](https://developer.mozilla.org/en-US/docs/Web/API/Element) attributes and expando properties,
//! character data, and [***Event***](https://developer.mozilla.org/en-US/docs/Web/API/Event) dispatch with bubbling.
//!
//! Nothing in here knows about custom elements.
//! Structural changes made through [`Node`] directly do **not** run life-cycle callbacks;
//! use the helpers on [`Runtime`](`crate::Runtime`) for that.
//!
//! Every structural, attribute or character data change bumps [`Document::mutation_count`].
//! No-op writes (setting an attribute or text to its current value) are not counted.

use crate::{
	error::{DomError, SelectorError},
	selector::SelectorList,
	value::{Callback, Value},
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
	iter,
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};

pub type NodeId = u64;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
	Html,
	Svg,
	MathMl,
}
impl Namespace {
	#[must_use]
	pub fn uri(self) -> &'static str {
		match self {
			Namespace::Html => HTML_NAMESPACE,
			Namespace::Svg => SVG_NAMESPACE,
			Namespace::MathMl => MATHML_NAMESPACE,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	Document,
	Element,
	Text,
	Comment,
}

#[derive(Debug)]
struct Shared {
	next_id: Cell<NodeId>,
	mutations: Cell<u64>,
}

enum Kind {
	Document,
	Element { local_name: Rc<str>, namespace: Namespace },
	Text,
	Comment,
}

struct NodeData {
	id: NodeId,
	shared: Rc<Shared>,
	kind: Kind,
	parent: RefCell<Weak<NodeData>>,
	children: RefCell<Vec<Node>>,
	data: RefCell<String>,
	attributes: RefCell<Vec<(Rc<str>, String)>>,
	properties: RefCell<HashMap<Rc<str>, Value>>,
	listeners: RefCell<Vec<(Rc<str>, Callback)>>,
}

/// A handle to a node. Cloning it does not clone the node.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

/// A non-owning [`Node`] handle.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeData>);
impl WeakNode {
	#[must_use]
	pub fn upgrade(&self) -> Option<Node> {
		self.0.upgrade().map(Node)
	}

	#[must_use]
	pub fn is_alive(&self) -> bool {
		self.0.strong_count() > 0
	}
}
impl Debug for WeakNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.upgrade() {
			Some(node) => write!(f, "Weak({:?})", node),
			None => f.write_str("Weak(<dropped>)"),
		}
	}
}

/// An in-memory document.
#[derive(Clone)]
pub struct Document {
	root: Node,
}
impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for Document {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("root", &self.root)
			.field("mutation_count", &self.mutation_count())
			.finish()
	}
}
impl Document {
	/// Creates a document containing `<html><head></head><body></body></html>`.
	#[must_use]
	pub fn new() -> Self {
		let shared = Rc::new(Shared {
			next_id: Cell::new(0),
			mutations: Cell::new(0),
		});
		let document = Self {
			root: Node::new(&shared, Kind::Document),
		};
		let html = document.create_element("html");
		for child in [document.create_element("head"), document.create_element("body")] {
			html.adopt(&child);
		}
		document.root.adopt(&html);
		document
	}

	#[must_use]
	pub fn root(&self) -> &Node {
		&self.root
	}

	#[must_use]
	pub fn document_element(&self) -> Option<Node> {
		self.root.child_nodes().into_iter().find(Node::is_element)
	}

	#[must_use]
	pub fn body(&self) -> Option<Node> {
		self.document_element()?
			.child_nodes()
			.into_iter()
			.find(|child| child.local_name().as_deref() == Some("body"))
	}

	/// Creates an HTML element. The tag name is ASCII-lowercased.
	#[must_use]
	pub fn create_element(&self, tag: &str) -> Node {
		self.create_element_ns(Namespace::Html, tag)
	}

	/// Creates an element in `namespace`. Only HTML tag names are case-folded.
	#[must_use]
	pub fn create_element_ns(&self, namespace: Namespace, tag: &str) -> Node {
		let local_name: Rc<str> = match namespace {
			Namespace::Html => tag.to_ascii_lowercase().into(),
			Namespace::Svg | Namespace::MathMl => tag.into(),
		};
		Node::new(&self.root.0.shared, Kind::Element { local_name, namespace })
	}

	#[must_use]
	pub fn create_text_node(&self, data: &str) -> Node {
		let node = Node::new(&self.root.0.shared, Kind::Text);
		data.clone_into(&mut node.0.data.borrow_mut());
		node
	}

	#[must_use]
	pub fn create_comment(&self, data: &str) -> Node {
		let node = Node::new(&self.root.0.shared, Kind::Comment);
		data.clone_into(&mut node.0.data.borrow_mut());
		node
	}

	/// The number of effective mutations made to nodes of this document so far.
	#[must_use]
	pub fn mutation_count(&self) -> u64 {
		self.root.0.shared.mutations.get()
	}
}

impl Node {
	fn new(shared: &Rc<Shared>, kind: Kind) -> Self {
		let id = shared.next_id.get();
		shared.next_id.set(id + 1);
		Self(Rc::new(NodeData {
			id,
			shared: shared.clone(),
			kind,
			parent: RefCell::default(),
			children: RefCell::default(),
			data: RefCell::default(),
			attributes: RefCell::default(),
			properties: RefCell::default(),
			listeners: RefCell::default(),
		}))
	}

	fn mutated(&self) {
		let mutations = &self.0.shared.mutations;
		mutations.set(mutations.get() + 1);
	}

	#[must_use]
	pub fn id(&self) -> NodeId {
		self.0.id
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakNode {
		WeakNode(Rc::downgrade(&self.0))
	}

	#[must_use]
	pub fn node_type(&self) -> NodeType {
		match self.0.kind {
			Kind::Document => NodeType::Document,
			Kind::Element { .. } => NodeType::Element,
			Kind::Text => NodeType::Text,
			Kind::Comment => NodeType::Comment,
		}
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		matches!(self.0.kind, Kind::Element { .. })
	}

	#[must_use]
	pub fn is_text(&self) -> bool {
		matches!(self.0.kind, Kind::Text)
	}

	/// Whether this node can have children.
	#[must_use]
	pub fn is_container(&self) -> bool {
		matches!(self.0.kind, Kind::Document | Kind::Element { .. })
	}

	#[must_use]
	pub fn local_name(&self) -> Option<Rc<str>> {
		match &self.0.kind {
			Kind::Element { local_name, .. } => Some(local_name.clone()),
			_ => None,
		}
	}

	/// Upper-cased for HTML elements, as in browsers.
	#[must_use]
	pub fn tag_name(&self) -> Option<String> {
		match &self.0.kind {
			Kind::Element {
				local_name,
				namespace: Namespace::Html,
			} => Some(local_name.to_ascii_uppercase()),
			Kind::Element { local_name, .. } => Some(local_name.to_string()),
			_ => None,
		}
	}

	#[must_use]
	pub fn namespace(&self) -> Option<Namespace> {
		match self.0.kind {
			Kind::Element { namespace, .. } => Some(namespace),
			_ => None,
		}
	}

	// Tree access.

	#[must_use]
	pub fn parent_node(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	/// A snapshot of the current child list.
	#[must_use]
	pub fn child_nodes(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	#[must_use]
	pub fn child_at(&self, index: usize) -> Option<Node> {
		self.0.children.borrow().get(index).cloned()
	}

	#[must_use]
	pub fn child_count(&self) -> usize {
		self.0.children.borrow().len()
	}

	#[must_use]
	pub fn index_of(&self, child: &Node) -> Option<usize> {
		self.0.children.borrow().iter().position(|c| c == child)
	}

	#[must_use]
	pub fn index_in_parent(&self) -> Option<usize> {
		self.parent_node()?.index_of(self)
	}

	#[must_use]
	pub fn first_child(&self) -> Option<Node> {
		self.child_at(0)
	}

	#[must_use]
	pub fn next_sibling(&self) -> Option<Node> {
		let parent = self.parent_node()?;
		let index = parent.index_of(self)?;
		parent.child_at(index + 1)
	}

	#[must_use]
	pub fn previous_sibling(&self) -> Option<Node> {
		let parent = self.parent_node()?;
		let index = parent.index_of(self)?;
		parent.child_at(index.checked_sub(1)?)
	}

	/// Inclusive: a node contains itself.
	#[must_use]
	pub fn contains(&self, other: &Node) -> bool {
		iter::successors(Some(other.clone()), Node::parent_node).any(|ancestor| &ancestor == self)
	}

	#[must_use]
	pub fn root_node(&self) -> Node {
		iter::successors(Some(self.clone()), Node::parent_node).last().unwrap_or_else(|| self.clone())
	}

	/// Whether the node's root is a document.
	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.root_node().node_type() == NodeType::Document
	}

	/// All descendants in tree order, excluding `self`.
	#[must_use]
	pub fn descendants(&self) -> Vec<Node> {
		let mut descendants = vec![];
		let mut stack: Vec<Node> = self.child_nodes().into_iter().rev().collect();
		while let Some(node) = stack.pop() {
			stack.extend(node.child_nodes().into_iter().rev());
			descendants.push(node);
		}
		descendants
	}

	// Mutation.

	/// Inserts `child` before `reference`, or appends it if `reference` is [`None`].
	///
	/// `child` is removed from its current parent first.
	///
	/// # Errors
	///
	/// [`DomError::HierarchyRequest`] if `self` can't hold children, `child` is a document or `child` contains `self`.
	/// [`DomError::NotFound`] if `reference` is not a child of `self`.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		if !self.is_container() || child.node_type() == NodeType::Document || child.contains(self) {
			return Err(DomError::HierarchyRequest);
		}
		if let Some(reference) = reference {
			if reference.parent_node().as_ref() != Some(self) {
				return Err(DomError::NotFound);
			}
		}
		let reference = match reference {
			Some(reference) if reference == child => child.next_sibling(),
			reference => reference.cloned(),
		};
		if let Some(parent) = child.parent_node() {
			parent.detach(child);
		}
		{
			let mut children = self.0.children.borrow_mut();
			let index = reference
				.and_then(|reference| children.iter().position(|c| *c == reference))
				.unwrap_or(children.len());
			children.insert(index, child.clone());
		}
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.mutated();
		Ok(())
	}

	/// Appends a fresh, parentless node without any checks.
	fn adopt(&self, child: &Node) {
		self.0.children.borrow_mut().push(child.clone());
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
	}

	/// # Errors
	///
	/// See [`Node::insert_before`].
	pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
		self.insert_before(child, None)
	}

	/// # Errors
	///
	/// [`DomError::NotFound`] if `child` is not a child of `self`.
	pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
		if child.parent_node().as_ref() != Some(self) {
			return Err(DomError::NotFound);
		}
		self.detach(child);
		Ok(())
	}

	/// Removes the node from its parent, if any.
	pub fn remove(&self) {
		if let Some(parent) = self.parent_node() {
			parent.detach(self);
		}
	}

	fn detach(&self, child: &Node) {
		self.0.children.borrow_mut().retain(|c| c != child);
		*child.0.parent.borrow_mut() = Weak::new();
		self.mutated();
	}

	// Attributes.

	fn attribute_name(&self, name: &str) -> String {
		match self.namespace() {
			Some(Namespace::Html) => name.to_ascii_lowercase(),
			_ => name.to_owned(),
		}
	}

	#[must_use]
	pub fn get_attribute(&self, name: &str) -> Option<String> {
		let name = self.attribute_name(name);
		self.0
			.attributes
			.borrow()
			.iter()
			.find(|(n, _)| **n == *name)
			.map(|(_, value)| value.clone())
	}

	#[must_use]
	pub fn has_attribute(&self, name: &str) -> bool {
		self.get_attribute(name).is_some()
	}

	#[must_use]
	pub fn attribute_names(&self) -> Vec<String> {
		self.0.attributes.borrow().iter().map(|(name, _)| name.to_string()).collect()
	}

	/// Returns the previous value. Ignored (with a warning) on non-elements.
	pub fn set_attribute(&self, name: &str, value: &str) -> Option<String> {
		if !self.is_element() {
			tracing::warn!("Tried to set attribute {:?} on non-element {:?}", name, self);
			return None;
		}
		let name = self.attribute_name(name);
		let previous = {
			let mut attributes = self.0.attributes.borrow_mut();
			match attributes.iter_mut().find(|(n, _)| **n == *name) {
				Some((_, current)) if current == value => return Some(value.to_owned()),
				Some((_, current)) => Some(core::mem::replace(current, value.to_owned())),
				None => {
					attributes.push((name.into(), value.to_owned()));
					None
				}
			}
		};
		self.mutated();
		previous
	}

	/// Returns the removed value, if there was one.
	pub fn remove_attribute(&self, name: &str) -> Option<String> {
		let name = self.attribute_name(name);
		let removed = {
			let mut attributes = self.0.attributes.borrow_mut();
			let index = attributes.iter().position(|(n, _)| **n == *name)?;
			attributes.remove(index).1
		};
		self.mutated();
		Some(removed)
	}

	// Class tokens, reflected through the `class` attribute.

	#[must_use]
	pub fn class_tokens(&self) -> Vec<String> {
		self.get_attribute("class")
			.map(|class| class.split_ascii_whitespace().map(ToOwned::to_owned).collect())
			.unwrap_or_default()
	}

	#[must_use]
	pub fn has_class(&self, token: &str) -> bool {
		self.get_attribute("class")
			.map_or(false, |class| class.split_ascii_whitespace().any(|t| t == token))
	}

	pub fn add_class(&self, token: &str) {
		let mut tokens = self.class_tokens();
		if !tokens.iter().any(|t| t == token) {
			tokens.push(token.to_owned());
			self.set_attribute("class", &tokens.join(" "));
		}
	}

	pub fn remove_class(&self, token: &str) {
		let mut tokens = self.class_tokens();
		let before = tokens.len();
		tokens.retain(|t| t != token);
		if tokens.len() != before {
			self.set_attribute("class", &tokens.join(" "));
		}
	}

	// Inline style declarations, reflected through the `style` attribute.

	#[must_use]
	pub fn style_declarations(&self) -> Vec<(String, String)> {
		self.get_attribute("style").map(|style| parse_style(&style)).unwrap_or_default()
	}

	#[must_use]
	pub fn style_property(&self, name: &str) -> Option<String> {
		self.style_declarations()
			.into_iter()
			.find(|(n, _)| n == name)
			.map(|(_, value)| value)
	}

	/// An empty `value` removes the declaration.
	pub fn set_style_property(&self, name: &str, value: &str) {
		if value.is_empty() {
			return self.remove_style_property(name);
		}
		let mut declarations = self.style_declarations();
		match declarations.iter_mut().find(|(n, _)| n == name) {
			Some((_, current)) if current == value => return,
			Some((_, current)) => value.clone_into(current),
			None => declarations.push((name.to_owned(), value.to_owned())),
		}
		self.set_attribute("style", &serialize_style(&declarations));
	}

	pub fn remove_style_property(&self, name: &str) {
		let mut declarations = self.style_declarations();
		let before = declarations.len();
		declarations.retain(|(n, _)| n != name);
		if declarations.len() != before {
			self.set_attribute("style", &serialize_style(&declarations));
		}
	}

	// Expando ("live") properties. These are not mutations of the document.

	#[must_use]
	pub fn property(&self, name: &str) -> Value {
		self.0.properties.borrow().get(name).cloned().unwrap_or_default()
	}

	/// Assigning [`Value::Null`] deletes the property.
	pub fn set_property(&self, name: &str, value: Value) {
		let mut properties = self.0.properties.borrow_mut();
		if value.is_null() {
			properties.remove(name);
		} else {
			properties.insert(name.into(), value);
		}
	}

	// Character data.

	/// The data of a text or comment node. Empty for other nodes.
	#[must_use]
	pub fn data(&self) -> String {
		self.0.data.borrow().clone()
	}

	pub fn set_data(&self, data: &str) {
		if !matches!(self.0.kind, Kind::Text | Kind::Comment) {
			tracing::warn!("Tried to set character data on {:?}", self);
			return;
		}
		if *self.0.data.borrow() != data {
			data.clone_into(&mut self.0.data.borrow_mut());
			self.mutated();
		}
	}

	#[must_use]
	pub fn text_content(&self) -> String {
		match self.0.kind {
			Kind::Text | Kind::Comment => self.data(),
			Kind::Document | Kind::Element { .. } => self
				.descendants()
				.iter()
				.filter(|node| node.is_text())
				.map(Node::data)
				.collect(),
		}
	}

	// Events.

	/// Adding the same (`event_type`, `callback`) pair twice has no effect.
	pub fn add_event_listener(&self, event_type: &str, callback: Callback) {
		let mut listeners = self.0.listeners.borrow_mut();
		if !listeners.iter().any(|(t, c)| **t == *event_type && *c == callback) {
			listeners.push((event_type.into(), callback));
		}
	}

	pub fn remove_event_listener(&self, event_type: &str, callback: &Callback) {
		self.0
			.listeners
			.borrow_mut()
			.retain(|(t, c)| !(**t == *event_type && c == callback));
	}

	#[must_use]
	pub fn has_event_listener(&self, event_type: &str, callback: &Callback) -> bool {
		self.0.listeners.borrow().iter().any(|(t, c)| **t == *event_type && c == callback)
	}

	/// Dispatches `event` at this node, bubbling if the event does.
	///
	/// Returns `false` iff a listener called [`Event::prevent_default`] on a cancelable event.
	pub fn dispatch_event(&self, event: &Event) -> bool {
		let span = tracing::trace_span!("dispatch_event", event_type = %event.event_type(), target = ?self);
		let _enter = span.enter();

		event.0.target.replace(Some(self.clone()));
		let path: Vec<Node> = if event.bubbles() {
			iter::successors(Some(self.clone()), Node::parent_node).collect()
		} else {
			vec![self.clone()]
		};
		'path: for node in path {
			event.0.current_target.replace(Some(node.clone()));
			let listeners: Vec<Callback> = node
				.0
				.listeners
				.borrow()
				.iter()
				.filter(|(t, _)| **t == *event.event_type())
				.map(|(_, callback)| callback.clone())
				.collect();
			for listener in listeners {
				// Listeners removed by an earlier listener of this dispatch don't run.
				if node.has_event_listener(event.event_type(), &listener) {
					listener.call(event);
				}
				if event.immediate_propagation_stopped() {
					break 'path;
				}
			}
			if event.propagation_stopped() {
				break;
			}
		}
		event.0.current_target.replace(None);
		!event.default_prevented()
	}

	// Selectors.

	/// # Errors
	///
	/// Iff `selector` can't be parsed.
	pub fn matches(&self, selector: &str) -> Result<bool, SelectorError> {
		Ok(SelectorList::parse(selector)?.matches(self))
	}

	/// The closest inclusive ancestor matching `selector`.
	///
	/// # Errors
	///
	/// Iff `selector` can't be parsed.
	pub fn closest(&self, selector: &str) -> Result<Option<Node>, SelectorError> {
		let selector = SelectorList::parse(selector)?;
		Ok(iter::successors(Some(self.clone()), Node::parent_node).find(|node| selector.matches(node)))
	}

	/// # Errors
	///
	/// Iff `selector` can't be parsed.
	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, SelectorError> {
		let selector = SelectorList::parse(selector)?;
		Ok(self.descendants().into_iter().filter(|node| selector.matches(node)).collect())
	}

	// Serialization.

	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		for child in self.child_nodes() {
			child.write_html(&mut html);
		}
		html
	}

	fn write_html(&self, html: &mut String) {
		match &self.0.kind {
			Kind::Document => {
				for child in self.child_nodes() {
					child.write_html(html);
				}
			}
			Kind::Element { local_name, .. } => {
				html.push('<');
				html.push_str(local_name);
				for (name, value) in self.0.attributes.borrow().iter() {
					html.push(' ');
					html.push_str(name);
					if !value.is_empty() {
						html.push_str("=\"");
						html.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
						html.push('"');
					}
				}
				html.push('>');
				for child in self.child_nodes() {
					child.write_html(html);
				}
				html.push_str("</");
				html.push_str(local_name);
				html.push('>');
			}
			Kind::Text => html.push_str(&self.data().replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")),
			Kind::Comment => {
				html.push_str("<!--");
				html.push_str(&self.data());
				html.push_str("-->");
			}
		}
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for Node {}
impl Hash for Node {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.id.hash(state);
	}
}
impl Debug for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.0.kind {
			Kind::Document => write!(f, "#{} #document", self.0.id),
			Kind::Element { local_name, .. } => write!(f, "#{} <{}>", self.0.id, local_name),
			Kind::Text => write!(f, "#{} #text", self.0.id),
			Kind::Comment => write!(f, "#{} #comment", self.0.id),
		}
	}
}

pub(crate) fn parse_style(style: &str) -> Vec<(String, String)> {
	style
		.split(';')
		.filter_map(|declaration| {
			let (name, value) = declaration.split_once(':')?;
			let (name, value) = (name.trim(), value.trim());
			if name.is_empty() || value.is_empty() {
				None
			} else {
				Some((name.to_owned(), value.to_owned()))
			}
		})
		.collect()
}

fn serialize_style(declarations: &[(String, String)]) -> String {
	declarations
		.iter()
		.map(|(name, value)| format!("{}: {};", name, value))
		.collect::<Vec<_>>()
		.join(" ")
}

/// Options for [`Event::new`].
#[derive(Debug, Clone, Default)]
pub struct EventInit {
	pub bubbles: bool,
	pub cancelable: bool,
	pub detail: Value,
}

/// A DOM event. Clones share propagation state.
#[derive(Clone)]
pub struct Event(Rc<EventData>);
struct EventData {
	event_type: Rc<str>,
	bubbles: bool,
	cancelable: bool,
	detail: Value,
	target: RefCell<Option<Node>>,
	current_target: RefCell<Option<Node>>,
	propagation_stopped: Cell<bool>,
	immediate_propagation_stopped: Cell<bool>,
	default_prevented: Cell<bool>,
}
impl Event {
	#[must_use]
	pub fn new(event_type: &str, init: EventInit) -> Self {
		Self(Rc::new(EventData {
			event_type: event_type.into(),
			bubbles: init.bubbles,
			cancelable: init.cancelable,
			detail: init.detail,
			target: RefCell::default(),
			current_target: RefCell::default(),
			propagation_stopped: Cell::default(),
			immediate_propagation_stopped: Cell::default(),
			default_prevented: Cell::default(),
		}))
	}

	#[must_use]
	pub fn event_type(&self) -> &str {
		&self.0.event_type
	}

	#[must_use]
	pub fn bubbles(&self) -> bool {
		self.0.bubbles
	}

	#[must_use]
	pub fn cancelable(&self) -> bool {
		self.0.cancelable
	}

	#[must_use]
	pub fn detail(&self) -> &Value {
		&self.0.detail
	}

	#[must_use]
	pub fn target(&self) -> Option<Node> {
		self.0.target.borrow().clone()
	}

	#[must_use]
	pub fn current_target(&self) -> Option<Node> {
		self.0.current_target.borrow().clone()
	}

	pub fn stop_propagation(&self) {
		self.0.propagation_stopped.set(true);
	}

	pub fn stop_immediate_propagation(&self) {
		self.0.propagation_stopped.set(true);
		self.0.immediate_propagation_stopped.set(true);
	}

	pub fn prevent_default(&self) {
		if self.0.cancelable {
			self.0.default_prevented.set(true);
		}
	}

	#[must_use]
	pub fn propagation_stopped(&self) -> bool {
		self.0.propagation_stopped.get()
	}

	#[must_use]
	pub fn immediate_propagation_stopped(&self) -> bool {
		self.0.immediate_propagation_stopped.get()
	}

	#[must_use]
	pub fn default_prevented(&self) -> bool {
		self.0.default_prevented.get()
	}
}
impl Debug for Event {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("type", &self.0.event_type)
			.field("bubbles", &self.0.bubbles)
			.field("detail", &self.0.detail)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insertion_moves_and_counts() {
		let document = Document::new();
		let body = document.body().unwrap();
		let a = document.create_element("A");
		let b = document.create_text_node("b");
		body.append_child(&a).unwrap();
		body.append_child(&b).unwrap();
		assert_eq!(a.local_name().as_deref(), Some("a"));
		assert!(a.is_connected());

		let before = document.mutation_count();
		body.insert_before(&b, Some(&a)).unwrap();
		assert_eq!(body.child_nodes(), vec![b.clone(), a.clone()]);
		assert!(document.mutation_count() > before);

		assert_eq!(a.insert_before(&body, None), Err(DomError::HierarchyRequest));
		assert_eq!(b.append_child(&a), Err(DomError::HierarchyRequest));
		assert_eq!(a.remove_child(&b), Err(DomError::NotFound));
	}

	#[test]
	fn no_op_writes_are_not_mutations() {
		let document = Document::new();
		let div = document.create_element("div");
		div.set_attribute("title", "x");
		let count = document.mutation_count();
		div.set_attribute("title", "x");
		div.set_style_property("color", "red");
		let count_after_style = document.mutation_count();
		div.set_style_property("color", "red");
		assert_eq!(document.mutation_count(), count_after_style);
		assert!(count_after_style > count);
		assert_eq!(div.get_attribute("style").as_deref(), Some("color: red;"));
	}

	#[test]
	fn dispatch_bubbles_and_stops() {
		let document = Document::new();
		let outer = document.create_element("div");
		let inner = document.create_element("span");
		outer.append_child(&inner).unwrap();

		let log = Rc::new(RefCell::new(vec![]));
		let on_inner = Callback::new({
			let log = log.clone();
			move |event: &Event| {
				log.borrow_mut().push("inner");
				event.stop_propagation();
			}
		});
		let on_outer = Callback::new({
			let log = log.clone();
			move |_: &Event| log.borrow_mut().push("outer")
		});
		inner.add_event_listener("click", on_inner);
		outer.add_event_listener("click", on_outer);

		inner.dispatch_event(&Event::new("click", EventInit { bubbles: true, ..EventInit::default() }));
		assert_eq!(*log.borrow(), vec!["inner"]);
	}

	#[test]
	fn serializes() {
		let document = Document::new();
		let p = document.create_element("p");
		p.set_attribute("hidden", "");
		p.set_attribute("title", "a\"b");
		p.append_child(&document.create_text_node("1 < 2")).unwrap();
		assert_eq!(p.outer_html(), r#"<p hidden title="a&quot;b">1 &lt; 2</p>"#);
	}
}
