//! Virtual template nodes.
//!
//! Templates are immutable descriptions of what should exist at a tree position.
//! They never reference live DOM, except through [`Template::Node`], which places an existing node as-is.

use crate::{
	component::ComponentClass,
	context::FragmentContext,
	dom::Node,
	runtime::{Runtime, Shared},
	value::{Key, Value},
};
use core::{
	fmt::{self, Debug, Formatter},
	future::Future,
};
use futures::{
	future::{abortable, AbortHandle, LocalBoxFuture},
	stream::{LocalBoxStream, Stream, StreamExt},
	FutureExt,
};
use hashbrown::HashMap;
use std::{
	cell::{Cell, RefCell},
	collections::BTreeMap,
	rc::{Rc, Weak},
};
use tracing::trace;

#[derive(Clone)]
pub enum Template {
	/// Renders nothing.
	Empty,
	Text(Rc<str>),
	Element(Rc<VElement>),
	Function(Rc<VFunction>),
	/// A transparent grouping whose children splice into the parent's child list.
	Fragment(Rc<[Template]>),
	Slot(Rc<VSlot>),
	/// An existing node, placed as-is.
	Node(Node),
	List(Rc<[Template]>),
	Thenable(Thenable),
	Observable(Observable),
}

pub struct VElement {
	pub kind: ElementKind,
	pub props: Props,
	pub children: Rc<[Template]>,
	pub key: Option<Key>,
	/// The custom element name of a customized built-in element.
	pub is: Option<Rc<str>>,
}

#[derive(Clone)]
pub enum ElementKind {
	Tag(Rc<str>),
	Class(ComponentClass),
}

pub struct VFunction {
	pub function: FunctionComponent,
	pub props: Props,
	pub children: Rc<[Template]>,
	pub key: Option<Key>,
}

pub struct VSlot {
	pub name: Option<Rc<str>>,
	/// Rendered if no light-DOM child matches.
	pub fallback: Rc<[Template]>,
}

/// A property bag, ordered by name.
#[derive(Clone, Default, PartialEq)]
pub struct Props(BTreeMap<String, Value>);
impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.insert(name, value);
		self
	}

	pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(name.to_owned(), value.into())
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	pub fn remove(&mut self, name: &str) -> Option<Value> {
		self.0.remove(name)
	}

	pub fn iter(&self) -> impl '_ + Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl<K: Into<String>> FromIterator<(K, Value)> for Props {
	fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
		Self(iter.into_iter().map(|(name, value)| (name.into(), value)).collect())
	}
}
impl Debug for Props {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}

/// What [`h`] should build.
#[derive(Clone)]
pub enum TemplateType {
	Tag(Rc<str>),
	Class(ComponentClass),
	Function(FunctionComponent),
	Fragment,
	Slot,
}

/// Marker for [`h`]: group children without a wrapping node.
#[derive(Debug, Clone, Copy)]
pub struct Fragment;

impl From<&str> for TemplateType {
	fn from(tag: &str) -> Self {
		if tag == "slot" {
			TemplateType::Slot
		} else {
			TemplateType::Tag(tag.into())
		}
	}
}
impl From<&ComponentClass> for TemplateType {
	fn from(class: &ComponentClass) -> Self {
		TemplateType::Class(class.clone())
	}
}
impl From<ComponentClass> for TemplateType {
	fn from(class: ComponentClass) -> Self {
		TemplateType::Class(class)
	}
}
impl From<FunctionComponent> for TemplateType {
	fn from(function: FunctionComponent) -> Self {
		TemplateType::Function(function)
	}
}
impl From<&FunctionComponent> for TemplateType {
	fn from(function: &FunctionComponent) -> Self {
		TemplateType::Function(function.clone())
	}
}
impl From<Fragment> for TemplateType {
	fn from(_: Fragment) -> Self {
		TemplateType::Fragment
	}
}

/// Builds a template node, hyperscript-style.
///
/// `key` and `is` are taken out of `props`. A `slot` marker additionally takes its `name`.
#[must_use]
pub fn h(kind: impl Into<TemplateType>, mut props: Props, children: Vec<Template>) -> Template {
	let key = props.remove("key").and_then(|key| {
		let converted = Key::from_value(&key);
		if converted.is_none() {
			tracing::warn!("Ignoring key that is neither a string nor a number: {:?}", key);
		}
		converted
	});
	let children: Rc<[Template]> = children.into();
	match kind.into() {
		TemplateType::Tag(tag) => {
			let is = props.remove("is").and_then(|is| is.as_str().map(Into::into));
			Template::Element(Rc::new(VElement {
				kind: ElementKind::Tag(tag),
				props,
				children,
				key,
				is,
			}))
		}
		TemplateType::Class(class) => Template::Element(Rc::new(VElement {
			kind: ElementKind::Class(class),
			props,
			children,
			key,
			is: None,
		})),
		TemplateType::Function(function) => Template::Function(Rc::new(VFunction {
			function,
			props,
			children,
			key,
		})),
		TemplateType::Fragment => Template::Fragment(children),
		TemplateType::Slot => Template::Slot(Rc::new(VSlot {
			name: props.get("name").and_then(Value::as_str).map(Into::into),
			fallback: children,
		})),
	}
}

/// A functional component.
///
/// Identity (which decides whether persistent [`State`] is kept) is the function address for [`FunctionComponent::new`]
/// and the allocation for [`FunctionComponent::from_closure`].
#[derive(Clone)]
pub struct FunctionComponent {
	identity: usize,
	render: Rc<dyn Fn(Invocation<'_>) -> Template>,
}
impl FunctionComponent {
	#[must_use]
	pub fn new(render: fn(Invocation<'_>) -> Template) -> Self {
		Self {
			identity: render as usize,
			render: Rc::new(render),
		}
	}

	pub fn from_closure(render: impl 'static + Fn(Invocation<'_>) -> Template) -> Self {
		let render: Rc<dyn Fn(Invocation<'_>) -> Template> = Rc::new(render);
		Self {
			identity: Rc::as_ptr(&render).cast::<()>() as usize,
			render,
		}
	}

	fn with_identity(identity: usize, render: impl 'static + Fn(Invocation<'_>) -> Template) -> Self {
		Self {
			identity,
			render: Rc::new(render),
		}
	}

	pub(crate) fn call(&self, invocation: Invocation<'_>) -> Template {
		(self.render)(invocation)
	}
}
impl PartialEq for FunctionComponent {
	fn eq(&self, other: &Self) -> bool {
		self.identity == other.identity
	}
}
impl Debug for FunctionComponent {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "FunctionComponent({:#x})", self.identity)
	}
}

/// What a [`FunctionComponent`] is called with.
pub struct Invocation<'a> {
	pub props: &'a Props,
	pub children: &'a [Template],
	pub state: &'a mut State,
	pub updater: &'a Updater,
}

/// Persistent per-instance state of a functional component.
#[derive(Debug, Default)]
pub struct State(HashMap<String, Value>);
impl State {
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(name.to_owned(), value.into())
	}

	pub fn get_or_insert_with(&mut self, name: &str, default: impl FnOnce() -> Value) -> &mut Value {
		self.0.entry(name.to_owned()).or_insert_with(default)
	}

	pub fn remove(&mut self, name: &str) -> Option<Value> {
		self.0.remove(name)
	}
}

/// Requests re-invocation of the functional component it was handed to.
#[derive(Clone)]
pub struct Updater {
	runtime: Weak<Shared>,
	fragment: Weak<FragmentContext>,
}
impl Updater {
	pub(crate) fn new(runtime: &Runtime, fragment: &Rc<FragmentContext>) -> Self {
		Self {
			runtime: runtime.downgrade(),
			fragment: Rc::downgrade(fragment),
		}
	}

	fn upgrade(&self) -> Option<(Runtime, Rc<FragmentContext>)> {
		let fragment = self.fragment.upgrade().filter(|fragment| fragment.is_alive())?;
		Some((Runtime::from_shared(self.runtime.upgrade()?), fragment))
	}

	/// Schedules a re-render of this fragment.
	///
	/// Returns `false` (and does nothing) if the fragment went stale.
	pub fn request_update(&self) -> bool {
		match self.upgrade() {
			Some((runtime, fragment)) => {
				runtime.schedule_fragment(&fragment);
				true
			}
			None => {
				trace!("Discarding update request of stale fragment.");
				false
			}
		}
	}

	/// Whether the fragment is still part of the rendered tree.
	#[must_use]
	pub fn is_live(&self) -> bool {
		self.upgrade().is_some()
	}

	/// Runs `cleanup` once the fragment goes stale, or immediately if it already is.
	pub fn on_stale(&self, cleanup: impl 'static + FnOnce()) {
		match self.fragment.upgrade().filter(|fragment| fragment.is_alive()) {
			Some(fragment) => fragment.on_stale(Box::new(cleanup)),
			None => cleanup(),
		}
	}

	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		match self.runtime.upgrade() {
			Some(shared) => Runtime::from_shared(shared).spawn(future),
			None => trace!("Runtime gone, not spawning."),
		}
	}

	fn ptr_eq(&self, other: &Self) -> bool {
		Weak::ptr_eq(&self.fragment, &other.fragment)
	}
}
impl Debug for Updater {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Updater").field("live", &self.is_live()).finish()
	}
}

fn subscribe(subscribers: &RefCell<Vec<Updater>>, updater: &Updater) -> bool {
	let mut subscribers = subscribers.borrow_mut();
	if subscribers.iter().any(|subscriber| subscriber.ptr_eq(updater)) {
		false
	} else {
		subscribers.push(updater.clone());
		true
	}
}

/// Notifies the live subscribers and forgets the stale ones. Returns how many are left.
fn notify(subscribers: &RefCell<Vec<Updater>>) -> usize {
	let live: Vec<Updater> = {
		let mut subscribers = subscribers.borrow_mut();
		subscribers.retain(Updater::is_live);
		subscribers.clone()
	};
	for subscriber in &live {
		subscriber.request_update();
	}
	live.len()
}

/// A pending value. Renders nothing until it settles, then its result.
///
/// A rejection renders nothing, permanently.
#[derive(Clone)]
pub struct Thenable(Rc<ThenableInner>);
struct ThenableInner {
	future: RefCell<Option<LocalBoxFuture<'static, Option<Template>>>>,
	settled: RefCell<Option<Template>>,
	subscribers: RefCell<Vec<Updater>>,
}
impl Thenable {
	pub fn new<T, E>(future: impl 'static + Future<Output = Result<T, E>>) -> Self
	where
		T: 'static + Into<Template>,
		E: 'static,
	{
		Self(Rc::new(ThenableInner {
			future: RefCell::new(Some(
				future
					.map(|result| match result {
						Ok(value) => Some(value.into()),
						Err(_) => {
							trace!("Thenable rejected; rendering nothing.");
							None
						}
					})
					.boxed_local(),
			)),
			settled: RefCell::default(),
			subscribers: RefCell::default(),
		}))
	}

	/// An already settled thenable.
	pub fn resolved(value: impl Into<Template>) -> Self {
		Self(Rc::new(ThenableInner {
			future: RefCell::default(),
			settled: RefCell::new(Some(value.into())),
			subscribers: RefCell::default(),
		}))
	}

	#[must_use]
	pub fn is_settled(&self) -> bool {
		self.0.settled.borrow().is_some()
	}

	pub(crate) fn component(&self) -> FunctionComponent {
		let inner = self.0.clone();
		FunctionComponent::with_identity(Rc::as_ptr(&self.0).cast::<()>() as usize, move |invocation| {
			if let Some(settled) = &*inner.settled.borrow() {
				return settled.clone();
			}
			subscribe(&inner.subscribers, invocation.updater);
			let future = inner.future.borrow_mut().take();
			if let Some(future) = future {
				let inner = inner.clone();
				invocation.updater.spawn(
					async move {
						let settled = future.await.unwrap_or(Template::Empty);
						*inner.settled.borrow_mut() = Some(settled);
						notify(&inner.subscribers);
						inner.subscribers.borrow_mut().clear();
					}
					.boxed_local(),
				);
			}
			Template::Empty
		})
	}
}
impl Debug for Thenable {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Thenable").field("settled", &self.is_settled()).finish()
	}
}

/// A push stream. Each item re-renders the positions showing it.
///
/// The subscription is started on first render and aborted once no live fragment shows it anymore.
#[derive(Clone)]
pub struct Observable(Rc<ObservableInner>);
struct ObservableInner {
	stream: RefCell<Option<LocalBoxStream<'static, Template>>>,
	latest: RefCell<Template>,
	subscribers: RefCell<Vec<Updater>>,
	abort: RefCell<Option<AbortHandle>>,
	completed: Cell<bool>,
}
impl Observable {
	pub fn new<T: 'static + Into<Template>>(stream: impl 'static + Stream<Item = T>) -> Self {
		Self(Rc::new(ObservableInner {
			stream: RefCell::new(Some(stream.map(Into::into).boxed_local())),
			latest: RefCell::new(Template::Empty),
			subscribers: RefCell::default(),
			abort: RefCell::default(),
			completed: Cell::default(),
		}))
	}

	/// Whether the source ended or was unsubscribed from.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.0.completed.get()
	}

	pub(crate) fn component(&self) -> FunctionComponent {
		let inner = self.0.clone();
		FunctionComponent::with_identity(Rc::as_ptr(&self.0).cast::<()>() as usize, move |invocation| {
			if !inner.completed.get() && subscribe(&inner.subscribers, invocation.updater) {
				let weak = Rc::downgrade(&inner);
				invocation.updater.on_stale(move || {
					if let Some(inner) = weak.upgrade() {
						inner.subscribers.borrow_mut().retain(Updater::is_live);
						if inner.subscribers.borrow().is_empty() {
							inner.unsubscribe();
						}
					}
				});
			}
			let stream = inner.stream.borrow_mut().take();
			if let Some(mut stream) = stream {
				let task_inner = inner.clone();
				let (task, handle) = abortable(async move {
					while let Some(item) = stream.next().await {
						*task_inner.latest.borrow_mut() = item;
						if notify(&task_inner.subscribers) == 0 {
							trace!("No live subscribers left; unsubscribing.");
							break;
						}
					}
					task_inner.completed.set(true);
				});
				*inner.abort.borrow_mut() = Some(handle);
				invocation.updater.spawn(task.map(drop).boxed_local());
			}
			inner.latest.borrow().clone()
		})
	}
}
impl ObservableInner {
	fn unsubscribe(&self) {
		if let Some(handle) = self.abort.borrow_mut().take() {
			trace!("Aborting observable subscription.");
			handle.abort();
		}
		self.completed.set(true);
	}
}
impl Debug for Observable {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observable").field("closed", &self.is_closed()).finish()
	}
}

impl Default for Template {
	fn default() -> Self {
		Template::Empty
	}
}
impl Debug for Template {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Template::Empty => f.write_str("Empty"),
			Template::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Template::Element(element) => {
				let mut debug = f.debug_struct("Element");
				match &element.kind {
					ElementKind::Tag(tag) => debug.field("tag", tag),
					ElementKind::Class(class) => debug.field("class", class),
				};
				debug
					.field("key", &element.key)
					.field("props", &element.props)
					.field("children", &element.children)
					.finish()
			}
			Template::Function(function) => f
				.debug_struct("Function")
				.field("function", &function.function)
				.field("key", &function.key)
				.field("props", &function.props)
				.finish(),
			Template::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
			Template::Slot(slot) => f.debug_struct("Slot").field("name", &slot.name).finish(),
			Template::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Template::List(items) => f.debug_list().entries(items.iter()).finish(),
			Template::Thenable(thenable) => Debug::fmt(thenable, f),
			Template::Observable(observable) => Debug::fmt(observable, f),
		}
	}
}

impl From<&str> for Template {
	fn from(text: &str) -> Self {
		Template::Text(text.into())
	}
}
impl From<String> for Template {
	fn from(text: String) -> Self {
		Template::Text(text.into())
	}
}
impl From<Rc<str>> for Template {
	fn from(text: Rc<str>) -> Self {
		Template::Text(text)
	}
}
impl From<f64> for Template {
	fn from(n: f64) -> Self {
		Template::Text(crate::value::number_to_string(n).into())
	}
}
impl From<i32> for Template {
	fn from(n: i32) -> Self {
		Template::from(f64::from(n))
	}
}
impl From<u32> for Template {
	fn from(n: u32) -> Self {
		Template::from(f64::from(n))
	}
}
impl From<usize> for Template {
	fn from(n: usize) -> Self {
		Template::Text(n.to_string().into())
	}
}
/// `false` renders nothing, `true` renders the text `"true"`.
impl From<bool> for Template {
	fn from(b: bool) -> Self {
		if b {
			Template::Text("true".into())
		} else {
			Template::Empty
		}
	}
}
impl<T: Into<Template>> From<Option<T>> for Template {
	fn from(template: Option<T>) -> Self {
		template.map_or(Template::Empty, Into::into)
	}
}
impl<T: Into<Template>> From<Vec<T>> for Template {
	fn from(items: Vec<T>) -> Self {
		Template::List(items.into_iter().map(Into::into).collect())
	}
}
impl From<Node> for Template {
	fn from(node: Node) -> Self {
		Template::Node(node)
	}
}
impl From<Thenable> for Template {
	fn from(thenable: Thenable) -> Self {
		Template::Thenable(thenable)
	}
}
impl From<Observable> for Template {
	fn from(observable: Observable) -> Self {
		Template::Observable(observable)
	}
}
impl From<Value> for Template {
	fn from(value: Value) -> Self {
		match value {
			Value::Null | Value::Function(_) => Template::Empty,
			Value::Bool(b) => b.into(),
			Value::Number(n) => n.into(),
			Value::String(s) => Template::Text(s),
			Value::Array(items) => Template::List(items.iter().cloned().map(Into::into).collect()),
			Value::Object(_) => value.to_js_string().map_or(Template::Empty, Into::into),
			Value::Node(node) => Template::Node(node),
		}
	}
}
