//! Component classes, their per-element instances, and the [`Host`] handle passed to component code.

use crate::{
	context::ScopeState,
	dom::{Event, EventInit, Node, WeakNode},
	error::PropertyError,
	property::{Observer, Property, Reflection},
	runtime::Runtime,
	template::{h, Props, Template},
	value::{Callback, Value},
};
use core::{
	cell::{Cell, OnceCell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{trace, trace_span};

/// Component behaviour. Every method has a default.
///
/// State that isn't a declared property can be kept in `self` with interior mutability.
pub trait Component {
	/// The default projects the light-DOM children through an unnamed slot.
	fn render(&self, host: &Host) -> Template {
		let _ = host;
		h("slot", Props::new(), vec![])
	}

	fn connected(&self, host: &Host) {
		let _ = host;
	}

	fn disconnected(&self, host: &Host) {
		let _ = host;
	}

	/// Called for observed attributes, after the mapped property (if any) was updated.
	fn attribute_changed(&self, host: &Host, name: &str, old_value: Option<&str>, new_value: Option<&str>) {
		let _ = (host, name, old_value, new_value);
	}

	fn property_changed(&self, host: &Host, name: &str, old_value: &Value, new_value: &Value) {
		let _ = (host, name, old_value, new_value);
	}
}

/// A listener attached (through delegation) to every instance.
#[derive(Clone)]
pub(crate) struct ClassListener {
	pub event: Rc<str>,
	pub selector: Option<Rc<str>>,
	pub callback: Rc<dyn Fn(&Host, &Event)>,
}

/// The resolved identity of a defined class.
#[derive(Debug, Clone)]
pub(crate) struct Definition {
	pub name: Rc<str>,
	pub extends: Option<Rc<str>>,
}
impl Definition {
	/// The tag to create instances with.
	pub fn tag(&self) -> &str {
		self.extends.as_deref().unwrap_or(&self.name)
	}
}

/// Declarations merged over the inheritance chain.
pub(crate) struct Flattened {
	pub properties: HashMap<Rc<str>, Property>,
	/// Attribute name to property name.
	pub attributes: HashMap<Rc<str>, Rc<str>>,
	pub observed_attributes: Vec<Rc<str>>,
	pub listeners: Vec<ClassListener>,
	pub styles: Vec<Rc<str>>,
}

/// A component class: a behaviour factory plus its declarations.
///
/// Cloning shares the class.
#[derive(Clone)]
pub struct ComponentClass(pub(crate) Rc<ClassData>);
pub(crate) struct ClassData {
	name: Rc<str>,
	factory: Rc<dyn Fn() -> Box<dyn Component>>,
	parent: Option<ComponentClass>,
	properties: Vec<Property>,
	observed_attributes: Vec<Rc<str>>,
	listeners: Vec<ClassListener>,
	styles: Vec<Rc<str>>,
	definition: OnceCell<Definition>,
	flattened: OnceCell<Flattened>,
}

pub struct ComponentClassBuilder {
	name: Rc<str>,
	factory: Rc<dyn Fn() -> Box<dyn Component>>,
	parent: Option<ComponentClass>,
	properties: Vec<Property>,
	observed_attributes: Vec<Rc<str>>,
	listeners: Vec<ClassListener>,
	styles: Vec<Rc<str>>,
}
impl ComponentClassBuilder {
	#[must_use]
	pub fn property(mut self, property: Property) -> Self {
		self.properties.push(property);
		self
	}

	/// Delegates `event` from descendants matching `selector` (or from anywhere, for [`None`]) to `callback`.
	#[must_use]
	pub fn listener(mut self, event: &str, selector: Option<&str>, callback: impl 'static + Fn(&Host, &Event)) -> Self {
		self.listeners.push(ClassListener {
			event: event.into(),
			selector: selector.map(Into::into),
			callback: Rc::new(callback),
		});
		self
	}

	/// A stylesheet, scoped to the component's tag when defined.
	#[must_use]
	pub fn style(mut self, css: &str) -> Self {
		self.styles.push(css.into());
		self
	}

	/// Reports an attribute to [`Component::attribute_changed`] even without a property mapped to it.
	#[must_use]
	pub fn observed_attribute(mut self, name: &str) -> Self {
		self.observed_attributes.push(name.to_ascii_lowercase().into());
		self
	}

	/// Inherits declarations from `parent`. Own declarations override inherited ones of the same name.
	#[must_use]
	pub fn inherit(mut self, parent: &ComponentClass) -> Self {
		self.parent = Some(parent.clone());
		self
	}

	#[must_use]
	pub fn build(self) -> ComponentClass {
		ComponentClass(Rc::new(ClassData {
			name: self.name,
			factory: self.factory,
			parent: self.parent,
			properties: self.properties,
			observed_attributes: self.observed_attributes,
			listeners: self.listeners,
			styles: self.styles,
			definition: OnceCell::new(),
			flattened: OnceCell::new(),
		}))
	}
}

impl ComponentClass {
	pub fn builder<C: 'static + Component>(name: &str, factory: impl 'static + Fn() -> C) -> ComponentClassBuilder {
		ComponentClassBuilder {
			name: name.into(),
			factory: Rc::new(move || Box::new(factory())),
			parent: None,
			properties: vec![],
			observed_attributes: vec![],
			listeners: vec![],
			styles: vec![],
		}
	}

	/// The class name (not the tag name).
	#[must_use]
	pub fn name(&self) -> &str {
		&self.0.name
	}

	/// The custom element name, once defined.
	#[must_use]
	pub fn tag_name(&self) -> Option<&str> {
		self.0.definition.get().map(|definition| &*definition.name)
	}

	/// The extended built-in tag, if any.
	#[must_use]
	pub fn extends(&self) -> Option<&str> {
		self.0.definition.get().and_then(|definition| definition.extends.as_deref())
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn definition(&self) -> Option<&Definition> {
		self.0.definition.get()
	}

	/// Fails (returning the existing definition) if the class was defined before.
	pub(crate) fn set_definition(&self, definition: Definition) -> Result<(), Definition> {
		self.0.definition.set(definition)
	}

	pub(crate) fn instantiate(&self) -> Box<dyn Component> {
		(self.0.factory)()
	}

	pub(crate) fn flattened(&self) -> &Flattened {
		self.0.flattened.get_or_init(|| {
			let span = trace_span!("Flattening declarations", class = %self.0.name);
			let _enter = span.enter();

			let (mut properties, mut observed_attributes, mut listeners, mut styles) = match &self.0.parent {
				Some(parent) => {
					let inherited = parent.flattened();
					(
						inherited.properties.clone(),
						inherited.observed_attributes.clone(),
						inherited.listeners.clone(),
						inherited.styles.clone(),
					)
				}
				None => (HashMap::new(), vec![], vec![], vec![]),
			};
			for property in &self.0.properties {
				if properties.insert(property.name().into(), property.clone()).is_some() {
					trace!("{} overrides inherited property {:?}", self.0.name, property.name());
				}
			}
			for attribute in &self.0.observed_attributes {
				if !observed_attributes.contains(attribute) {
					observed_attributes.push(attribute.clone());
				}
			}
			listeners.extend(self.0.listeners.iter().cloned());
			styles.extend(self.0.styles.iter().cloned());

			let mut attributes = HashMap::new();
			for property in properties.values() {
				if let Some(attribute) = property.attribute_name() {
					let attribute: Rc<str> = attribute.into();
					if !observed_attributes.contains(&attribute) {
						observed_attributes.push(attribute.clone());
					}
					attributes.insert(attribute, property.name().into());
				}
			}
			Flattened {
				properties,
				attributes,
				observed_attributes,
				listeners,
				styles,
			}
		})
	}

	/// The property declared with `name`, including inherited ones.
	#[must_use]
	pub fn property(&self, name: &str) -> Option<&Property> {
		self.flattened().properties.get(name)
	}

	#[must_use]
	pub fn observed_attributes(&self) -> &[Rc<str>] {
		&self.flattened().observed_attributes
	}
}
impl PartialEq for ComponentClass {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}
impl Debug for ComponentClass {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentClass")
			.field("name", &self.0.name)
			.field("definition", &self.0.definition.get())
			.finish_non_exhaustive()
	}
}

/// Per-element component state.
pub(crate) struct Instance {
	pub class: ComponentClass,
	pub element: WeakNode,
	pub behavior: Box<dyn Component>,
	pub values: RefCell<HashMap<Rc<str>, Value>>,
	pub observers: RefCell<HashMap<Rc<str>, Vec<Observer>>>,
	/// The light-DOM children, projected by slot markers.
	pub slot_children: RefCell<Vec<Node>>,
	pub slot_scope: RefCell<ScopeState>,
	pub initialized: Cell<bool>,
	pub connected: Cell<bool>,
	pub rendering: Cell<bool>,
	pub update_scheduled: Cell<bool>,
	/// Set while a property writes its own attribute.
	pub reflecting: Cell<bool>,
}
impl Instance {
	pub fn new(class: ComponentClass, element: &Node) -> Self {
		Self {
			behavior: class.instantiate(),
			class,
			element: element.downgrade(),
			values: RefCell::default(),
			observers: RefCell::default(),
			slot_children: RefCell::default(),
			slot_scope: RefCell::default(),
			initialized: Cell::new(false),
			connected: Cell::new(false),
			rendering: Cell::new(false),
			update_scheduled: Cell::new(false),
			reflecting: Cell::new(false),
		}
	}

	pub fn is_observed(&self, attribute: &str) -> bool {
		self.class.observed_attributes().iter().any(|observed| **observed == *attribute)
	}
}
impl Debug for Instance {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instance")
			.field("class", &self.class.0.name)
			.field("element", &self.element)
			.field("initialized", &self.initialized.get())
			.field("connected", &self.connected.get())
			.finish_non_exhaustive()
	}
}

/// A handle to one component instance.
#[derive(Clone)]
pub struct Host {
	runtime: Runtime,
	pub(crate) instance: Rc<Instance>,
}
impl Host {
	pub(crate) fn new(runtime: Runtime, instance: Rc<Instance>) -> Self {
		Self { runtime, instance }
	}

	/// [`None`] only if the element was dropped.
	#[must_use]
	pub fn element(&self) -> Option<Node> {
		self.instance.element.upgrade()
	}

	#[must_use]
	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}

	#[must_use]
	pub fn class(&self) -> &ComponentClass {
		&self.instance.class
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.instance.connected.get()
	}

	/// The current value of a declared property, through its getter. Null if undeclared.
	#[must_use]
	pub fn get(&self, name: &str) -> Value {
		match self.instance.class.property(name) {
			Some(property) => {
				let stored = self.instance.values.borrow().get(name).cloned().unwrap_or_default();
				property.read(&stored)
			}
			None => Value::Null,
		}
	}

	/// Assigns a declared property.
	///
	/// # Errors
	///
	/// If the property is undeclared or the value is rejected. The stored value is unchanged then.
	pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
		let value = value.into();
		self.runtime.batch(|| self.set_property(name, value))
	}

	#[tracing::instrument(skip(self), fields(class = %self.instance.class.0.name))]
	fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError> {
		let property = self
			.instance
			.class
			.property(name)
			.ok_or_else(|| PropertyError::Undeclared(name.to_owned()))?
			.clone();
		let value = property.prepare(value)?;
		let old_value = {
			let mut values = self.instance.values.borrow_mut();
			let old_value = values.get(name).cloned().unwrap_or_default();
			if old_value == value {
				trace!("Unchanged.");
				return Ok(());
			}
			values.insert(property.name().into(), value.clone());
			old_value
		};

		if let Some(attribute) = property.attribute_name() {
			self.reflect(&property, attribute, &value);
		}

		let observers: Vec<Observer> = property
			.observers()
			.iter()
			.cloned()
			.chain(self.instance.observers.borrow().get(name).into_iter().flatten().cloned())
			.collect();
		for observer in observers {
			observer.call(self, &old_value, &value);
		}

		self.instance.behavior.property_changed(self, name, &old_value, &value);

		if property.dispatches_event() {
			let detail = Value::object(vec![("oldValue", old_value), ("newValue", value)]);
			self.dispatch_event(&format!("{}change", name), detail);
		}

		if self.instance.initialized.get() {
			self.runtime.schedule_instance(&self.instance);
		}
		Ok(())
	}

	fn reflect(&self, property: &Property, attribute: &str, value: &Value) {
		let element = match self.element() {
			Some(element) => element,
			None => return,
		};
		let current = element.get_attribute(attribute);
		// An attribute that already parses to the value stays as written.
		if property.from_attribute(current.as_deref()) == *value {
			return;
		}
		let next = match property.to_attribute(value) {
			Reflection::Skip => return,
			Reflection::Remove => None,
			Reflection::Set(value) => Some(value),
		};
		if current == next {
			return;
		}
		self.instance.reflecting.set(true);
		let result = match next {
			Some(value) => self.runtime.set_attribute(&element, attribute, &value),
			None => self.runtime.remove_attribute(&element, attribute),
		};
		self.instance.reflecting.set(false);
		if let Err(error) = result {
			tracing::error!("Reflecting to attribute {:?} failed: {}", attribute, error);
		}
	}

	/// # Errors
	///
	/// [`PropertyError::Undeclared`] if no property `name` was declared.
	pub fn observe(&self, name: &str, observer: Observer) -> Result<(), PropertyError> {
		if self.instance.class.property(name).is_none() {
			return Err(PropertyError::Undeclared(name.to_owned()));
		}
		self.instance.observers.borrow_mut().entry(name.into()).or_default().push(observer);
		Ok(())
	}

	/// # Errors
	///
	/// [`PropertyError::Undeclared`] if no property `name` was declared.
	pub fn unobserve(&self, name: &str, observer: &Observer) -> Result<(), PropertyError> {
		if self.instance.class.property(name).is_none() {
			return Err(PropertyError::Undeclared(name.to_owned()));
		}
		if let Some(observers) = self.instance.observers.borrow_mut().get_mut(name) {
			observers.retain(|o| o != observer);
		}
		Ok(())
	}

	/// Schedules a re-render.
	pub fn force_update(&self) {
		self.runtime.batch(|| self.runtime.schedule_instance(&self.instance));
	}

	#[must_use]
	pub fn slot_children(&self) -> Vec<Node> {
		self.instance.slot_children.borrow().clone()
	}

	/// Dispatches a bubbling, cancelable event at the host element.
	///
	/// Returns `false` iff a listener prevented the default.
	pub fn dispatch_event(&self, event_type: &str, detail: Value) -> bool {
		match self.element() {
			Some(element) => self.runtime.batch(|| {
				element.dispatch_event(&Event::new(
					event_type,
					EventInit {
						bubbles: true,
						cancelable: true,
						detail,
					},
				))
			}),
			None => true,
		}
	}

	/// A [`Callback`] that runs `f` with this host. Holds the instance strongly.
	pub fn callback(&self, f: impl 'static + Fn(&Host, &Event)) -> Callback {
		let host = self.clone();
		Callback::new(move |event| f(&host, event))
	}
}
impl Debug for Host {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Host").field(&self.instance).finish()
	}
}
