//! Declared component properties and their attribute conversion.

use crate::{
	component::Host,
	error::PropertyError,
	value::{number_to_string, parse_number, PropType, Value},
};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// A property change observer, called with `(host, old_value, new_value)`.
///
/// Identity (for [`Host::unobserve`]) is by allocation, so keep a clone around to remove it later.
#[derive(Clone)]
pub struct Observer(Rc<dyn Fn(&Host, &Value, &Value)>);
impl Observer {
	pub fn new(f: impl 'static + Fn(&Host, &Value, &Value)) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, host: &Host, old_value: &Value, new_value: &Value) {
		(self.0)(host, old_value, new_value)
	}
}
impl PartialEq for Observer {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for Observer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Observer({:p})", Rc::as_ptr(&self.0).cast::<()>())
	}
}

/// What writing a property value to its attribute should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reflection {
	Set(String),
	Remove,
	/// The value has no attribute form.
	Skip,
}

/// A property declaration.
///
/// ```
/// use custom_elements_dom::{Property, PropType};
///
/// let age = Property::new("age").ty(PropType::Number).attribute().default(0);
/// assert_eq!(age.attribute_name(), Some("age"));
/// ```
#[derive(Clone)]
pub struct Property {
	name: Rc<str>,
	types: Vec<PropType>,
	attribute: Option<Rc<str>>,
	default: Value,
	getter: Option<Rc<dyn Fn(&Value) -> Value>>,
	setter: Option<Rc<dyn Fn(Value) -> Value>>,
	validator: Option<Rc<dyn Fn(&Value) -> bool>>,
	observers: Vec<Observer>,
	event: bool,
}
impl Property {
	#[must_use]
	pub fn new(name: &str) -> Self {
		Self {
			name: name.into(),
			types: vec![],
			attribute: None,
			default: Value::Null,
			getter: None,
			setter: None,
			validator: None,
			observers: vec![],
			event: false,
		}
	}

	#[must_use]
	pub fn ty(mut self, ty: PropType) -> Self {
		self.types = vec![ty];
		self
	}

	/// Accept any of `types`. No types means any value is accepted.
	#[must_use]
	pub fn types(mut self, types: impl IntoIterator<Item = PropType>) -> Self {
		self.types = types.into_iter().collect();
		self
	}

	/// Syncs the property with the attribute of the same name.
	#[must_use]
	pub fn attribute(self) -> Self {
		let name = self.name.clone();
		self.attribute_named(&name)
	}

	#[must_use]
	pub fn attribute_named(mut self, attribute: &str) -> Self {
		self.attribute = Some(attribute.to_ascii_lowercase().into());
		self
	}

	#[must_use]
	pub fn default(mut self, value: impl Into<Value>) -> Self {
		self.default = value.into();
		self
	}

	/// Transforms the stored value on read.
	#[must_use]
	pub fn getter(mut self, getter: impl 'static + Fn(&Value) -> Value) -> Self {
		self.getter = Some(Rc::new(getter));
		self
	}

	/// Transforms assigned values before validation.
	#[must_use]
	pub fn setter(mut self, setter: impl 'static + Fn(Value) -> Value) -> Self {
		self.setter = Some(Rc::new(setter));
		self
	}

	/// Rejects assignments for which `validator` returns `false`. Not consulted for null.
	#[must_use]
	pub fn validate(mut self, validator: impl 'static + Fn(&Value) -> bool) -> Self {
		self.validator = Some(Rc::new(validator));
		self
	}

	#[must_use]
	pub fn observe(mut self, observer: impl 'static + Fn(&Host, &Value, &Value)) -> Self {
		self.observers.push(Observer::new(observer));
		self
	}

	/// Dispatch a bubbling `<name>change` event with `{ oldValue, newValue }` detail on change.
	#[must_use]
	pub fn event(mut self) -> Self {
		self.event = true;
		self
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub fn accepted_types(&self) -> &[PropType] {
		&self.types
	}

	#[must_use]
	pub fn attribute_name(&self) -> Option<&str> {
		self.attribute.as_deref()
	}

	#[must_use]
	pub fn default_value(&self) -> &Value {
		&self.default
	}

	#[must_use]
	pub fn dispatches_event(&self) -> bool {
		self.event
	}

	pub(crate) fn observers(&self) -> &[Observer] {
		&self.observers
	}

	/// Whether only presence of the attribute matters.
	#[must_use]
	pub fn is_boolean_style(&self) -> bool {
		self.types == [PropType::Boolean]
	}

	fn accepts_type(&self, ty: PropType) -> bool {
		self.types.contains(&ty)
	}

	/// Null is always accepted.
	#[must_use]
	pub fn accepts(&self, value: &Value) -> bool {
		value.is_null() || self.types.is_empty() || self.types.iter().any(|ty| ty.accepts(value))
	}

	/// Runs the setter, then the type check, then the validator.
	///
	/// # Errors
	///
	/// [`PropertyError::Type`] or [`PropertyError::Validation`].
	pub fn prepare(&self, value: Value) -> Result<Value, PropertyError> {
		let value = match &self.setter {
			Some(setter) => setter(value),
			None => value,
		};
		if !self.accepts(&value) {
			return Err(PropertyError::Type {
				property: self.name.to_string(),
				expected: self.types.clone(),
				found: value.type_of(),
			});
		}
		if let Some(validator) = &self.validator {
			if !value.is_null() && !validator(&value) {
				return Err(PropertyError::Validation { property: self.name.to_string() });
			}
		}
		Ok(value)
	}

	/// Applies the getter to a stored value.
	#[must_use]
	pub fn read(&self, stored: &Value) -> Value {
		match &self.getter {
			Some(getter) => getter(stored),
			None => stored.clone(),
		}
	}

	/// The attribute form of `value`.
	#[must_use]
	pub fn to_attribute(&self, value: &Value) -> Reflection {
		match value {
			Value::Null | Value::Bool(false) => Reflection::Remove,
			Value::Bool(true) => Reflection::Set(String::new()),
			Value::Number(n) => Reflection::Set(number_to_string(*n)),
			Value::String(s) => Reflection::Set(s.to_string()),
			Value::Array(_) | Value::Object(_) => value.to_js_string().map_or(Reflection::Skip, Reflection::Set),
			Value::Function(_) | Value::Node(_) => Reflection::Skip,
		}
	}

	/// The property value for an attribute value.
	#[must_use]
	pub fn from_attribute(&self, attribute: Option<&str>) -> Value {
		let attribute = match attribute {
			Some(attribute) => attribute,
			None if self.is_boolean_style() => return Value::Bool(false),
			None => return Value::Null,
		};
		if self.accepts_type(PropType::Boolean)
			&& (attribute.is_empty() || Some(attribute) == self.attribute_name() || attribute == &*self.name)
		{
			return Value::Bool(true);
		}
		if self.accepts_type(PropType::Number) {
			if let Some(number) = parse_number(attribute) {
				return Value::Number(number);
			}
		}
		if self.accepts_type(PropType::Array) || self.accepts_type(PropType::Object) || self.accepts_type(PropType::Boolean) {
			if let Ok(json) = serde_json::from_str(attribute) {
				let value = Value::from_json(json);
				if !value.is_null() && self.types.iter().any(|ty| ty.accepts(&value)) {
					return value;
				}
			}
		}
		Value::from(attribute)
	}
}
impl Debug for Property {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Property")
			.field("name", &self.name)
			.field("types", &self.types)
			.field("attribute", &self.attribute)
			.field("default", &self.default)
			.field("observers", &self.observers.len())
			.field("event", &self.event)
			.finish_non_exhaustive()
	}
}
