//! Dynamic values carried by template props and declared component properties.

use crate::dom::{Event, Node};
use core::fmt::{self, Debug, Display, Formatter};
use std::{collections::BTreeMap, rc::Rc};

/// A reference-counted event callback.
///
/// Two [`Callback`]s are equal only if they are clones of the same allocation,
/// which mirrors how listener identity works for [***addEventListener***](https://developer.mozilla.org/en-US/docs/Web/API/EventTarget/addEventListener).
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);
impl Callback {
	pub fn new(f: impl 'static + Fn(&Event)) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}
}
impl PartialEq for Callback {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for Callback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
	}
}

/// A property or prop value.
///
/// [`PartialEq`] is strict equality: primitives compare by value (with `NaN` unequal to itself),
/// everything else by reference.
#[derive(Clone)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(Rc<str>),
	Array(Rc<[Value]>),
	Object(Rc<BTreeMap<String, Value>>),
	Function(Callback),
	Node(Node),
}

/// The runtime type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
	Null,
	Boolean,
	Number,
	String,
	Array,
	Object,
	Function,
	Node,
}

/// An accepted type in a property declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropType {
	Boolean,
	Number,
	String,
	Array,
	Object,
	Function,
	Node,
}
impl PropType {
	#[must_use]
	pub fn accepts(self, value: &Value) -> bool {
		matches!(
			(self, value),
			(Self::Boolean, Value::Bool(_))
				| (Self::Number, Value::Number(_))
				| (Self::String, Value::String(_))
				| (Self::Array, Value::Array(_))
				| (Self::Object, Value::Object(_))
				| (Self::Function, Value::Function(_))
				| (Self::Node, Value::Node(_))
		)
	}
}

impl Value {
	#[must_use]
	pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
		Self::Array(items.into_iter().collect())
	}

	#[must_use]
	pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
		Self::Object(Rc::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()))
	}

	#[must_use]
	pub fn type_of(&self) -> ValueType {
		match self {
			Value::Null => ValueType::Null,
			Value::Bool(_) => ValueType::Boolean,
			Value::Number(_) => ValueType::Number,
			Value::String(_) => ValueType::String,
			Value::Array(_) => ValueType::Array,
			Value::Object(_) => ValueType::Object,
			Value::Function(_) => ValueType::Function,
			Value::Node(_) => ValueType::Node,
		}
	}

	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match *self {
			Value::Bool(b) => Some(b),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_f64(&self) -> Option<f64> {
		match *self {
			Value::Number(n) => Some(n),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Value::Array(items) => Some(items),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
		match self {
			Value::Object(entries) => Some(entries),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_callback(&self) -> Option<&Callback> {
		match self {
			Value::Function(callback) => Some(callback),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_node(&self) -> Option<&Node> {
		match self {
			Value::Node(node) => Some(node),
			_ => None,
		}
	}

	/// JavaScript truthiness.
	#[must_use]
	pub fn truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::String(s) => !s.is_empty(),
			_ => true,
		}
	}

	/// Values that are assigned as live properties rather than mirrored into attributes.
	#[must_use]
	pub fn is_live(&self) -> bool {
		matches!(self, Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_))
	}

	/// The string form used when writing this value into an attribute or text node.
	///
	/// Returns [`None`] for functions and nodes, which have no serialization.
	#[must_use]
	pub fn to_js_string(&self) -> Option<String> {
		match self {
			Value::Null => Some("null".to_owned()),
			Value::Bool(b) => Some(b.to_string()),
			Value::Number(n) => Some(number_to_string(*n)),
			Value::String(s) => Some(s.to_string()),
			Value::Array(_) | Value::Object(_) => self.to_json().map(|json| json.to_string()),
			Value::Function(_) | Value::Node(_) => None,
		}
	}

	/// Converts to JSON the way `JSON.stringify` would.
	///
	/// Functions and nodes become `null` inside containers and [`None`] at the top level.
	#[must_use]
	pub fn to_json(&self) -> Option<serde_json::Value> {
		Some(match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Number(n) => json_number(*n),
			Value::String(s) => serde_json::Value::String(s.to_string()),
			Value::Array(items) => serde_json::Value::Array(items.iter().map(|item| item.to_json().unwrap_or(serde_json::Value::Null)).collect()),
			Value::Object(entries) => serde_json::Value::Object(
				entries
					.iter()
					.filter_map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
					.collect(),
			),
			Value::Function(_) | Value::Node(_) => return None,
		})
	}

	#[must_use]
	pub fn from_json(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(s) => Value::String(s.into()),
			serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from_json)),
			serde_json::Value::Object(entries) => Value::object(entries.into_iter().map(|(k, v)| (k, Value::from_json(v)))),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			#[allow(clippy::float_cmp)]
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
			(Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
			(Value::Function(a), Value::Function(b)) => a == b,
			(Value::Node(a), Value::Node(b)) => a == b,
			_ => false,
		}
	}
}

impl Debug for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::Bool(b) => Debug::fmt(b, f),
			Value::Number(n) => f.write_str(&number_to_string(*n)),
			Value::String(s) => Debug::fmt(s, f),
			Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
			Value::Object(entries) => f.debug_map().entries(entries.iter()).finish(),
			Value::Function(callback) => Debug::fmt(callback, f),
			Value::Node(node) => Debug::fmt(node, f),
		}
	}
}

impl Default for Value {
	fn default() -> Self {
		Value::Null
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}
impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Value::Number(n)
	}
}
impl From<f32> for Value {
	fn from(n: f32) -> Self {
		Value::Number(n.into())
	}
}
impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Value::Number(n.into())
	}
}
impl From<u32> for Value {
	fn from(n: u32) -> Self {
		Value::Number(n.into())
	}
}
impl From<i64> for Value {
	#[allow(clippy::cast_precision_loss)]
	fn from(n: i64) -> Self {
		Value::Number(n as f64)
	}
}
impl From<usize> for Value {
	#[allow(clippy::cast_precision_loss)]
	fn from(n: usize) -> Self {
		Value::Number(n as f64)
	}
}
impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.into())
	}
}
impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s.into())
	}
}
impl From<Rc<str>> for Value {
	fn from(s: Rc<str>) -> Self {
		Value::String(s)
	}
}
impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::Array(items.into())
	}
}
impl From<Callback> for Value {
	fn from(callback: Callback) -> Self {
		Value::Function(callback)
	}
}
impl From<Node> for Value {
	fn from(node: Node) -> Self {
		Value::Node(node)
	}
}
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// A reconciliation key.
///
/// Numeric keys are normalized so that `0` and `-0` collide, as they would in a JavaScript `Map`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Text(Rc<str>),
	Number(u64),
}
impl Key {
	/// Keys can only be made from strings and numbers.
	#[must_use]
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::String(s) => Some(Key::Text(s.clone())),
			Value::Number(n) => Some(Key::from(*n)),
			_ => None,
		}
	}
}
impl From<f64> for Key {
	fn from(n: f64) -> Self {
		Key::Number(if n == 0.0 { 0.0_f64.to_bits() } else { n.to_bits() })
	}
}
impl From<i32> for Key {
	fn from(n: i32) -> Self {
		Key::from(f64::from(n))
	}
}
impl From<&str> for Key {
	fn from(s: &str) -> Self {
		Key::Text(s.into())
	}
}
impl Display for Key {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Key::Text(s) => f.write_str(s),
			Key::Number(bits) => f.write_str(&number_to_string(f64::from_bits(*bits))),
		}
	}
}

/// Integral numbers serialize without a fraction, as in `JSON.stringify`.
fn json_number(n: f64) -> serde_json::Value {
	const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
	if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
		#[allow(clippy::cast_possible_truncation)]
		return serde_json::Value::from(n as i64);
	}
	serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Formats a number like JavaScript's `String(number)`.
#[must_use]
pub fn number_to_string(n: f64) -> String {
	if n.is_nan() {
		"NaN".to_owned()
	} else if n.is_infinite() {
		(if n > 0.0 { "Infinity" } else { "-Infinity" }).to_owned()
	} else if n == 0.0 {
		"0".to_owned()
	} else if n.abs() >= 1e21 || n.abs() < 1e-6 {
		let exponential = format!("{:e}", n);
		match exponential.split_once('e') {
			Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
			_ => exponential,
		}
	} else if n.fract() == 0.0 {
		#[allow(clippy::cast_possible_truncation)]
		let integral = n as i128;
		integral.to_string()
	} else {
		n.to_string()
	}
}

/// Parses a number the way JavaScript's `Number(string)` does, except that blank input is rejected.
///
/// Surrounding whitespace is ignored. Accepted are decimal literals with optional sign, fraction and exponent,
/// unsigned `0x`/`0o`/`0b` integers and `Infinity`. Spellings like `inf` or `nan` are not numbers.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
	let text = text.trim();
	let (negative, unsigned) = match text.as_bytes().first() {
		Some(b'-') => (true, &text[1..]),
		Some(b'+') => (false, &text[1..]),
		_ => (false, text),
	};
	let magnitude = if unsigned == "Infinity" {
		f64::INFINITY
	} else if let Some((radix, digits)) = radix_digits(unsigned).filter(|_| unsigned.len() == text.len()) {
		if digits.is_empty() {
			return None;
		}
		digits
			.chars()
			.try_fold(0.0, |acc, c| c.to_digit(radix).map(|digit| acc * f64::from(radix) + f64::from(digit)))?
	} else if is_decimal_literal(unsigned) {
		unsigned.parse::<f64>().ok()?
	} else {
		return None;
	};
	Some(if negative { -magnitude } else { magnitude })
}

fn radix_digits(text: &str) -> Option<(u32, &str)> {
	let prefix = text.get(..2)?;
	let radix = match prefix {
		"0x" | "0X" => 16,
		"0o" | "0O" => 8,
		"0b" | "0B" => 2,
		_ => return None,
	};
	Some((radix, &text[2..]))
}

/// `digits [. digits] [e [sign] digits]`, with at least one mantissa digit.
fn is_decimal_literal(text: &str) -> bool {
	let bytes = text.as_bytes();
	let mut i = 0;
	let mut mantissa_digits = 0;
	while i < bytes.len() && bytes[i].is_ascii_digit() {
		i += 1;
		mantissa_digits += 1;
	}
	if i < bytes.len() && bytes[i] == b'.' {
		i += 1;
		while i < bytes.len() && bytes[i].is_ascii_digit() {
			i += 1;
			mantissa_digits += 1;
		}
	}
	if mantissa_digits == 0 {
		return false;
	}
	if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
		i += 1;
		if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
			i += 1;
		}
		let exponent_start = i;
		while i < bytes.len() && bytes[i].is_ascii_digit() {
			i += 1;
		}
		if i == exponent_start {
			return false;
		}
	}
	i == bytes.len()
}
