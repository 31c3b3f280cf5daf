//! Error types returned by the fallible public operations.
//!
//! All of these are reported synchronously to the caller of the operation that caused them.
//! There is no internal catch-and-continue layer, except that the renderer logs (rather than returns)
//! property errors caused by template props.

use crate::value::{PropType, ValueType};
use thiserror::Error;

/// Failure to [`define`](`crate::Runtime::define`) a custom element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
	#[error("{name:?} is not a valid custom element name: {reason}")]
	InvalidName { name: String, reason: &'static str },
	#[error("a custom element named {0:?} has already been defined")]
	AlreadyDefined(String),
	#[error("component class `{class}` is already defined as {existing:?}")]
	ClassAlreadyDefined { class: String, existing: String },
	#[error("cannot extend {0:?}: only built-in (non-custom) elements can be extended")]
	InvalidExtends(String),
}

/// Failure to assign or observe a declared property.
///
/// An assignment that fails leaves the stored value unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
	#[error("property {property:?} accepts {expected:?} but received a value of type {found:?}")]
	Type {
		property: String,
		expected: Vec<PropType>,
		found: ValueType,
	},
	#[error("property {property:?} rejected the assigned value")]
	Validation { property: String },
	#[error("{0:?} is not a declared property")]
	Undeclared(String),
}

/// Failure to parse a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
	#[error("empty selector")]
	Empty,
	#[error("unexpected {found:?} at offset {offset} in selector {selector:?}")]
	Unexpected { selector: String, offset: usize, found: char },
	#[error("unterminated attribute selector in {0:?}")]
	UnterminatedAttribute(String),
}

/// Invalid input to one of the event delegation operations.
///
/// These are raised eagerly, before any listener is attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegationError {
	#[error("delegation root must be an element")]
	InvalidRoot,
	#[error("event name must not be empty")]
	EmptyEventName,
	#[error(transparent)]
	InvalidSelector(#[from] SelectorError),
}

/// Failure of a structural DOM operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
	#[error("the node cannot be inserted at this position")]
	HierarchyRequest,
	#[error("the reference node is not a child of this node")]
	NotFound,
}
