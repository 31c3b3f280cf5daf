#![doc(html_root_url = "https://docs.rs/custom-elements-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Custom elements with declared properties, delegated events and scoped styles,
//! rendered by a reconciling template renderer over a small in-memory DOM.
//!
//! Start with a [`Runtime`], [`define`](`Runtime::define`) some [`ComponentClass`]es and [`render`](`Runtime::render`) templates built with [`h`].

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod component;
mod context;
mod css;
mod delegate;
mod diff;
pub mod dom;
pub mod error;
#[cfg(feature = "web")]
pub mod load;
mod property;
mod rc_hash_map;
mod registry;
mod runtime;
mod selector;
mod temp_set;
mod template;
mod value;

pub use component::{Component, ComponentClass, ComponentClassBuilder, Host};
pub use css::css;
pub use dom::{Document, Event, EventInit, Namespace, Node, NodeType};
pub use property::{Observer, Property, Reflection};
pub use registry::{validate_name, Canceled, DefineOptions};
pub use runtime::{Options, Runtime};
pub use selector::SelectorList;
pub use template::{h, ElementKind, Fragment, FunctionComponent, Invocation, Observable, Props, State, Template, TemplateType, Thenable, Updater, VElement, VFunction, VSlot};
pub use value::{Callback, Key, PropType, Value, ValueType};
