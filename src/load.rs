//! Imports browser DOM into the emulated [`Document`], so that server-rendered or hand-written markup can be
//! [upgraded](`crate::Runtime::upgrade`) and rendered over.
//!
//! Processing instructions, document types and other exotic node types are skipped with a warning.

use crate::{
	dom::{Document, Namespace, Node, MATHML_NAMESPACE, SVG_NAMESPACE},
	error::DomError,
};
use tracing::{instrument, warn};
use wasm_bindgen::JsCast;
use web_sys::{Attr, Comment, Element, NamedNodeMap, Node as wNode, NodeList, Text};

/// Appends copies of `child_nodes` to `parent`. Returns how many were imported.
///
/// # Errors
///
/// If `parent` can't hold children.
#[instrument(skip(document, child_nodes))]
pub fn load_child_nodes(document: &Document, parent: &Node, child_nodes: &NodeList) -> Result<usize, DomError> {
	let mut loaded = 0;
	for i in 0..child_nodes.length() {
		let child = match child_nodes.item(i) {
			Some(child) => child,
			None => continue,
		};
		if let Some(node) = load_node(document, &child) {
			parent.append_child(&node)?;
			loaded += 1;
		}
	}
	Ok(loaded)
}

#[must_use]
pub fn load_node(document: &Document, node: &wNode) -> Option<Node> {
	if let Some(element) = node.dyn_ref::<Element>() {
		Some(load_element(document, element))
	} else if let Some(text) = node.dyn_ref::<Text>() {
		Some(document.create_text_node(&text.data()))
	} else if let Some(comment) = node.dyn_ref::<Comment>() {
		Some(document.create_comment(&comment.data()))
	} else {
		warn!("Skipping unrecognised node: {:?}", node);
		None
	}
}

/// Copies `element` with its attributes and descendants.
#[must_use]
pub fn load_element(document: &Document, element: &Element) -> Node {
	let namespace = match element.namespace_uri().as_deref() {
		Some(SVG_NAMESPACE) => Namespace::Svg,
		Some(MATHML_NAMESPACE) => Namespace::MathMl,
		_ => Namespace::Html,
	};
	let node = document.create_element_ns(namespace, &element.local_name());
	load_attributes(&node, &element.attributes());
	let web_node: &wNode = element.as_ref();
	if let Err(error) = load_child_nodes(document, &node, &web_node.child_nodes()) {
		warn!("Could not import the children of {:?}: {}", node, error);
	}
	node
}

pub fn load_attributes(node: &Node, attributes: &NamedNodeMap) {
	for i in 0..attributes.length() {
		if let Some(attribute) = attributes.item(i) {
			load_attribute(node, &attribute);
		}
	}
}

pub fn load_attribute(node: &Node, attribute: &Attr) {
	node.set_attribute(&attribute.name(), &attribute.value());
}
