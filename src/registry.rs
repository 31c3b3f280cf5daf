//! Custom element definitions and upgrades.

use crate::{
	component::{ComponentClass, Definition, Host},
	dom::Node,
	error::DefinitionError,
	runtime::Runtime,
};
use futures::{channel::oneshot, future::LocalBoxFuture, FutureExt};
use std::{iter, rc::Rc};
use tracing::{error, info, instrument, trace};

pub use futures::channel::oneshot::Canceled;

/// Options for [`Runtime::define`].
#[derive(Debug, Clone, Default)]
pub struct DefineOptions {
	/// The built-in element this customizes, making instances `<extends is="name">`.
	pub extends: Option<String>,
}

const RESERVED_NAMES: &[&str] = &[
	"annotation-xml",
	"color-profile",
	"font-face",
	"font-face-src",
	"font-face-uri",
	"font-face-format",
	"font-face-name",
	"missing-glyph",
];

/// Checks `name` against the custom element name rules.
///
/// # Errors
///
/// [`DefinitionError::InvalidName`] with the violated rule.
pub fn validate_name(name: &str) -> Result<(), DefinitionError> {
	let invalid = |reason| {
		Err(DefinitionError::InvalidName {
			name: name.to_owned(),
			reason,
		})
	};
	if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
		return invalid("it must start with a lowercase ASCII letter");
	}
	if !name.contains('-') {
		return invalid("it must contain a hyphen");
	}
	if !name
		.chars()
		.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
	{
		return invalid("it may only contain lowercase ASCII letters, digits, '-', '.' and '_'");
	}
	if RESERVED_NAMES.contains(&name) {
		return invalid("it is reserved");
	}
	Ok(())
}

fn validate_extends(extends: &str) -> Result<(), DefinitionError> {
	if extends.is_empty() || extends.contains('-') || !extends.chars().all(|c| c.is_ascii_alphanumeric()) {
		Err(DefinitionError::InvalidExtends(extends.to_owned()))
	} else {
		Ok(())
	}
}

impl Runtime {
	/// Registers `class` as the custom element `name`.
	///
	/// Resolves pending [`Runtime::when_defined`] futures for `name` and,
	/// if [`Options::upgrade_on_define`](`crate::Options::upgrade_on_define`) is set, upgrades matching elements in the document.
	///
	/// # Errors
	///
	/// - [`DefinitionError::InvalidName`] and [`DefinitionError::InvalidExtends`] for syntactically invalid input,
	/// - [`DefinitionError::AlreadyDefined`] if `name` is taken,
	/// - [`DefinitionError::ClassAlreadyDefined`] if `class` was registered under another name before.
	#[instrument(skip(self, class), fields(class = class.name()))]
	pub fn define(&self, name: &str, class: &ComponentClass, options: DefineOptions) -> Result<(), DefinitionError> {
		validate_name(name)?;
		let extends = match options.extends {
			Some(extends) => {
				let extends = extends.to_ascii_lowercase();
				validate_extends(&extends)?;
				Some(Rc::<str>::from(extends))
			}
			None => None,
		};
		if self.shared().definitions.borrow().contains_key(name) {
			return Err(DefinitionError::AlreadyDefined(name.to_owned()));
		}
		let name: Rc<str> = name.into();
		class
			.set_definition(Definition {
				name: name.clone(),
				extends,
			})
			.map_err(|_| DefinitionError::ClassAlreadyDefined {
				class: class.name().to_owned(),
				existing: class.tag_name().unwrap_or_default().to_owned(),
			})?;
		let flattened = class.flattened();
		trace!(
			"Flattened {} properties, {} observed attributes, {} listeners and {} stylesheets.",
			flattened.properties.len(),
			flattened.observed_attributes.len(),
			flattened.listeners.len(),
			flattened.styles.len()
		);
		self.shared().definitions.borrow_mut().insert(name.clone(), class.clone());
		info!("Defined <{}>", name);

		let pending = self.shared().pending.borrow_mut().remove(&name);
		for sender in pending.into_iter().flatten() {
			// A dropped receiver just means nobody is waiting anymore.
			sender.send(()).ok();
		}

		if self.options().upgrade_on_define {
			let root = self.document().root().clone();
			self.upgrade(&root);
		}
		Ok(())
	}

	/// The class defined as `name`, if any.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<ComponentClass> {
		self.definition(name)
	}

	/// Resolves once `name` is defined (immediately if it already is).
	///
	/// Fails with [`Canceled`] if the runtime is dropped first.
	pub fn when_defined(&self, name: &str) -> LocalBoxFuture<'static, Result<(), Canceled>> {
		if self.definition(name).is_some() {
			return futures::future::ready(Ok(())).boxed_local();
		}
		let (sender, receiver) = oneshot::channel();
		self.shared().pending.borrow_mut().entry(name.into()).or_default().push(sender);
		receiver.boxed_local()
	}

	/// Upgrades `root` and its descendants (in tree order) that match a definition but aren't instances yet.
	///
	/// Observed attributes already present are replayed through
	/// [`Component::attribute_changed`](`crate::Component::attribute_changed`) before the initial render.
	#[instrument(skip(self))]
	pub fn upgrade(&self, root: &Node) {
		self.batch(|| {
			for node in iter::once(root.clone()).chain(root.descendants()) {
				if node.is_element() && self.instance(&node).is_none() {
					if let Some(class) = self.resolve(&node) {
						self.upgrade_element(&node, &class);
					}
				}
			}
		});
	}

	/// The definition an element's `is` attribute or tag name refers to.
	fn resolve(&self, element: &Node) -> Option<ComponentClass> {
		let local_name = element.local_name()?;
		match element.get_attribute("is") {
			Some(is) => self.definition(&is).filter(|class| class.extends() == Some(&*local_name)),
			None => self.definition(&local_name).filter(|class| class.extends().is_none()),
		}
	}

	fn upgrade_element(&self, element: &Node, class: &ComponentClass) {
		trace!("Upgrading {:?}", element);
		let instance = self.construct(element, class);
		for attribute in class.observed_attributes() {
			if let Some(value) = element.get_attribute(attribute) {
				if let Err(error) = self.attribute_changed(element, attribute, None, Some(&value)) {
					error!("Replaying attribute {:?} on {:?} failed: {}", attribute, element, error);
				}
			}
		}
		self.initialize(&instance);
		if element.is_connected() && !instance.connected.replace(true) {
			instance.behavior.connected(&Host::new(self.clone(), instance.clone()));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::validate_name;
	use crate::error::DefinitionError;

	#[test]
	fn name_rules() {
		assert!(validate_name("x-card").is_ok());
		assert!(validate_name("my-el.v2_b").is_ok());
		for name in ["card", "X-card", "1-card", "-card", "x-Card", "x card", "font-face"] {
			assert!(
				matches!(validate_name(name), Err(DefinitionError::InvalidName { .. })),
				"{:?} should be rejected",
				name
			);
		}
	}
}
