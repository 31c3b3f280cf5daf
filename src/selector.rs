//! A small CSS selector engine covering what delegation and component code need.
//!
//! Supported: selector lists, the descendant and child combinators, type and universal selectors,
//! `#id`, `.class` and the `[attr]`, `=`, `~=`, `^=`, `$=` and `*=` attribute forms.

use crate::{dom::Node, error::SelectorError};
use core::{iter::Peekable, str::CharIndices};

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
	source: String,
	complexes: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex(Vec<(Combinator, Compound)>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
	Descendant,
	Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
	tag: Option<String>,
	ids: Vec<String>,
	classes: Vec<String>,
	attributes: Vec<AttributeSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
	name: String,
	test: Option<(Operator, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
	Equals,
	Includes,
	Prefix,
	Suffix,
	Substring,
}

impl SelectorList {
	/// # Errors
	///
	/// Iff `source` isn't a selector list of the supported forms.
	pub fn parse(source: &str) -> Result<Self, SelectorError> {
		let mut parser = Parser {
			source,
			chars: source.char_indices().peekable(),
		};
		let mut complexes = vec![];
		loop {
			parser.skip_whitespace();
			complexes.push(parser.complex()?);
			parser.skip_whitespace();
			match parser.chars.next() {
				None => break,
				Some((_, ',')) => continue,
				Some((offset, found)) => return Err(parser.unexpected(offset, found)),
			}
		}
		Ok(Self {
			source: source.to_owned(),
			complexes,
		})
	}

	#[must_use]
	pub fn source(&self) -> &str {
		&self.source
	}

	#[must_use]
	pub fn matches(&self, node: &Node) -> bool {
		self.complexes.iter().any(|complex| complex.matches_at(complex.0.len() - 1, node))
	}
}

impl Complex {
	fn matches_at(&self, i: usize, node: &Node) -> bool {
		let (combinator, compound) = &self.0[i];
		if !compound.matches(node) {
			return false;
		}
		if i == 0 {
			return true;
		}
		match combinator {
			Combinator::Child => node.parent_node().map_or(false, |parent| self.matches_at(i - 1, &parent)),
			Combinator::Descendant => {
				let mut ancestor = node.parent_node();
				while let Some(current) = ancestor {
					if self.matches_at(i - 1, &current) {
						return true;
					}
					ancestor = current.parent_node();
				}
				false
			}
		}
	}
}

impl Compound {
	fn is_empty(&self) -> bool {
		self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attributes.is_empty()
	}

	fn matches(&self, node: &Node) -> bool {
		let local_name = match node.local_name() {
			Some(local_name) => local_name,
			None => return false,
		};
		if let Some(tag) = &self.tag {
			if tag != "*" && !tag.eq_ignore_ascii_case(&local_name) {
				return false;
			}
		}
		self.ids.iter().all(|id| node.get_attribute("id").as_deref() == Some(id.as_str()))
			&& self.classes.iter().all(|class| node.has_class(class))
			&& self.attributes.iter().all(|attribute| attribute.matches(node))
	}
}

impl AttributeSelector {
	fn matches(&self, node: &Node) -> bool {
		let value = match node.get_attribute(&self.name) {
			Some(value) => value,
			None => return false,
		};
		match &self.test {
			None => true,
			Some((Operator::Equals, expected)) => value == *expected,
			Some((Operator::Includes, expected)) => value.split_ascii_whitespace().any(|token| token == expected),
			Some((Operator::Prefix, expected)) => !expected.is_empty() && value.starts_with(expected.as_str()),
			Some((Operator::Suffix, expected)) => !expected.is_empty() && value.ends_with(expected.as_str()),
			Some((Operator::Substring, expected)) => !expected.is_empty() && value.contains(expected.as_str()),
		}
	}
}

struct Parser<'a> {
	source: &'a str,
	chars: Peekable<CharIndices<'a>>,
}
impl Parser<'_> {
	fn unexpected(&self, offset: usize, found: char) -> SelectorError {
		SelectorError::Unexpected {
			selector: self.source.to_owned(),
			offset,
			found,
		}
	}

	fn peek(&mut self) -> Option<char> {
		self.chars.peek().map(|&(_, c)| c)
	}

	/// Returns whether any whitespace was skipped.
	fn skip_whitespace(&mut self) -> bool {
		let mut skipped = false;
		while self.peek().map_or(false, char::is_whitespace) {
			self.chars.next();
			skipped = true;
		}
		skipped
	}

	fn complex(&mut self) -> Result<Complex, SelectorError> {
		let mut compounds = vec![];
		let mut combinator = Combinator::Descendant;
		loop {
			compounds.push((combinator, self.compound()?));
			let had_whitespace = self.skip_whitespace();
			match self.peek() {
				None | Some(',') => break,
				Some('>') => {
					self.chars.next();
					self.skip_whitespace();
					combinator = Combinator::Child;
				}
				Some(_) if had_whitespace => combinator = Combinator::Descendant,
				Some(found) => {
					let offset = self.chars.peek().map_or(self.source.len(), |&(offset, _)| offset);
					return Err(self.unexpected(offset, found));
				}
			}
		}
		Ok(Complex(compounds))
	}

	fn compound(&mut self) -> Result<Compound, SelectorError> {
		let mut compound = Compound::default();
		if self.peek() == Some('*') {
			self.chars.next();
			compound.tag = Some("*".to_owned());
		} else if let Some(tag) = self.identifier() {
			compound.tag = Some(tag);
		}
		loop {
			match self.chars.peek().copied() {
				Some((offset, '#')) => {
					self.chars.next();
					compound.ids.push(self.identifier().ok_or_else(|| self.unexpected(offset, '#'))?);
				}
				Some((offset, '.')) => {
					self.chars.next();
					compound.classes.push(self.identifier().ok_or_else(|| self.unexpected(offset, '.'))?);
				}
				Some((_, '[')) => {
					self.chars.next();
					compound.attributes.push(self.attribute()?);
				}
				_ => break,
			}
		}
		if compound.is_empty() {
			return Err(match self.chars.peek().copied() {
				None => SelectorError::Empty,
				Some((offset, found)) => self.unexpected(offset, found),
			});
		}
		Ok(compound)
	}

	fn identifier(&mut self) -> Option<String> {
		let mut identifier = String::new();
		while let Some(c) = self.peek() {
			if c == '\\' {
				self.chars.next();
				if let Some((_, escaped)) = self.chars.next() {
					identifier.push(escaped);
				}
			} else if c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
				identifier.push(c);
				self.chars.next();
			} else {
				break;
			}
		}
		if identifier.is_empty() {
			None
		} else {
			Some(identifier)
		}
	}

	fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
		let source = self.source;
		let unterminated = move || SelectorError::UnterminatedAttribute(source.to_owned());
		self.skip_whitespace();
		let name = self.identifier().ok_or_else(unterminated)?;
		self.skip_whitespace();
		let operator = match self.chars.next().ok_or_else(unterminated)? {
			(_, ']') => return Ok(AttributeSelector { name, test: None }),
			(_, '=') => Operator::Equals,
			(offset, c @ ('~' | '^' | '$' | '*')) => {
				match self.chars.next() {
					Some((_, '=')) => (),
					Some((offset, found)) => return Err(self.unexpected(offset, found)),
					None => return Err(self.unexpected(offset, c)),
				}
				match c {
					'~' => Operator::Includes,
					'^' => Operator::Prefix,
					'$' => Operator::Suffix,
					_ => Operator::Substring,
				}
			}
			(offset, found) => return Err(self.unexpected(offset, found)),
		};
		self.skip_whitespace();
		let value = match self.peek() {
			Some(quote @ ('"' | '\'')) => {
				self.chars.next();
				let mut value = String::new();
				loop {
					match self.chars.next() {
						None => return Err(unterminated()),
						Some((_, '\\')) => {
							if let Some((_, escaped)) = self.chars.next() {
								value.push(escaped);
							}
						}
						Some((_, c)) if c == quote => break value,
						Some((_, c)) => value.push(c),
					}
				}
			}
			_ => self.identifier().ok_or_else(unterminated)?,
		};
		self.skip_whitespace();
		match self.chars.next() {
			Some((_, ']')) => Ok(AttributeSelector {
				name,
				test: Some((operator, value)),
			}),
			Some((offset, found)) => Err(self.unexpected(offset, found)),
			None => Err(unterminated()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::Document;

	#[test]
	fn parses_and_matches() {
		let document = Document::new();
		let list = document.create_element("ul");
		let item = document.create_element("li");
		item.set_attribute("class", "item active");
		item.set_attribute(":scope", "x-list");
		list.append_child(&item).unwrap();

		assert!(SelectorList::parse("li").unwrap().matches(&item));
		assert!(SelectorList::parse("ul > li.item").unwrap().matches(&item));
		assert!(SelectorList::parse("ul .active").unwrap().matches(&item));
		assert!(SelectorList::parse("p, li[class~=active]").unwrap().matches(&item));
		assert!(SelectorList::parse(r"[\:scope='x-list']").unwrap().matches(&item));
		assert!(!SelectorList::parse("ol > li").unwrap().matches(&item));
		assert!(!SelectorList::parse("#missing").unwrap().matches(&item));
	}

	#[test]
	fn rejects_garbage() {
		assert_eq!(SelectorList::parse(""), Err(SelectorError::Empty));
		assert!(matches!(SelectorList::parse("li:hover"), Err(SelectorError::Unexpected { found: ':', .. })));
		assert!(matches!(SelectorList::parse("[open"), Err(SelectorError::UnterminatedAttribute(_))));
	}
}
