//! Stylesheet scoping.
//!
//! Every selector is constrained to the component's subtree with a `[\:scope='<tag>']` attribute selector.
//! `:host` and `:host(<compound>)` address the host element itself.

/// Scopes `css` to elements with a `:scope` attribute equal to `tag` and their descendants.
///
/// Comments are stripped. `@media` and `@supports` blocks are scoped recursively, other at-rules are copied as-is.
///
/// ```
/// use custom_elements_dom::css;
///
/// assert_eq!(
/// 	css("x-card", ":host { display: block; } h1, .title { margin: 0; }"),
/// 	"[\\:scope='x-card'] {display: block;}\n[\\:scope='x-card'] h1, [\\:scope='x-card'] .title {margin: 0;}",
/// );
/// ```
#[must_use]
pub fn css(tag: &str, css: &str) -> String {
	let scope = format!("[\\:scope='{}']", tag);
	let mut rules = vec![];
	scope_rules(&strip_comments(css), &scope, &mut rules);
	rules.join("\n")
}

fn strip_comments(css: &str) -> String {
	let mut stripped = String::with_capacity(css.len());
	let mut rest = css;
	while let Some(start) = rest.find("/*") {
		stripped.push_str(&rest[..start]);
		rest = match rest[start + 2..].find("*/") {
			Some(end) => &rest[start + 2 + end + 2..],
			None => "",
		};
	}
	stripped.push_str(rest);
	stripped
}

fn scope_rules(mut css: &str, scope: &str, rules: &mut Vec<String>) {
	loop {
		css = css.trim_start();
		if css.is_empty() {
			break;
		}

		let open = css.find('{');
		if css.starts_with('@') {
			if let Some(semicolon) = css.find(';').filter(|&semicolon| open.map_or(true, |open| semicolon < open)) {
				rules.push(css[..=semicolon].trim().to_owned());
				css = &css[semicolon + 1..];
				continue;
			}
		}

		let open = match open {
			Some(open) => open,
			None => {
				tracing::warn!("Ignoring trailing CSS without a block: {:?}", css);
				break;
			}
		};
		let close = matching(css, open, '{', '}');
		let prelude = css[..open].trim();
		let body = &css[open + 1..close];
		css = css.get(close + 1..).unwrap_or_default();

		if prelude.starts_with("@media") || prelude.starts_with("@supports") {
			let mut nested = vec![];
			scope_rules(body, scope, &mut nested);
			rules.push(format!("{} {{\n{}\n}}", prelude, nested.join("\n")));
		} else if prelude.starts_with('@') {
			rules.push(format!("{} {{{}}}", prelude, body));
		} else {
			let selectors = split_top_level(prelude)
				.into_iter()
				.map(|selector| scope_selector(selector.trim(), scope))
				.collect::<Vec<_>>()
				.join(", ");
			rules.push(format!("{} {{{}}}", selectors, body.trim()));
		}
	}
}

/// The index of the delimiter closing the one at `open`, or the end of `text` if it's unbalanced.
fn matching(text: &str, open: usize, opening: char, closing: char) -> usize {
	let mut depth = 0_usize;
	for (i, c) in text[open..].char_indices() {
		if c == opening {
			depth += 1;
		} else if c == closing {
			depth -= 1;
			if depth == 0 {
				return open + i;
			}
		}
	}
	text.len()
}

/// Splits a selector list on commas outside of parentheses, brackets and quotes.
fn split_top_level(selectors: &str) -> Vec<&str> {
	let mut parts = vec![];
	let mut depth = 0_usize;
	let mut quote = None;
	let mut start = 0;
	for (i, c) in selectors.char_indices() {
		match (quote, c) {
			(Some(q), c) if c == q => quote = None,
			(Some(_), _) => (),
			(None, '"' | '\'') => quote = Some(c),
			(None, '(' | '[') => depth += 1,
			(None, ')' | ']') => depth = depth.saturating_sub(1),
			(None, ',') if depth == 0 => {
				parts.push(&selectors[start..i]);
				start = i + 1;
			}
			_ => (),
		}
	}
	parts.push(&selectors[start..]);
	parts
}

fn scope_selector(selector: &str, scope: &str) -> String {
	match selector.strip_prefix(":host") {
		Some(rest) if rest.starts_with('(') => {
			let close = matching(rest, 0, '(', ')');
			let inner = rest.get(1..close).unwrap_or_default();
			let after = rest.get(close + 1..).unwrap_or_default();
			format!("{}{}{}", scope, inner, after)
		}
		Some(rest) if !rest.starts_with(|c: char| c.is_alphanumeric() || c == '-') => format!("{}{}", scope, rest),
		_ => format!("{} {}", scope, selector),
	}
}
