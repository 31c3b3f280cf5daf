mod logging_;

use custom_elements_dom::{h, Fragment, FunctionComponent, Invocation, Observable, Props, Runtime, Template, Thenable, Updater, Value};
use futures::channel::{mpsc, oneshot};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

fn counter(invocation: Invocation<'_>) -> Template {
	let count = invocation.state.get_or_insert_with("count", || Value::from(0));
	let current = count.as_f64().unwrap_or_default();
	*count = Value::from(current + 1.0);
	h("b", Props::new(), vec![current.into()])
}

fn other(_: Invocation<'_>) -> Template {
	h("b", Props::new(), vec!["other".into()])
}

/// Shows the `label` it was first rendered with.
fn remember(invocation: Invocation<'_>) -> Template {
	let label = invocation.props.get("label").cloned().unwrap_or_default();
	invocation.state.get_or_insert_with("first", || label).clone().into()
}

#[test]
fn state_persists_per_position() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let template = || h(FunctionComponent::new(counter), Props::new(), vec![]);

	runtime.render(&body, template());
	assert_eq!(body.inner_html(), "<b>0</b>");
	runtime.render(&body, template());
	assert_eq!(body.inner_html(), "<b>1</b>");

	// A different function at the same position starts over.
	runtime.render(&body, h(FunctionComponent::new(other), Props::new(), vec![]));
	runtime.render(&body, template());
	assert_eq!(body.inner_html(), "<b>0</b>");
}

#[test]
fn keyed_state_follows_the_key() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let remembered = |entries: &[(&str, &str)], keyed: bool| -> Template {
		entries
			.iter()
			.map(|(key, label)| {
				let props = Props::new().with("label", *label);
				let props = if keyed { props.with("key", *key) } else { props };
				h(FunctionComponent::new(remember), props, vec![])
			})
			.collect::<Vec<_>>()
			.into()
	};

	runtime.render(&body, remembered(&[("a", "A"), ("b", "B")], true));
	assert_eq!(body.text_content(), "AB");
	runtime.render(&body, remembered(&[("b", "X"), ("a", "X")], true));
	assert_eq!(body.text_content(), "BA");

	runtime.render(&body, Template::Empty);
	runtime.render(&body, remembered(&[("a", "A"), ("b", "B")], false));
	runtime.render(&body, remembered(&[("b", "X"), ("a", "X")], false));
	assert_eq!(body.text_content(), "AB");
}

#[test]
fn updates_rerender_only_the_fragment() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let updater: Rc<RefCell<Option<Updater>>> = Rc::default();
	let ticks = Rc::new(Cell::new(0));
	let stale = Rc::new(Cell::new(false));

	let ticker = {
		let (updater, ticks, stale) = (updater.clone(), ticks.clone(), stale.clone());
		FunctionComponent::from_closure(move |invocation| {
			if updater.borrow().is_none() {
				let stale = stale.clone();
				invocation.updater.on_stale(move || stale.set(true));
			}
			*updater.borrow_mut() = Some(invocation.updater.clone());
			h("i", Props::new(), vec![ticks.get().into()])
		})
	};

	runtime.render(&body, h("div", Props::new(), vec![h(&ticker, Props::new(), vec![]), "tail".into()]));
	let tail = body.first_child().unwrap().child_at(1).unwrap();
	assert_eq!(body.inner_html(), "<div><i>0</i>tail</div>");

	ticks.set(5);
	let current = updater.borrow().clone().unwrap();
	assert!(current.is_live());
	assert!(current.request_update());
	assert_eq!(body.inner_html(), "<div><i>5</i>tail</div>");
	assert_eq!(body.first_child().unwrap().child_at(1).unwrap(), tail);

	runtime.render(&body, Template::Empty);
	assert!(stale.get());
	assert!(!current.is_live());
	assert!(!current.request_update());
	assert_eq!(body.inner_html(), "");
}

#[test]
fn empty_output_keeps_a_placeholder() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let show = Rc::new(Cell::new(false));
	let updater: Rc<RefCell<Option<Updater>>> = Rc::default();

	let toggle = {
		let (show, updater) = (show.clone(), updater.clone());
		FunctionComponent::from_closure(move |invocation| {
			*updater.borrow_mut() = Some(invocation.updater.clone());
			if show.get() {
				h("em", Props::new(), vec!["on".into()])
			} else {
				Template::Empty
			}
		})
	};
	let request = || {
		let current = updater.borrow().clone().unwrap();
		current.request_update()
	};

	runtime.render(&body, h("p", Props::new(), vec![h(&toggle, Props::new(), vec![]), "after".into()]));
	let p = body.first_child().unwrap();
	assert_eq!(p.inner_html(), "after");
	assert_eq!(p.child_count(), 2);

	show.set(true);
	assert!(request());
	assert_eq!(p.inner_html(), "<em>on</em>after");
	assert_eq!(p.child_count(), 2);

	show.set(false);
	assert!(request());
	assert_eq!(p.inner_html(), "after");
	assert_eq!(p.child_count(), 2);
}

#[test]
fn nested_fragment_ranges_stay_consistent() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let show_inner = Rc::new(Cell::new(false));
	let outer_ticks = Rc::new(Cell::new(0));
	let inner_updater: Rc<RefCell<Option<Updater>>> = Rc::default();
	let outer_updater: Rc<RefCell<Option<Updater>>> = Rc::default();

	let inner = {
		let (show, updater) = (show_inner.clone(), inner_updater.clone());
		FunctionComponent::from_closure(move |invocation| {
			*updater.borrow_mut() = Some(invocation.updater.clone());
			if show.get() {
				"x".into()
			} else {
				Template::Empty
			}
		})
	};
	let outer = {
		let (ticks, updater) = (outer_ticks.clone(), outer_updater.clone());
		FunctionComponent::from_closure(move |invocation| {
			*updater.borrow_mut() = Some(invocation.updater.clone());
			h(Fragment, Props::new(), vec![h(&inner, Props::new(), vec![]), ticks.get().into()])
		})
	};

	runtime.render(&body, h("div", Props::new(), vec![h(&outer, Props::new(), vec![]), "tail".into()]));
	let div = body.first_child().unwrap();
	assert_eq!(div.inner_html(), "0tail");

	show_inner.set(true);
	let inner_current = inner_updater.borrow().clone().unwrap();
	assert!(inner_current.request_update());
	assert_eq!(div.inner_html(), "x0tail");

	outer_ticks.set(1);
	let outer_current = outer_updater.borrow().clone().unwrap();
	assert!(outer_current.request_update());
	assert_eq!(div.inner_html(), "x1tail");
	assert_eq!(div.child_count(), 3);
}

#[test]
fn thenables_render_once_settled() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let (sender, receiver) = oneshot::channel::<&'static str>();
	let thenable = Thenable::new(receiver);

	runtime.render(&body, h("p", Props::new(), vec![thenable.clone().into(), "!".into()]));
	assert_eq!(body.inner_html(), "<p>!</p>");
	assert!(!thenable.is_settled());

	runtime.run_until_stalled();
	assert_eq!(body.inner_html(), "<p>!</p>");

	sender.send("done").unwrap();
	runtime.run_until_stalled();
	assert!(thenable.is_settled());
	assert_eq!(body.inner_html(), "<p>done!</p>");

	runtime.render(&body, h("p", Props::new(), vec![Thenable::resolved("now").into(), "!".into()]));
	assert_eq!(body.inner_html(), "<p>now!</p>");
}

#[test]
fn rejected_thenables_render_nothing() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let (sender, receiver) = oneshot::channel::<&'static str>();

	runtime.render(&body, h("p", Props::new(), vec![Thenable::new(receiver).into()]));
	drop(sender);
	runtime.run_until_stalled();
	assert_eq!(body.inner_html(), "<p></p>");
}

#[test]
fn stale_thenables_are_ignored() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let (sender, receiver) = oneshot::channel::<&'static str>();

	runtime.render(&body, h("p", Props::new(), vec![Thenable::new(receiver).into()]));
	runtime.render(&body, h("p", Props::new(), vec!["replaced".into()]));
	sender.send("late").unwrap();
	runtime.run_until_stalled();
	assert_eq!(body.inner_html(), "<p>replaced</p>");
}

#[test]
fn observables_rerender_per_item_until_dropped() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let (sender, receiver) = mpsc::unbounded::<String>();
	let observable = Observable::new(receiver);

	runtime.render(&body, h("p", Props::new(), vec![observable.clone().into()]));
	assert_eq!(body.inner_html(), "<p></p>");

	sender.unbounded_send("1".to_owned()).unwrap();
	runtime.run_until_stalled();
	assert_eq!(body.inner_html(), "<p>1</p>");

	sender.unbounded_send("2".to_owned()).unwrap();
	runtime.run_until_stalled();
	assert_eq!(body.inner_html(), "<p>2</p>");
	assert!(!observable.is_closed());

	runtime.render(&body, Template::Empty);
	assert!(observable.is_closed());
	runtime.run_until_stalled();
	assert_eq!(body.inner_html(), "");
}

#[test]
fn sibling_text_leaves_fragment_boundaries_alone() {
	logging_::init();
	let runtime = Runtime::new();
	let body = runtime.document().body().unwrap();
	let label = Rc::new(RefCell::new("a"));
	let updater: Rc<RefCell<Option<Updater>>> = Rc::default();

	let echo = {
		let (label, updater) = (label.clone(), updater.clone());
		FunctionComponent::from_closure(move |invocation| {
			*updater.borrow_mut() = Some(invocation.updater.clone());
			(*label.borrow()).into()
		})
	};

	runtime.render(&body, h("p", Props::new(), vec![h(&echo, Props::new(), vec![]), "t".into()]));
	let p = body.first_child().unwrap();
	let echoed = p.first_child().unwrap();
	assert_eq!(p.inner_html(), "at");

	runtime.render(&body, h("p", Props::new(), vec!["s".into(), h(&echo, Props::new(), vec![])]));
	assert_eq!(p.inner_html(), "sa");
	assert_eq!(p.child_at(1), Some(echoed.clone()));
	let leading = p.first_child().unwrap();

	*label.borrow_mut() = "b";
	let current = updater.borrow().clone().unwrap();
	assert!(current.request_update());
	assert_eq!(p.inner_html(), "sb");
	assert_eq!(p.first_child(), Some(leading));
	assert_eq!(p.child_at(1), Some(echoed));
}
