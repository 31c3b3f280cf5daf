mod logging_;

use custom_elements_dom::{
	error::{DelegationError, SelectorError},
	h, Callback, Component, ComponentClass, DefineOptions, Event, EventInit, Node, Props, Runtime, Template,
};
use std::{cell::RefCell, rc::Rc};

type Log = Rc<RefCell<Vec<&'static str>>>;

/// `<div id="root"><ul class="list"><li class="item"><span>…</span></li></ul></div>`, returning the root and the span.
fn tree(runtime: &Runtime) -> (Node, Node) {
	let body = runtime.document().body().unwrap();
	runtime.render(
		&body,
		h(
			"div",
			Props::new().with("id", "root"),
			vec![h(
				"ul",
				Props::new().with("class", "list"),
				vec![h("li", Props::new().with("class", "item"), vec![h("span", Props::new(), vec!["click me".into()])])],
			)],
		),
	);
	let root = body.first_child().unwrap();
	let span = root.query_selector_all("span").unwrap().remove(0);
	(root, span)
}

fn click() -> Event {
	Event::new(
		"click",
		EventInit {
			bubbles: true,
			cancelable: true,
			..EventInit::default()
		},
	)
}

fn recorder(log: &Log, entry: &'static str) -> Callback {
	let log = log.clone();
	Callback::new(move |_| log.borrow_mut().push(entry))
}

#[test]
fn closest_matches_fire_inner_to_outer() {
	logging_::init();
	let runtime = Runtime::new();
	let (root, span) = tree(&runtime);
	let log = Log::default();

	runtime.delegate_event_listener(&root, "click", None, recorder(&log, "root")).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("ul"), recorder(&log, "ul")).unwrap();
	runtime.delegate_event_listener(&root, "click", Some(".item"), recorder(&log, "li")).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("div"), recorder(&log, "div")).unwrap();

	span.dispatch_event(&click());
	// The root itself is never a match candidate.
	assert_eq!(*log.borrow(), ["li", "ul", "root"]);
}

#[test]
fn stop_propagation_spares_same_node_handlers() {
	logging_::init();
	let runtime = Runtime::new();
	let (root, span) = tree(&runtime);
	let log = Log::default();

	let stopper = {
		let log = log.clone();
		Callback::new(move |event: &Event| {
			log.borrow_mut().push("stop");
			event.stop_propagation();
		})
	};
	runtime.delegate_event_listener(&root, "click", Some("li"), stopper).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("li"), recorder(&log, "li")).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("ul"), recorder(&log, "ul")).unwrap();
	runtime.delegate_event_listener(&root, "click", None, recorder(&log, "root")).unwrap();

	span.dispatch_event(&click());
	assert_eq!(*log.borrow(), ["stop", "li"]);
}

#[test]
fn stop_immediate_propagation_halts_everything() {
	logging_::init();
	let runtime = Runtime::new();
	let (root, span) = tree(&runtime);
	let log = Log::default();

	let stopper = {
		let log = log.clone();
		Callback::new(move |event: &Event| {
			log.borrow_mut().push("stop");
			event.stop_immediate_propagation();
		})
	};
	runtime.delegate_event_listener(&root, "click", Some("li"), stopper).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("li"), recorder(&log, "li")).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("ul"), recorder(&log, "ul")).unwrap();

	span.dispatch_event(&click());
	assert_eq!(*log.borrow(), ["stop"]);
}

#[test]
fn duplicates_are_ignored_and_removal_is_exact() {
	logging_::init();
	let runtime = Runtime::new();
	let (root, span) = tree(&runtime);
	let log = Log::default();
	let li = recorder(&log, "li");
	let ul = recorder(&log, "ul");

	runtime.delegate_event_listener(&root, "click", Some("li"), li.clone()).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("li"), li.clone()).unwrap();
	runtime.delegate_event_listener(&root, "click", Some("ul"), ul.clone()).unwrap();
	span.dispatch_event(&click());
	assert_eq!(*log.borrow(), ["li", "ul"]);

	// Same callback, different selector: nothing to remove.
	runtime.undelegate_event_listener(&root, "click", Some("ul"), &li).unwrap();
	runtime.undelegate_event_listener(&root, "click", Some("li"), &li).unwrap();
	log.borrow_mut().clear();
	span.dispatch_event(&click());
	assert_eq!(*log.borrow(), ["ul"]);

	runtime.undelegate_all_event_listeners(&root).unwrap();
	log.borrow_mut().clear();
	span.dispatch_event(&click());
	assert!(log.borrow().is_empty());
}

#[test]
fn other_events_are_not_delegated() {
	logging_::init();
	let runtime = Runtime::new();
	let (root, span) = tree(&runtime);
	let log = Log::default();

	runtime.delegate_event_listener(&root, "input", Some("li"), recorder(&log, "input")).unwrap();
	span.dispatch_event(&click());
	assert!(log.borrow().is_empty());
	span.dispatch_event(&Event::new(
		"input",
		EventInit {
			bubbles: true,
			..EventInit::default()
		},
	));
	assert_eq!(*log.borrow(), ["input"]);
}

#[test]
fn invalid_input_is_rejected_up_front() {
	logging_::init();
	let runtime = Runtime::new();
	let (root, span) = tree(&runtime);
	let text = span.first_child().unwrap();
	let callback = Callback::new(|_| ());

	assert_eq!(
		runtime.delegate_event_listener(&text, "click", None, callback.clone()),
		Err(DelegationError::InvalidRoot)
	);
	assert_eq!(
		runtime.delegate_event_listener(&root, "", None, callback.clone()),
		Err(DelegationError::EmptyEventName)
	);
	assert!(matches!(
		runtime.delegate_event_listener(&root, "click", Some("li["), callback.clone()),
		Err(DelegationError::InvalidSelector(SelectorError::UnterminatedAttribute(_)))
	));
	assert_eq!(runtime.undelegate_all_event_listeners(&text), Err(DelegationError::InvalidRoot));
}

#[test]
fn class_listeners_receive_the_host() {
	logging_::init();
	let runtime = Runtime::new();
	let log = Log::default();

	struct Button;
	impl Component for Button {
		fn render(&self, _: &custom_elements_dom::Host) -> Template {
			h("button", Props::new(), vec!["press".into()])
		}
	}

	let class = {
		let log = log.clone();
		ComponentClass::builder("Button", || Button)
			.listener("click", Some("button"), move |host, _| {
				assert!(host.element().is_some());
				log.borrow_mut().push("pressed");
			})
			.build()
	};
	runtime.define("x-button", &class, DefineOptions::default()).unwrap();
	let body = runtime.document().body().unwrap();
	runtime.render(&body, h(&class, Props::new(), vec![]));

	let button = body.query_selector_all("x-button button").unwrap().remove(0);
	button.dispatch_event(&click());
	body.first_child().unwrap().dispatch_event(&click());
	assert_eq!(*log.borrow(), ["pressed"]);
}
