mod logging_;

use custom_elements_dom::{
	error::PropertyError, h, Callback, Component, ComponentClass, DefineOptions, Host, Observer, PropType, Property, Props, Runtime, Template,
	Value,
};
use std::{cell::RefCell, rc::Rc};

type Log = Rc<RefCell<Vec<String>>>;

struct Person {
	log: Log,
}
impl Component for Person {
	fn render(&self, host: &Host) -> Template {
		h("span", Props::new(), vec![host.get("age").into()])
	}

	fn attribute_changed(&self, _: &Host, name: &str, old_value: Option<&str>, new_value: Option<&str>) {
		self.log.borrow_mut().push(format!("{} {:?} {:?}", name, old_value, new_value));
	}
}

fn person(log: &Log) -> ComponentClass {
	let log = log.clone();
	ComponentClass::builder("Person", move || Person { log: log.clone() })
		.property(Property::new("age").ty(PropType::Number).attribute())
		.build()
}

struct Plain;
impl Component for Plain {}

#[test]
fn age_scenario() {
	logging_::init();
	let runtime = Runtime::new();
	let log = Log::default();
	let class = person(&log);
	runtime.define("x-person", &class, DefineOptions::default()).unwrap();

	let body = runtime.document().body().unwrap();
	let wrapper = runtime.document().create_element("div");
	runtime.append_child(&body, &wrapper).unwrap();
	runtime.render(&wrapper, h(&class, Props::new(), vec![]));
	let element = wrapper.first_child().unwrap();
	assert_eq!(element.inner_html(), "<span></span>");

	runtime.set_attribute(&element, "age", "42").unwrap();
	assert_eq!(runtime.host(&element).unwrap().get("age"), Value::from(42));
	assert_eq!(*log.borrow(), ["age None Some(\"42\")"]);
	assert_eq!(element.inner_html(), "<span>42</span>");
}

#[test]
fn attribute_round_trip() {
	logging_::init();
	let runtime = Runtime::new();
	let class = person(&Log::default());
	runtime.define("x-person", &class, DefineOptions::default()).unwrap();
	let element = runtime.create_element("x-person");
	let host = runtime.host(&element).unwrap();

	host.set("age", 7).unwrap();
	assert_eq!(element.get_attribute("age").as_deref(), Some("7"));
	assert_eq!(element.inner_html(), "<span>7</span>");

	runtime.set_attribute(&element, "age", "12.5").unwrap();
	assert_eq!(host.get("age"), Value::from(12.5));

	runtime.remove_attribute(&element, "age").unwrap();
	assert_eq!(host.get("age"), Value::Null);
	assert!(!element.has_attribute("age"));

	assert!(matches!(runtime.set_attribute(&element, "age", "abc"), Err(PropertyError::Type { .. })));
	assert!(matches!(runtime.set_attribute(&element, "age", "inf"), Err(PropertyError::Type { .. })));
	assert_eq!(host.get("age"), Value::Null);
	assert!(matches!(host.set("age", "7"), Err(PropertyError::Type { .. })));
	assert_eq!(host.set("nope", 1), Err(PropertyError::Undeclared("nope".to_owned())));
}

#[test]
fn boolean_attribute_convention() {
	logging_::init();
	let runtime = Runtime::new();
	let class = ComponentClass::builder("Toggle", || Plain)
		.property(Property::new("open").ty(PropType::Boolean).attribute().default(false))
		.build();
	runtime.define("x-toggle", &class, DefineOptions::default()).unwrap();
	let element = runtime.create_element("x-toggle");
	let host = runtime.host(&element).unwrap();
	assert!(!element.has_attribute("open"));

	host.set("open", true).unwrap();
	assert_eq!(element.get_attribute("open").as_deref(), Some(""));
	host.set("open", false).unwrap();
	assert!(!element.has_attribute("open"));

	runtime.set_attribute(&element, "open", "open").unwrap();
	assert_eq!(host.get("open"), Value::Bool(true));
	runtime.remove_attribute(&element, "open").unwrap();
	assert_eq!(host.get("open"), Value::Bool(false));
	runtime.set_attribute(&element, "open", "").unwrap();
	assert_eq!(host.get("open"), Value::Bool(true));
}

#[test]
fn observers_fire_once_per_change() {
	logging_::init();
	let runtime = Runtime::new();
	let class = person(&Log::default());
	runtime.define("x-person", &class, DefineOptions::default()).unwrap();
	let host = runtime.host(&runtime.create_element("x-person")).unwrap();

	let calls = Rc::new(RefCell::new(vec![]));
	let observer = {
		let calls = calls.clone();
		Observer::new(move |_, old_value, new_value| calls.borrow_mut().push((old_value.clone(), new_value.clone())))
	};
	host.observe("age", observer.clone()).unwrap();
	host.set("age", 1).unwrap();
	host.set("age", 1).unwrap();
	host.set("age", 2).unwrap();
	host.unobserve("age", &observer).unwrap();
	host.set("age", 3).unwrap();

	assert_eq!(*calls.borrow(), [(Value::Null, Value::from(1)), (Value::from(1), Value::from(2))]);
	assert_eq!(host.observe("nope", observer), Err(PropertyError::Undeclared("nope".to_owned())));
}

#[test]
fn declared_observers_callbacks_and_change_events() {
	logging_::init();
	let runtime = Runtime::new();
	let log = Log::default();

	struct Recorder(Log);
	impl Component for Recorder {
		fn property_changed(&self, _: &Host, name: &str, old_value: &Value, new_value: &Value) {
			self.0.borrow_mut().push(format!("changed {} {:?} -> {:?}", name, old_value, new_value));
		}
	}

	let class = {
		let (factory_log, observer_log) = (log.clone(), log.clone());
		ComponentClass::builder("Field", move || Recorder(factory_log.clone()))
			.property(
				Property::new("value")
					.ty(PropType::String)
					.event()
					.observe(move |_, old_value, new_value| observer_log.borrow_mut().push(format!("observed {:?} -> {:?}", old_value, new_value))),
			)
			.build()
	};
	runtime.define("x-field", &class, DefineOptions::default()).unwrap();

	let body = runtime.document().body().unwrap();
	let element = runtime.create_element("x-field");
	runtime.append_child(&body, &element).unwrap();
	{
		let log = log.clone();
		body.add_event_listener(
			"valuechange",
			Callback::new(move |event| {
				let detail = event.detail().as_object().unwrap();
				log.borrow_mut().push(format!("event {:?} -> {:?}", detail["oldValue"], detail["newValue"]));
			}),
		);
	}

	runtime.host(&element).unwrap().set("value", "hi").unwrap();
	assert_eq!(
		*log.borrow(),
		[
			"observed null -> \"hi\"",
			"changed value null -> \"hi\"",
			"event null -> \"hi\"",
		]
	);
}

#[test]
fn setters_getters_and_validators() {
	logging_::init();
	let runtime = Runtime::new();
	let class = ComponentClass::builder("Meter", || Plain)
		.property(
			Property::new("level")
				.ty(PropType::Number)
				.default(0)
				.setter(|value| match value.as_f64() {
					Some(n) => Value::from(n.max(0.0)),
					None => value,
				})
				.validate(|value| value.as_f64().map_or(false, |n| n <= 10.0)),
		)
		.property(Property::new("label").getter(|stored| Value::from(format!("<{}>", stored.as_str().unwrap_or("")))))
		.build();
	runtime.define("x-meter", &class, DefineOptions::default()).unwrap();
	let host = runtime.host(&runtime.create_element("x-meter")).unwrap();

	assert_eq!(host.get("level"), Value::from(0));
	host.set("level", -5).unwrap();
	assert_eq!(host.get("level"), Value::from(0));
	host.set("level", 4).unwrap();
	assert_eq!(host.set("level", 11), Err(PropertyError::Validation { property: "level".to_owned() }));
	assert_eq!(host.get("level"), Value::from(4));

	host.set("label", "a").unwrap();
	assert_eq!(host.get("label"), Value::from("<a>"));
}

#[test]
fn defaults_reflect_unless_an_attribute_exists() {
	logging_::init();
	let runtime = Runtime::new();
	let class = ComponentClass::builder("Sized", || Plain)
		.property(Property::new("size").ty(PropType::Number).attribute().default(3))
		.build();
	runtime.define("x-sized", &class, DefineOptions::default()).unwrap();

	let fresh = runtime.create_element("x-sized");
	assert_eq!(fresh.get_attribute("size").as_deref(), Some("3"));

	let body = runtime.document().body().unwrap();
	let markup = runtime.document().create_element("x-sized");
	markup.set_attribute("size", "8");
	runtime.append_child(&body, &markup).unwrap();
	runtime.upgrade(&body);
	assert_eq!(markup.get_attribute("size").as_deref(), Some("8"));
	assert_eq!(runtime.host(&markup).unwrap().get("size"), Value::from(8));
}

#[test]
fn inheritance_overrides_by_name() {
	let base = ComponentClass::builder("Base", || Plain)
		.property(Property::new("size").ty(PropType::Number).default(1))
		.property(Property::new("tone").default("plain"))
		.build();
	let derived = ComponentClass::builder("Derived", || Plain)
		.inherit(&base)
		.property(Property::new("tone").default("loud"))
		.observed_attribute("data-x")
		.build();

	assert_eq!(derived.property("size").map(Property::default_value), Some(&Value::from(1)));
	assert_eq!(derived.property("tone").map(Property::default_value), Some(&Value::from("loud")));
	assert_eq!(base.property("tone").map(Property::default_value), Some(&Value::from("plain")));
	assert!(derived.observed_attributes().iter().any(|attribute| &**attribute == "data-x"));
}

#[test]
fn template_props_assign_declared_properties() {
	logging_::init();
	let runtime = Runtime::new();
	let class = person(&Log::default());
	runtime.define("x-person", &class, DefineOptions::default()).unwrap();
	let body = runtime.document().body().unwrap();

	runtime.render(&body, h(&class, Props::new().with("age", 5).with("title", "t"), vec![]));
	let element = body.first_child().unwrap();
	assert_eq!(element.get_attribute("age").as_deref(), Some("5"));
	assert_eq!(element.get_attribute("title").as_deref(), Some("t"));
	assert_eq!(element.inner_html(), "<span>5</span>");

	// Rejected values are logged and leave the property alone.
	runtime.render(&body, h(&class, Props::new().with("age", "old"), vec![]));
	assert_eq!(body.first_child().unwrap(), element);
	assert_eq!(runtime.host(&element).unwrap().get("age"), Value::from(5));
	assert!(!element.has_attribute("title"));
}
