//! Host-value builders and doubles shared by the engine tests.
//!
//! These play the role of the host scripting layer: they assemble the
//! tagged component, html, and attr values the interpreter consumes, using
//! the same constructor numbering.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::error::Result;
use crate::host::HostValue;
use crate::identity::{HandlerId, InstanceId, Route};
use crate::task::{install_task_queue, TaskQueue};

// === Component descriptions ===

pub(crate) fn pure(view: HostValue) -> HostValue {
    HostValue::data(0, vec![view])
}

pub(crate) fn filter_map_action(map: HostValue, inner: HostValue) -> HostValue {
    HostValue::data(1, vec![map, inner])
}

pub(crate) fn map_props(map: HostValue, inner: HostValue) -> HostValue {
    HostValue::data(2, vec![map, inner])
}

pub(crate) fn with_should_update(predicate: HostValue, inner: HostValue) -> HostValue {
    HostValue::data(3, vec![predicate, inner])
}

pub(crate) fn with_state(init: HostValue, update: HostValue, inner: HostValue) -> HostValue {
    HostValue::data(4, vec![init, update, inner])
}

pub(crate) fn with_task(builder: HostValue, inner: HostValue) -> HostValue {
    HostValue::data(5, vec![builder, inner])
}

pub(crate) fn with_mouse_capture(inner: HostValue) -> HostValue {
    HostValue::data(6, vec![inner])
}

/// A view closure over the inner props, returning an html list.
pub(crate) fn view(f: impl Fn(&HostValue) -> Result<HostValue> + 'static) -> HostValue {
    HostValue::closure(move |args| f(&args[0]))
}

// === html and attrs ===

pub(crate) fn element(tag: &str, attrs: Vec<HostValue>, children: Vec<HostValue>) -> HostValue {
    HostValue::data(
        0,
        vec![
            HostValue::string(tag),
            HostValue::list(attrs),
            HostValue::list(children),
        ],
    )
}

pub(crate) fn text(s: impl Into<String>) -> HostValue {
    HostValue::data(1, vec![HostValue::string(s)])
}

pub(crate) fn of_component(props: HostValue, component: HostValue) -> HostValue {
    HostValue::data(2, vec![props, component])
}

pub(crate) fn attr_val(key: &str, value: &str) -> HostValue {
    HostValue::data(0, vec![HostValue::string(key), HostValue::string(value)])
}

pub(crate) fn attr_key(key: &str) -> HostValue {
    attr_val("key", key)
}

pub(crate) fn on_click(handler: HostValue) -> HostValue {
    HostValue::data(1, vec![HostValue::data(0, Vec::new()), handler])
}

pub(crate) fn on_mouse_enter(handler: HostValue) -> HostValue {
    HostValue::data(1, vec![HostValue::data(1, Vec::new()), handler])
}

pub(crate) fn attr_style(pairs: &[(&str, &str)]) -> HostValue {
    let pairs = pairs
        .iter()
        .map(|(k, v)| HostValue::pair(HostValue::string(*k), HostValue::string(*v)));
    HostValue::data(2, vec![HostValue::list(pairs)])
}

pub(crate) fn attr_tooltip(html: HostValue) -> HostValue {
    HostValue::data(3, vec![html])
}

pub(crate) fn attr_text_change(handler: HostValue) -> HostValue {
    HostValue::data(4, vec![handler])
}

/// An event handler whose action is unit.
pub(crate) fn unit_handler() -> HostValue {
    HostValue::closure(|_| Ok(HostValue::unit()))
}

// === Ready-made components ===

/// A stateful counter: state starts at zero (or the carried-over prior),
/// every action increments it, and the view is a single button whose label
/// is the count.
pub(crate) fn counter_component() -> HostValue {
    let init = HostValue::closure(|args| {
        let prior = args[1].as_option()?;
        Ok(prior.unwrap_or_else(|| HostValue::nat(0)))
    });
    let update = HostValue::closure(|args| {
        let count = args[1].as_nat()?;
        Ok(HostValue::pair(
            HostValue::nat(count + 1),
            HostValue::none(),
        ))
    });
    let button = view(|inner| {
        let count = inner.field(0)?.as_nat()?;
        Ok(HostValue::list([element(
            "button",
            vec![on_click(unit_handler())],
            vec![text(count.to_string())],
        )]))
    });
    with_state(init, update, pure(button))
}

// === Wire-format helpers ===

/// Decode a route array from emitted JSON.
pub(crate) fn route_from_json(value: &Value) -> Route {
    value
        .as_array()
        .expect("route is an array")
        .iter()
        .map(|v| InstanceId(v.as_u64().expect("route entry is a number") as u32))
        .collect()
}

/// Collect every `(route, handler)` pair registered in emitted JSON.
pub(crate) fn collect_events(value: &Value, out: &mut Vec<(Route, HandlerId)>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::Object(events)) = obj.get("e") {
                for entry in events.values() {
                    let route = route_from_json(&entry["r"]);
                    let handler = HandlerId(entry["h"].as_u64().expect("handler id") as u32);
                    out.push((route, handler));
                }
            }
            for key in ["c", "tt"] {
                if let Some(child) = obj.get(key) {
                    collect_events(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_events(item, out);
            }
        }
        _ => {}
    }
}

/// Collect every component instance id in emitted JSON, in encounter order.
pub(crate) fn collect_instance_ids(value: &Value, out: &mut Vec<u32>) {
    match value {
        Value::Object(obj) => {
            if let Some(id) = obj.get("id").and_then(Value::as_u64) {
                out.push(id as u32);
            }
            for key in ["c", "tt"] {
                if let Some(child) = obj.get(key) {
                    collect_instance_ids(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_instance_ids(item, out);
            }
        }
        _ => {}
    }
}

// === Task queue double ===

/// Recording task queue: remembers submissions with their routes, serves
/// results the test marks complete, and records disposals.
#[derive(Default)]
pub(crate) struct TestQueue {
    pub submitted: RefCell<Vec<(HostValue, Route)>>,
    pub completed: RefCell<Vec<(HostValue, HostValue)>>,
    pub disposed: RefCell<Vec<HostValue>>,
}

impl TestQueue {
    /// Install a fresh queue on this test thread.
    pub(crate) fn install() -> Rc<TestQueue> {
        let queue = Rc::new(TestQueue::default());
        install_task_queue(queue.clone()).expect("queue installed once per test thread");
        queue
    }

    /// Mark the `index`th submitted task complete with `result` and return
    /// the route it was registered under.
    pub(crate) fn complete(&self, index: usize, result: HostValue) -> Route {
        let (task, route) = self.submitted.borrow()[index].clone();
        self.completed.borrow_mut().push((task, result));
        route
    }
}

impl TaskQueue for TestQueue {
    fn submit(&self, task: &HostValue, route: &Route) {
        self.submitted.borrow_mut().push((task.clone(), route.clone()));
    }

    fn peek(&self, task: &HostValue) -> Option<HostValue> {
        self.completed
            .borrow()
            .iter()
            .find(|(t, _)| t.host_eq(task))
            .map(|(_, result)| result.clone())
    }

    fn fail_and_dispose(&self, task: &HostValue) {
        self.disposed.borrow_mut().push(task.clone());
    }
}
