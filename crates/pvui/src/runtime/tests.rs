use std::rc::Rc;

use serde_json::{json, Value};

use crate::error::WidgetError;
use crate::fixture::{
    collect_events, counter_component, element, of_component, on_click, pure, text, unit_handler,
    view, with_mouse_capture, with_task, TestQueue,
};
use crate::host::HostValue;
use crate::identity::{HandlerId, Route};
use crate::runtime::WidgetRuntime;
use crate::task::install_task_queue;

fn events(json: &Value) -> Vec<(Route, HandlerId)> {
    let mut out = Vec::new();
    collect_events(json, &mut out);
    out
}

fn button_label(json: &Value) -> String {
    json["c"][0]["c"][0]
        .as_str()
        .expect("button label is a text node")
        .to_owned()
}

#[test]
fn a_counter_advances_once_per_event() {
    let mut rt = WidgetRuntime::new(&counter_component(), HostValue::unit()).expect("build");
    for _ in 0..3 {
        // Re-read the emitted JSON between events the way a client would;
        // each re-render registers fresh handler ids.
        let emitted = rt.to_json().expect("serialize");
        let (route, handler) = events(&emitted)[0].clone();
        rt.handle_event(&route, handler, &HostValue::unit())
            .expect("click");
    }
    let emitted = rt.to_json().expect("serialize");
    assert_eq!(button_label(&emitted), "3");
}

#[test]
fn every_emitted_event_routes_back_to_its_origin() {
    let leaf = pure(view(|_| {
        Ok(HostValue::list([element(
            "button",
            vec![on_click(unit_handler())],
            vec![],
        )]))
    }));
    let mid = {
        let leaf_props = HostValue::unit();
        pure(view(move |_| {
            Ok(HostValue::list([element(
                "section",
                vec![on_click(unit_handler())],
                vec![of_component(leaf_props.clone(), leaf.clone())],
            )]))
        }))
    };
    let root = {
        let mid_props = HostValue::unit();
        pure(view(move |_| {
            Ok(HostValue::list([element(
                "div",
                vec![on_click(unit_handler())],
                vec![of_component(mid_props.clone(), mid.clone())],
            )]))
        }))
    };

    let mut rt = WidgetRuntime::new(&root, HostValue::unit()).expect("build");
    let emitted = rt.to_json().expect("serialize");
    let pairs = events(&emitted);
    assert_eq!(pairs.len(), 3, "one event per depth");

    // The root's own handler is a live key of its handler table.
    let root_pair = pairs
        .iter()
        .find(|(route, _)| route.len() == 1)
        .expect("root-level event")
        .clone();
    assert!(rt.root().borrow().handlers().contains_key(&root_pair.1));

    for (route, handler) in pairs {
        rt.handle_event(&route, handler, &HostValue::unit())
            .expect("emitted route reaches its origin");
    }
}

#[test]
fn unknown_handler_ids_fail_even_at_valid_routes() {
    let mut rt = WidgetRuntime::new(&counter_component(), HostValue::unit()).expect("build");
    let emitted = rt.to_json().expect("serialize");
    let (route, _) = events(&emitted)[0].clone();

    let err = rt
        .handle_event(&route, HandlerId(u32::MAX), &HostValue::unit())
        .expect_err("unknown handler id");
    assert!(matches!(err, WidgetError::InvalidHandler { .. }));
}

#[test]
fn task_components_render_pending_until_completion_is_delivered() {
    let queue = TestQueue::install();
    let comp = with_task(
        HostValue::closure(|_| Ok(HostValue::string("defer-goal"))),
        pure(view(|inner| {
            let label = match inner.field(0)?.as_option()? {
                Some(result) => result.as_str()?.to_owned(),
                None => "loading".to_owned(),
            };
            Ok(HostValue::list([text(label)]))
        })),
    );

    let mut rt = WidgetRuntime::new(&comp, HostValue::unit()).expect("build");
    let emitted = rt.to_json().expect("serialize");
    assert_eq!(emitted["c"][0], json!("loading"));

    let submitted_route = queue.submitted.borrow()[0].1.clone();
    assert_eq!(submitted_route.as_slice(), &[rt.root_id()][..]);

    let route = queue.complete(0, HostValue::string("proved"));
    rt.task_completed(&route);
    let emitted = rt.to_json().expect("serialize");
    assert_eq!(emitted["c"][0], json!("proved"));
}

#[test]
fn task_completions_for_dangling_routes_are_swallowed() {
    let queue = TestQueue::install();
    let comp = with_task(
        HostValue::closure(|_| Ok(HostValue::string("orphan"))),
        pure(view(|_| Ok(HostValue::list([text("waiting")])))),
    );

    let mut rt = WidgetRuntime::new(&comp, HostValue::unit()).expect("build");
    rt.to_json().expect("serialize");
    let mut bogus = queue.submitted.borrow()[0].1.clone();
    bogus.push(crate::identity::InstanceId(u32::MAX));

    // Neither an unknown child nor a retired root id may panic or error.
    rt.task_completed(&bogus);
    let unknown_root: Route = [crate::identity::InstanceId(u32::MAX)].into_iter().collect();
    rt.task_completed(&unknown_root);
}

#[test]
fn spawning_a_task_with_no_queue_installed_is_fatal() {
    let comp = with_task(
        HostValue::closure(|_| Ok(HostValue::string("never-runs"))),
        pure(view(|_| Ok(HostValue::list([text("waiting")])))),
    );
    let mut rt = WidgetRuntime::new(&comp, HostValue::unit()).expect("build");
    let err = rt.to_json().expect_err("no queue installed on this thread");
    assert!(matches!(err, WidgetError::TaskQueueNotSet(_)));
}

#[test]
fn the_task_queue_installs_at_most_once_per_thread() {
    let _queue = TestQueue::install();
    let err = install_task_queue(Rc::new(TestQueue::default())).expect_err("second install");
    assert!(matches!(err, WidgetError::TaskQueueNotSet(_)));
}

#[test]
fn mouse_capture_transitions_reach_the_view_and_revert() {
    let comp = with_mouse_capture(pure(view(|inner| {
        let capture = inner.field(0)?.variant_tag()?;
        Ok(HostValue::list([text(capture.to_string())]))
    })));

    let mut rt = WidgetRuntime::new(&comp, HostValue::unit()).expect("build");
    let emitted = rt.to_json().expect("serialize");
    assert_eq!(emitted["c"][0], json!("0"), "starts outside");
    let capture_route = emitted["mouse_capture"]["r"].clone();
    assert_eq!(capture_route, json!([rt.root_id().0]));

    let route: Route = [rt.root_id()].into_iter().collect();
    rt.mouse_capture(&route);
    let emitted = rt.to_json().expect("serialize");
    assert_eq!(emitted["c"][0], json!("1"), "inside immediate");

    rt.mouse_release(&route);
    let emitted = rt.to_json().expect("serialize");
    assert_eq!(emitted["c"][0], json!("0"), "back outside");
}

#[test]
fn replacing_the_root_component_retires_its_routes() {
    let mut rt = WidgetRuntime::new(&counter_component(), HostValue::unit()).expect("build");
    let emitted = rt.to_json().expect("serialize");
    let (route, handler) = events(&emitted)[0].clone();

    let other = pure(view(|_| Ok(HostValue::list([text("replaced")]))));
    rt.update(&other, HostValue::unit()).expect("replace");

    let err = rt
        .handle_event(&route, handler, &HostValue::unit())
        .expect_err("retired root id");
    assert!(matches!(err, WidgetError::InvalidHandler { .. }));
    assert_eq!(rt.to_json().expect("serialize")["c"][0], json!("replaced"));
}
