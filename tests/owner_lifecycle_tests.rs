use std::cell::RefCell;
use std::rc::Rc;

use chart_host::api::{ApplyOutcome, AutoresizeConfig, ChartOwner, ChartOwnerConfig};
use chart_host::core::{
    ChartContainer, ChartOption, DataUrlOptions, InitOptions, LoadingOptions, ResizeOptions,
    SetOptionOptions, Size, Theme,
};
use chart_host::render::{EngineCall, MemoryEngine, RenderInstance};
use chart_host::runtime::{ResizeHub, VirtualScheduler};
use chart_host::ChartError;
use serde_json::json;

struct Harness {
    engine: Rc<MemoryEngine>,
    scheduler: Rc<VirtualScheduler>,
    owner: ChartOwner,
}

fn harness() -> Harness {
    let engine = MemoryEngine::new();
    let scheduler = VirtualScheduler::new();
    let config = ChartOwnerConfig::new().with_autoresize(AutoresizeConfig::disabled());
    let owner = ChartOwner::new(engine.clone(), scheduler.clone(), ResizeHub::new(true), config)
        .expect("owner init");
    Harness {
        engine,
        scheduler,
        owner,
    }
}

fn option(value: serde_json::Value) -> ChartOption {
    ChartOption::from_value(value).expect("object option")
}

fn container() -> ChartContainer {
    ChartContainer::new(Size::new(800, 400))
}

#[test]
fn create_without_container_is_a_deferred_no_op() {
    let h = harness();
    h.owner
        .create(None, Some(Theme::named("light")), InitOptions::default())
        .expect("deferred create");
    assert!(!h.owner.is_live());
    assert_eq!(h.engine.call_count(), 0);
    assert_eq!(h.owner.theme(), Some(Theme::named("light")));
}

#[test]
fn create_disposes_previous_instance_and_runs_dispose_hook() {
    let h = harness();
    let disposed = Rc::new(RefCell::new(Vec::new()));
    {
        let disposed = Rc::clone(&disposed);
        h.owner.set_on_dispose(move |instance: &dyn RenderInstance| {
            disposed.borrow_mut().push(instance.is_disposed());
        });
    }
    let c = container();
    h.owner
        .create(Some(&c), None, InitOptions::default())
        .expect("first create");
    h.owner
        .create(Some(&c), Some(Theme::named("dark")), InitOptions::default())
        .expect("second create");

    let instances = h.engine.instances();
    assert_eq!(instances.len(), 2);
    assert!(instances[0].is_disposed());
    assert!(!instances[1].is_disposed());
    assert_eq!(h.engine.live_instance_count(), 1);
    // Hook observes the outgoing instance before it is disposed.
    assert_eq!(*disposed.borrow(), vec![false]);
}

#[test]
fn construction_failure_propagates_from_create() {
    let h = harness();
    h.engine.fail_next_init("no canvas support");
    let err = h
        .owner
        .create(Some(&container()), None, InitOptions::default())
        .expect_err("creation must fail");
    assert_eq!(
        err,
        ChartError::InstanceCreation("no canvas support".to_owned())
    );
    assert!(!h.owner.is_live());
}

#[test]
fn create_without_container_leaves_live_chart_untouched() {
    let h = harness();
    let c = container();
    h.owner
        .create(Some(&c), Some(Theme::named("light")), InitOptions::default())
        .expect("create");

    h.owner
        .create(None, Some(Theme::named("dark")), InitOptions::default())
        .expect("no-op create");
    assert_eq!(h.owner.theme(), Some(Theme::named("light")));
    assert_eq!(h.engine.instances().len(), 1);
    assert!(h.owner.is_live());

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    assert_eq!(h.engine.instances().len(), 2);
    let instance = h.engine.last_instance().expect("instance");
    assert_eq!(instance.theme(), Some(&Theme::named("dark")));
}

#[test]
fn set_option_creates_instance_when_container_is_bound() {
    let h = harness();
    let c = container();
    h.engine.fail_next_init("transient");
    assert!(h.owner.mount(&c).is_err());
    assert!(!h.owner.is_live());
    assert_eq!(h.owner.container(), Some(c));

    let outcome = h
        .owner
        .set_option(&option(json!({ "title": { "text": "T" } })), SetOptionOptions::merge())
        .expect("set option");
    assert_eq!(outcome, ApplyOutcome::Applied);
    assert!(h.owner.is_live());
    assert_eq!(h.engine.instances().len(), 1);
}

#[test]
fn writes_after_dispose_reach_no_engine_until_next_mount() {
    let h = harness();
    let c = container();
    h.owner.mount(&c).expect("mount");
    h.owner.dispose();
    assert!(h.owner.container().is_none());
    h.engine.clear_calls();

    let outcome = h
        .owner
        .set_option(&option(json!({ "title": { "text": "late" } })), SetOptionOptions::merge())
        .expect("late write");
    assert_eq!(outcome, ApplyOutcome::Deferred);
    h.scheduler.run_until_idle();
    assert_eq!(h.engine.call_count(), 0);
    assert!(!h.owner.is_live());

    h.owner.mount(&c).expect("remount");
    let current = h.owner.get_option().expect("applied on mount");
    assert_eq!(current.pointer("/title/text"), Some(&json!("late")));
}

#[test]
fn option_written_before_mount_is_applied_on_mount() {
    let h = harness();
    let first = option(json!({ "series": [{ "type": "bar", "data": [1] }] }));
    let second = option(json!({ "title": { "text": "later" } }));
    assert_eq!(
        h.owner.set_option(&first, SetOptionOptions::merge()).expect("deferred"),
        ApplyOutcome::Deferred
    );
    assert_eq!(
        h.owner.set_option(&second, SetOptionOptions::merge()).expect("deferred"),
        ApplyOutcome::Deferred
    );
    assert_eq!(h.engine.call_count(), 0);

    h.owner.mount(&container()).expect("mount");
    let current = h.owner.get_option().expect("live option");
    assert_eq!(current.pointer("/series/0/data"), Some(&json!([1])));
    assert_eq!(current.pointer("/title/text"), Some(&json!("later")));
}

#[test]
fn merge_write_updates_series_data_in_place() {
    let h = harness();
    let c = container();
    h.owner
        .create(Some(&c), Some(Theme::named("light")), InitOptions::default())
        .expect("create");
    h.owner
        .set_option(
            &option(json!({ "series": [{ "type": "line", "data": [1, 2, 3] }] })),
            SetOptionOptions::replace(),
        )
        .expect("initial option");
    h.owner
        .set_option(
            &option(json!({ "series": [{ "data": [4, 5, 6] }] })),
            SetOptionOptions::merge(),
        )
        .expect("merge option");

    let current = h.owner.get_option().expect("live option");
    assert_eq!(current.pointer("/series/0/data"), Some(&json!([4, 5, 6])));
    assert_eq!(current.pointer("/series/0/type"), Some(&json!("line")));
}

#[test]
fn caller_option_is_never_mutated() {
    let h = harness();
    h.owner.mount(&container()).expect("mount");
    let base = option(json!({ "series": [{ "type": "line", "data": [1] }] }));
    let snapshot = base.clone();
    h.owner.replace_option(&base).expect("replace");
    h.owner
        .set_option(&option(json!({ "series": [{ "data": [2] }] })), SetOptionOptions::merge())
        .expect("merge");
    assert_eq!(base, snapshot);
}

#[test]
fn rejected_option_keeps_last_good_state() {
    let h = harness();
    h.owner.mount(&container()).expect("mount");
    let good = option(json!({ "title": { "text": "good" } }));
    h.owner.replace_option(&good).expect("good option");

    h.engine.reject_next_option("bad axis");
    let outcome = h
        .owner
        .set_option(&option(json!({ "title": { "text": "bad" } })), SetOptionOptions::merge())
        .expect("rejection is not an error");
    assert_eq!(
        outcome,
        ApplyOutcome::Rejected(ChartError::OptionRejected("bad axis".to_owned()))
    );
    assert_eq!(h.owner.get_option(), Some(good.clone()));

    let outcome = h
        .owner
        .set_option(&option(json!({ "series": 5 })), SetOptionOptions::merge())
        .expect("structural rejection is not an error");
    assert!(matches!(outcome, ApplyOutcome::Rejected(_)));
    assert_eq!(h.owner.get_option(), Some(good));
}

#[test]
fn dispose_is_idempotent() {
    let h = harness();
    h.owner.mount(&container()).expect("mount");
    h.owner
        .events()
        .on("click", chart_host::interaction::EventHandler::new(|_| {}));

    h.owner.dispose();
    let calls_after_first = h.engine.calls();
    h.owner.dispose();
    h.owner.dispose();

    assert_eq!(h.engine.calls(), calls_after_first);
    assert!(!h.owner.is_live());
    assert!(h.owner.events().is_empty());
    let disposes = calls_after_first
        .iter()
        .filter(|call| matches!(call, EngineCall::Dispose { .. }))
        .count();
    assert_eq!(disposes, 1);
}

#[test]
fn guarded_operations_after_dispose_are_neutral_and_silent() {
    let h = harness();
    h.owner.mount(&container()).expect("mount");
    h.owner
        .replace_option(&option(json!({ "title": { "text": "T" } })))
        .expect("option");
    h.owner.dispose();
    h.engine.clear_calls();

    let finder = json!({ "seriesIndex": 0 });
    h.owner.resize(Some(ResizeOptions::explicit(Size::new(10, 10))));
    h.owner.resize(None);
    h.owner.clear();
    h.owner.dispatch_action(&json!({ "type": "highlight" }));
    h.owner.show_loading(LoadingOptions::default());
    h.owner.hide_loading();
    assert_eq!(h.owner.get_option(), None);
    assert_eq!(h.owner.width(), None);
    assert_eq!(h.owner.height(), None);
    assert_eq!(h.owner.dom(), None);
    assert_eq!(h.owner.data_url(&DataUrlOptions::default()), None);
    assert_eq!(h.owner.connected_data_url(&DataUrlOptions::default()), None);
    assert_eq!(h.owner.convert_to_pixel(&finder, &json!([1, 2])), None);
    assert_eq!(h.owner.convert_from_pixel(&finder, &json!([1, 2])), None);
    assert!(!h.owner.contain_pixel(&finder, &json!([1, 2])));
    assert!(h.owner.instance().is_none());

    assert_eq!(h.engine.call_count(), 0);
    h.scheduler.run_until_idle();
    assert_eq!(h.engine.call_count(), 0);
}

#[test]
fn pass_through_queries_reach_the_live_instance() {
    let h = harness();
    let c = container();
    h.owner.mount(&c).expect("mount");

    assert_eq!(h.owner.width(), Some(800));
    assert_eq!(h.owner.height(), Some(400));
    assert_eq!(h.owner.dom(), Some(c.clone()));
    assert!(h.owner.contain_pixel(&json!({}), &json!([10.0, 10.0])));
    assert!(!h.owner.contain_pixel(&json!({}), &json!([1000.0, 10.0])));
    assert!(h
        .owner
        .data_url(&DataUrlOptions::default())
        .expect("data url")
        .starts_with("data:image/png"));

    h.owner.resize(Some(ResizeOptions::explicit(Size::new(640, 320))));
    assert_eq!(h.owner.width(), Some(640));
    assert_eq!(h.owner.height(), Some(320));

    h.owner.dispatch_action(&json!({ "type": "downplay" }));
    assert!(h.engine.calls().iter().any(|call| matches!(
        call,
        EngineCall::DispatchAction { action, .. } if action == &json!({ "type": "downplay" })
    )));
}

#[test]
fn group_tag_is_applied_to_every_new_instance() {
    let h = harness();
    h.owner.set_group(Some("linked".to_owned()));
    let c = container();
    h.owner.mount(&c).expect("mount");
    let instance = h.owner.instance().expect("live");
    assert_eq!(instance.group(), Some("linked".to_owned()));

    h.owner.create(Some(&c), None, InitOptions::default()).expect("recreate");
    let instance = h.owner.instance().expect("live");
    assert_eq!(instance.group(), Some("linked".to_owned()));

    assert!(h.owner.connect_group());
    assert_eq!(h.engine.connected_groups(), vec!["linked".to_owned()]);
    assert!(h.owner.disconnect_group());
    assert!(h.engine.connected_groups().is_empty());

    h.owner.set_group(None);
    assert_eq!(h.owner.instance().expect("live").group(), None);
    assert!(!h.owner.connect_group());
}

#[test]
fn loading_overlay_survives_recreation() {
    let h = harness();
    let c = container();
    h.owner.show_loading(LoadingOptions::default());
    h.owner.mount(&c).expect("mount");
    assert!(h.engine.last_instance().expect("instance").is_loading());

    h.owner.create(Some(&c), None, InitOptions::default()).expect("recreate");
    assert!(h.engine.last_instance().expect("instance").is_loading());

    h.owner.hide_loading();
    assert!(!h.engine.last_instance().expect("instance").is_loading());
}

#[test]
fn container_loss_keeps_option_and_registrations_for_remount() {
    let h = harness();
    let c = container();
    h.owner.mount(&c).expect("mount");
    h.owner
        .replace_option(&option(json!({ "title": { "text": "kept" } })))
        .expect("option");
    let clicks = Rc::new(RefCell::new(0));
    {
        let clicks = Rc::clone(&clicks);
        h.owner.events().on(
            "click",
            chart_host::interaction::EventHandler::new(move |_| *clicks.borrow_mut() += 1),
        );
    }

    h.owner.release_container();
    assert!(!h.owner.is_live());
    assert_eq!(h.engine.live_instance_count(), 0);

    h.owner.mount(&c).expect("remount");
    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/title/text"), Some(&json!("kept")));

    let instance = h.engine.last_instance().expect("instance");
    instance.trigger(&"click".into(), &json!({}));
    assert_eq!(*clicks.borrow(), 1);
}

#[test]
fn registry_helpers_forward_to_engine() {
    let h = harness();
    h.owner.register_theme("brand", json!({ "color": ["#123456"] }));
    h.owner.register_map("world", json!({ "type": "FeatureCollection" }));
    assert_eq!(
        h.engine.registered_theme("brand"),
        Some(json!({ "color": ["#123456"] }))
    );
    assert!(h.engine.registered_map("world").is_some());
}
