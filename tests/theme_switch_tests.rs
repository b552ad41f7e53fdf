use std::cell::Cell;
use std::rc::Rc;

use chart_host::api::{
    ApplyOutcome, AutoresizeConfig, ChartOwner, ChartOwnerConfig, ThemeSwitchPhase,
};
use chart_host::core::{ChartContainer, ChartOption, SetOptionOptions, Size, Theme};
use chart_host::interaction::{ChartEvent, EventHandler};
use chart_host::render::{EngineCall, MemoryEngine, RenderInstance};
use chart_host::runtime::{ResizeHub, VirtualScheduler};
use chart_host::ChartError;
use serde_json::json;

struct Harness {
    engine: Rc<MemoryEngine>,
    scheduler: Rc<VirtualScheduler>,
    hub: Rc<ResizeHub>,
    owner: ChartOwner,
}

fn harness() -> Harness {
    let engine = MemoryEngine::new();
    let scheduler = VirtualScheduler::new();
    let hub = ResizeHub::new(true);
    let config = ChartOwnerConfig::new()
        .with_theme(Theme::named("light"))
        .with_autoresize(AutoresizeConfig::debounced(100));
    let owner = ChartOwner::new(engine.clone(), scheduler.clone(), Rc::clone(&hub), config)
        .expect("owner init");
    Harness {
        engine,
        scheduler,
        hub,
        owner,
    }
}

fn option(value: serde_json::Value) -> ChartOption {
    ChartOption::from_value(value).expect("object option")
}

fn mounted_with_data(h: &Harness) -> ChartContainer {
    let c = ChartContainer::new(Size::new(800, 400));
    h.owner.mount(&c).expect("mount");
    h.owner
        .replace_option(&option(json!({
            "title": { "text": "T" },
            "series": [{ "type": "line", "data": [1, 2, 3] }]
        })))
        .expect("initial option");
    c
}

fn set_option_count(engine: &MemoryEngine) -> usize {
    engine
        .calls()
        .iter()
        .filter(|call| matches!(call, EngineCall::SetOption { .. }))
        .count()
}

#[test]
fn switching_theme_preserves_series_data() {
    let h = harness();
    mounted_with_data(&h);

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    h.scheduler.flush_layout();

    let instance = h.engine.last_instance().expect("new instance");
    assert_eq!(instance.theme(), Some(&Theme::named("dark")));
    assert_eq!(h.engine.live_instance_count(), 1);
    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/series/0/data"), Some(&json!([1, 2, 3])));
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Stable);
}

#[test]
fn restore_runs_only_after_layout_flush_as_full_replace() {
    let h = harness();
    mounted_with_data(&h);
    h.engine.clear_calls();

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Restoring);
    assert_eq!(h.scheduler.pending_layout_count(), 1);
    assert_eq!(set_option_count(&h.engine), 0);
    assert_eq!(h.owner.get_option(), None);

    h.scheduler.flush_layout();
    let writes = h.engine.set_option_calls();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].1.not_merge());
    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/title/text"), Some(&json!("T")));
}

#[test]
fn switch_without_configuration_skips_restore() {
    let h = harness();
    let c = ChartContainer::new(Size::new(800, 400));
    h.owner.mount(&c).expect("mount");
    h.engine.clear_calls();

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Stable);
    assert_eq!(h.scheduler.pending_layout_count(), 0);
    h.scheduler.flush_layout();
    assert_eq!(set_option_count(&h.engine), 0);
}

#[test]
fn same_theme_is_a_no_op() {
    let h = harness();
    mounted_with_data(&h);
    h.engine.clear_calls();

    h.owner.set_theme(Some(Theme::named("light"))).expect("same theme");
    assert_eq!(h.engine.call_count(), 0);
    assert_eq!(h.engine.instances().len(), 1);
}

#[test]
fn theme_change_before_mount_is_used_at_creation() {
    let h = harness();
    h.owner.set_theme(Some(Theme::named("dark"))).expect("record theme");
    assert_eq!(h.engine.call_count(), 0);

    h.owner
        .mount(&ChartContainer::new(Size::new(100, 100)))
        .expect("mount");
    let instance = h.engine.last_instance().expect("instance");
    assert_eq!(instance.theme(), Some(&Theme::named("dark")));
}

#[test]
fn event_subscriptions_follow_the_new_instance() {
    let h = harness();
    mounted_with_data(&h);
    let clicks = Rc::new(Cell::new(0));
    {
        let clicks = Rc::clone(&clicks);
        h.owner
            .events()
            .on("click", EventHandler::new(move |_| clicks.set(clicks.get() + 1)));
    }
    let old = h.engine.last_instance().expect("old instance");

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    h.scheduler.flush_layout();

    let new = h.engine.last_instance().expect("new instance");
    assert_ne!(old.id(), new.id());
    assert_eq!(new.handler_count(&ChartEvent::Click), 1);
    new.trigger(&ChartEvent::Click, &json!({ "dataIndex": 0 }));
    old.trigger(&ChartEvent::Click, &json!({ "dataIndex": 0 }));
    assert_eq!(clicks.get(), 1);
    assert_eq!(h.owner.events().handler_count("click"), 1);
}

#[test]
fn resize_subscription_is_replaced_during_switch() {
    let h = harness();
    mounted_with_data(&h);
    assert_eq!(h.hub.observer_count(), 1);
    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    h.scheduler.flush_layout();
    assert_eq!(h.hub.observer_count(), 1);
}

#[test]
fn detached_container_parks_switch_until_mount() {
    let h = harness();
    let c = mounted_with_data(&h);
    c.detach();

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    assert_eq!(
        h.owner.theme_switch_phase(),
        ThemeSwitchPhase::AwaitingContainer
    );
    assert!(!h.owner.is_live());
    assert_eq!(h.engine.live_instance_count(), 0);

    c.attach();
    h.owner.mount(&c).expect("resume");
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Restoring);
    h.scheduler.flush_layout();

    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/series/0/data"), Some(&json!([1, 2, 3])));
    assert_eq!(
        h.engine.last_instance().expect("instance").theme(),
        Some(&Theme::named("dark"))
    );
}

#[test]
fn recreation_failure_propagates_and_keeps_configuration_for_remount() {
    let h = harness();
    let c = mounted_with_data(&h);
    h.engine.fail_next_init("renderer unavailable");

    let err = h
        .owner
        .set_theme(Some(Theme::named("dark")))
        .expect_err("recreation fails");
    assert_eq!(
        err,
        ChartError::InstanceCreation("renderer unavailable".to_owned())
    );
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Stable);
    assert!(!h.owner.is_live());

    h.owner.mount(&c).expect("retry");
    let current = h.owner.get_option().expect("restored on remount");
    assert_eq!(current.pointer("/title/text"), Some(&json!("T")));
}

#[test]
fn writes_during_switch_are_folded_into_the_restore() {
    let h = harness();
    mounted_with_data(&h);

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    let outcome = h
        .owner
        .set_option(
            &option(json!({ "title": { "text": "updated" } })),
            SetOptionOptions::merge(),
        )
        .expect("coalesced");
    assert_eq!(outcome, ApplyOutcome::Deferred);
    h.engine.clear_calls();

    h.scheduler.flush_layout();
    assert_eq!(set_option_count(&h.engine), 1);
    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/title/text"), Some(&json!("updated")));
    assert_eq!(current.pointer("/series/0/data"), Some(&json!([1, 2, 3])));
}

#[test]
fn back_to_back_switches_restore_once_on_the_final_instance() {
    let h = harness();
    mounted_with_data(&h);

    h.owner.set_theme(Some(Theme::named("dark"))).expect("first switch");
    h.owner.set_theme(Some(Theme::named("light"))).expect("second switch");
    h.engine.clear_calls();
    h.scheduler.flush_layout();

    assert_eq!(set_option_count(&h.engine), 1);
    assert_eq!(h.engine.live_instance_count(), 1);
    let instance = h.engine.last_instance().expect("instance");
    assert_eq!(instance.theme(), Some(&Theme::named("light")));
    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/series/0/data"), Some(&json!([1, 2, 3])));
}

#[test]
fn dispose_mid_switch_cancels_the_restore() {
    let h = harness();
    mounted_with_data(&h);

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    h.owner.dispose();
    h.engine.clear_calls();
    h.scheduler.flush_layout();

    assert_eq!(h.engine.call_count(), 0);
    assert!(!h.owner.is_live());
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Stable);
}

#[test]
fn container_loss_mid_restore_keeps_configuration_for_remount() {
    let h = harness();
    let c = mounted_with_data(&h);

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Restoring);
    h.owner
        .set_option(
            &option(json!({ "legend": { "show": true } })),
            SetOptionOptions::merge(),
        )
        .expect("coalesced");

    h.owner.release_container();
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Stable);
    h.scheduler.run_until_idle();
    assert!(!h.owner.is_live());

    h.owner.mount(&c).expect("remount");
    h.scheduler.run_until_idle();
    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/title/text"), Some(&json!("T")));
    assert_eq!(current.pointer("/legend/show"), Some(&json!(true)));
    assert_eq!(current.pointer("/series/0/data"), Some(&json!([1, 2, 3])));
    assert_eq!(
        h.engine.last_instance().expect("instance").theme(),
        Some(&Theme::named("dark"))
    );
}

#[test]
fn restore_without_live_instance_keeps_snapshot_pending() {
    let h = harness();
    let c = mounted_with_data(&h);

    h.owner.set_theme(Some(Theme::named("dark"))).expect("switch");
    // The engine tears the instance down on its own before layout commits.
    h.engine.last_instance().expect("new instance").dispose();
    h.scheduler.flush_layout();
    assert_eq!(h.owner.theme_switch_phase(), ThemeSwitchPhase::Stable);
    assert!(!h.owner.is_live());

    h.owner.mount(&c).expect("remount");
    let current = h.owner.get_option().expect("restored");
    assert_eq!(current.pointer("/title/text"), Some(&json!("T")));
}
