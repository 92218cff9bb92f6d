use std::cell::{Cell, RefCell};

use super::util::bed;
use crate::component::component;
use crate::hooks::{cleanup, use_effect, use_effect_always, use_layout_effect, use_state, StateSetter};
use crate::props::{PropValue, Props, RefValue};
use crate::vnode::{el, text, VNode};
use crate::{create_ref, EffectCleanup};

#[test]
fn effect_runs_per_mount_and_dep_transition_with_cleanup_between() {
    thread_local! {
        static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }
    fn log(entry: String) {
        LOG.with(|l| l.borrow_mut().push(entry));
    }
    fn probe(props: &Props) -> VNode {
        let dep = match props.get("dep") {
            Some(PropValue::Number(n)) => *n as i32,
            _ => 0,
        };
        use_effect((dep,), move || {
            log(format!("effect{dep}"));
            cleanup(move || log(format!("cleanup{dep}")))
        });
        text("")
    }

    let bed = bed();
    bed.render(component(probe, Props::new().set("dep", 1), ()));
    bed.pump();
    LOG.with(|l| assert_eq!(*l.borrow(), vec!["effect1"]));

    // Unchanged deps: nothing runs.
    bed.render(component(probe, Props::new().set("dep", 1), ()));
    bed.pump();
    LOG.with(|l| assert_eq!(l.borrow().len(), 1));

    // Changed deps: the prior cleanup runs before the new effect.
    bed.render(component(probe, Props::new().set("dep", 2), ()));
    bed.pump();
    LOG.with(|l| assert_eq!(*l.borrow(), vec!["effect1", "cleanup1", "effect2"]));

    bed.unmount_all();
    LOG.with(|l| {
        assert_eq!(
            *l.borrow(),
            vec!["effect1", "cleanup1", "effect2", "cleanup2"]
        )
    });
}

#[test]
fn subscription_balances_to_zero_on_unmount() {
    thread_local! {
        static ACTIVE: Cell<i32> = const { Cell::new(0) };
        static CLEANUPS: Cell<u32> = const { Cell::new(0) };
    }
    fn timer(_: &Props) -> VNode {
        use_effect((), || {
            ACTIVE.with(|a| a.set(a.get() + 1));
            cleanup(|| {
                ACTIVE.with(|a| a.set(a.get() - 1));
                CLEANUPS.with(|c| c.set(c.get() + 1));
            })
        });
        text("tick")
    }

    let bed = bed();
    bed.render(component(timer, Props::new(), ()));
    bed.pump();
    assert_eq!(ACTIVE.with(Cell::get), 1);

    bed.unmount_all();
    assert_eq!(ACTIVE.with(Cell::get), 0);
    assert_eq!(CLEANUPS.with(Cell::get), 1, "cleanup observed exactly once");
}

#[test]
fn effect_without_deps_runs_after_every_render() {
    thread_local! {
        static RUNS: Cell<usize> = const { Cell::new(0) };
    }
    fn probe(_: &Props) -> VNode {
        use_effect_always(|| {
            RUNS.with(|r| r.set(r.get() + 1));
            EffectCleanup::none()
        });
        text("")
    }

    let bed = bed();
    bed.render(component(probe, Props::new(), ()));
    bed.pump();
    bed.render(component(probe, Props::new(), ()));
    bed.pump();
    assert_eq!(RUNS.with(Cell::get), 2);
}

#[test]
fn refs_then_layout_effects_then_post_paint_effects() {
    thread_local! {
        static LOG: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }
    fn probe(_: &Props) -> VNode {
        use_layout_effect((), || {
            LOG.with(|l| l.borrow_mut().push("layout"));
            EffectCleanup::none()
        });
        use_effect((), || {
            LOG.with(|l| l.borrow_mut().push("deferred"));
            EffectCleanup::none()
        });
        el(
            "div",
            Props::new().ref_callback(|handle| {
                if handle.is_some() {
                    LOG.with(|l| l.borrow_mut().push("ref"));
                }
            }),
            (),
        )
    }

    let bed = bed();
    bed.render(component(probe, Props::new(), ()));
    // Refs and layout effects are synchronous with the commit.
    LOG.with(|l| assert_eq!(*l.borrow(), vec!["ref", "layout"]));
    bed.engine.run_frame();
    LOG.with(|l| assert_eq!(*l.borrow(), vec!["ref", "layout", "deferred"]));
}

#[test]
fn layout_effects_run_children_before_parents() {
    thread_local! {
        static LOG: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }
    fn child(_: &Props) -> VNode {
        use_layout_effect((), || {
            LOG.with(|l| l.borrow_mut().push("child"));
            EffectCleanup::none()
        });
        text("c")
    }
    fn parent(_: &Props) -> VNode {
        use_layout_effect((), || {
            LOG.with(|l| l.borrow_mut().push("parent"));
            EffectCleanup::none()
        });
        component(child, Props::new(), ())
    }

    let bed = bed();
    bed.render(component(parent, Props::new(), ()));
    LOG.with(|l| assert_eq!(*l.borrow(), vec!["child", "parent"]));
}

#[test]
fn object_ref_tracks_mount_and_unmount() {
    let bed = bed();
    let slot = create_ref();

    bed.render(el("span", Props::new().node_ref(slot.clone()), "x"));
    let span = bed.top_children()[0];
    match &*slot.borrow() {
        Some(RefValue::Node(node)) => assert_eq!(*node, span),
        other => panic!("expected a node handle, got {other:?}"),
    }

    bed.unmount_all();
    assert!(slot.borrow().is_none(), "unmount clears the ref");
}

#[test]
fn type_change_clears_the_old_ref_and_sets_the_new() {
    thread_local! {
        static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }
    fn record(tag: &str, handle: &Option<RefValue>) {
        let state = match handle {
            Some(_) => "set",
            None => "cleared",
        };
        LOG.with(|l| l.borrow_mut().push(format!("{tag}:{state}")));
    }

    let bed = bed();
    bed.render(el(
        "span",
        Props::new().ref_callback(|h| record("old", &h)),
        (),
    ));
    LOG.with(|l| assert_eq!(*l.borrow(), vec!["old:set"]));

    bed.render(el(
        "em",
        Props::new().ref_callback(|h| record("new", &h)),
        (),
    ));
    LOG.with(|l| assert_eq!(*l.borrow(), vec!["old:set", "old:cleared", "new:set"]));
}

#[test]
fn state_updates_from_effects_schedule_normally() {
    thread_local! {
        static SET: RefCell<Option<StateSetter<i32>>> = const { RefCell::new(None) };
    }
    fn probe(_: &Props) -> VNode {
        let (n, set) = use_state(|| 0);
        SET.with(|s| *s.borrow_mut() = Some(set.clone()));
        use_effect((), move || {
            set.set(5);
            EffectCleanup::none()
        });
        text(n.to_string())
    }

    let bed = bed();
    bed.render(component(probe, Props::new(), ()));
    assert_eq!(bed.text(), "0");
    bed.pump();
    assert_eq!(bed.text(), "5");
}
