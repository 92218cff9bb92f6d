use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::util::bed;
use crate::component::component;
use crate::dom::{ConcreteDomHost, DomTree, MemoryDom};
use crate::hooks::{use_state, StateSetter};
use crate::platform::HostScheduler;
use crate::props::Props;
use crate::vnode::{text, Child, VNode};
use crate::Engine;

#[derive(Default)]
struct CountingScheduler {
    flushes: Cell<usize>,
    frames: Cell<usize>,
}

impl HostScheduler for CountingScheduler {
    fn schedule_flush(&self) {
        self.flushes.set(self.flushes.get() + 1);
    }

    fn request_frame(&self) {
        self.frames.set(self.frames.get() + 1);
    }
}

#[test]
fn one_flush_signal_per_batch() {
    thread_local! {
        static SET: RefCell<Option<StateSetter<i32>>> = const { RefCell::new(None) };
    }
    fn probe(_: &Props) -> VNode {
        let (n, set) = use_state(|| 0);
        SET.with(|s| *s.borrow_mut() = Some(set));
        text(n.to_string())
    }

    let host = Rc::new(ConcreteDomHost::new(MemoryDom::new()));
    let container = host.borrow_typed().create_container("div");
    let scheduler = Rc::new(CountingScheduler::default());
    let engine = Engine::new(host.clone(), scheduler.clone());

    engine
        .render(Some(component(probe, Props::new(), ())), container)
        .unwrap();
    assert_eq!(scheduler.flushes.get(), 0);

    SET.with(|s| s.borrow().as_ref().unwrap().set(1));
    SET.with(|s| s.borrow().as_ref().unwrap().set(2));
    SET.with(|s| s.borrow().as_ref().unwrap().set(3));
    assert_eq!(scheduler.flushes.get(), 1, "a batch signals the host once");

    engine.flush().unwrap();
    assert_eq!(host.borrow_typed().text_content(container), "3");

    SET.with(|s| s.borrow().as_ref().unwrap().set(4));
    assert_eq!(scheduler.flushes.get(), 2, "the next batch signals again");
    engine.flush().unwrap();
}

#[test]
fn parents_drain_before_deeper_components() {
    thread_local! {
        static PARENT_SET: RefCell<Option<StateSetter<bool>>> = const { RefCell::new(None) };
        static CHILD_SET: RefCell<Option<StateSetter<i32>>> = const { RefCell::new(None) };
        static CHILD_RENDERS: Cell<usize> = const { Cell::new(0) };
    }
    fn child(_: &Props) -> VNode {
        CHILD_RENDERS.with(|c| c.set(c.get() + 1));
        let (n, set) = use_state(|| 0);
        CHILD_SET.with(|s| *s.borrow_mut() = Some(set));
        text(n.to_string())
    }
    fn parent(_: &Props) -> VNode {
        let (show, set) = use_state(|| true);
        PARENT_SET.with(|s| *s.borrow_mut() = Some(set));
        if show {
            component(child, Props::new(), ())
        } else {
            text("gone")
        }
    }

    let bed = bed();
    bed.render(component(parent, Props::new(), ()));
    assert_eq!(CHILD_RENDERS.with(Cell::get), 1);

    // The child is queued first, but the shallower parent drains first
    // and unmounts it; the child's stale entry is skipped.
    CHILD_SET.with(|s| s.borrow().as_ref().unwrap().set(5));
    PARENT_SET.with(|s| s.borrow().as_ref().unwrap().set(false));
    bed.pump();
    assert_eq!(bed.text(), "gone");
    assert_eq!(CHILD_RENDERS.with(Cell::get), 1, "unmounted child never re-rendered");
}

#[test]
fn parent_rerender_subsumes_a_queued_child() {
    thread_local! {
        static PARENT_SET: RefCell<Option<StateSetter<i32>>> = const { RefCell::new(None) };
        static CHILD_SET: RefCell<Option<StateSetter<i32>>> = const { RefCell::new(None) };
        static CHILD_RENDERS: Cell<usize> = const { Cell::new(0) };
    }
    fn child(_: &Props) -> VNode {
        CHILD_RENDERS.with(|c| c.set(c.get() + 1));
        let (n, set) = use_state(|| 0);
        CHILD_SET.with(|s| *s.borrow_mut() = Some(set));
        text(n.to_string())
    }
    fn parent(_: &Props) -> VNode {
        let (_, set) = use_state(|| 0);
        PARENT_SET.with(|s| *s.borrow_mut() = Some(set));
        component(child, Props::new(), ())
    }

    let bed = bed();
    bed.render(component(parent, Props::new(), ()));
    assert_eq!(CHILD_RENDERS.with(Cell::get), 1);

    CHILD_SET.with(|s| s.borrow().as_ref().unwrap().set(7));
    PARENT_SET.with(|s| s.borrow().as_ref().unwrap().set(1));
    bed.pump();

    // The parent's subtree diff reached the child and dequeued it: one
    // re-render, not two, and the child's new state is visible.
    assert_eq!(CHILD_RENDERS.with(Cell::get), 2);
    assert_eq!(bed.text(), "7");
}

#[test]
fn sibling_updates_drain_in_insertion_order() {
    thread_local! {
        static SETS: RefCell<Vec<StateSetter<i32>>> = const { RefCell::new(Vec::new()) };
        static ORDER: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }
    fn left(_: &Props) -> VNode {
        let (n, set) = use_state(|| 0);
        if n > 0 {
            ORDER.with(|o| o.borrow_mut().push("left"));
        }
        SETS.with(|s| s.borrow_mut().push(set));
        text(n.to_string())
    }
    fn right(_: &Props) -> VNode {
        let (n, set) = use_state(|| 0);
        if n > 0 {
            ORDER.with(|o| o.borrow_mut().push("right"));
        }
        SETS.with(|s| s.borrow_mut().push(set));
        text(n.to_string())
    }
    fn pair(_: &Props) -> VNode {
        crate::vnode::fragment((
            Child::Node(component(left, Props::new(), ())),
            Child::Node(component(right, Props::new(), ())),
        ))
    }

    let bed = bed();
    bed.render(component(pair, Props::new(), ()));

    // Same depth: insertion order breaks the tie.
    SETS.with(|s| s.borrow()[1].set(1));
    SETS.with(|s| s.borrow()[0].set(1));
    bed.pump();
    ORDER.with(|o| assert_eq!(*o.borrow(), vec!["right", "left"]));
}
