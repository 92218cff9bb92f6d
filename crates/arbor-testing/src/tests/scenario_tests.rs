//! End-to-end scenarios driven through the rig.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbor_core::dom::{DomTree, Namespace};
use arbor_core::{
    cleanup, component, create_context, create_portal, el, text, use_context, use_effect,
    use_state, use_sync_external_store, Child, Context, Props, StoreSubscriber, VNode,
};

use crate::TestRig;

fn rig() -> TestRig {
    let _ = env_logger::builder().is_test(true).try_init();
    TestRig::new()
}

#[test]
fn counter_counts_clicks() {
    fn counter(_: &Props) -> VNode {
        let (count, set_count) = use_state(|| 0);
        el(
            "div",
            Props::new(),
            (
                el("output", Props::new(), count.to_string()),
                el(
                    "button",
                    Props::new().on("click", move |_| set_count.update(|n| n + 1)),
                    "+",
                ),
            ),
        )
    }

    let rig = rig();
    rig.render(component(counter, Props::new(), ()));
    let output = rig.find_tag("output").unwrap();
    let button = rig.find_tag("button").unwrap();
    assert_eq!(rig.dom().text_content(output), "0");

    rig.click(button);
    assert_eq!(rig.dom().text_content(output), "1");

    for _ in 0..9 {
        rig.click(button);
    }
    assert_eq!(rig.dom().text_content(output), "10");
}

#[test]
fn keyed_shuffle_preserves_every_list_node() {
    fn list(order: &[&str]) -> VNode {
        let items: Vec<Child> = order
            .iter()
            .map(|k| Child::Node(el("li", Props::new().key(*k), text(*k))))
            .collect();
        el("ul", Props::new(), Child::Many(items))
    }

    let rig = rig();
    rig.render(list(&["a", "b", "c", "d", "e"]));
    let ul = rig.find_tag("ul").unwrap();
    let before = rig.dom().child_ids(ul);

    rig.render(list(&["e", "c", "a", "d", "b"]));
    let after = rig.dom().child_ids(ul);
    assert_eq!(rig.dom().text_content(ul), "ecadb");
    for node in &after {
        assert!(before.contains(node), "shuffle must not create nodes");
    }
}

#[test]
fn interval_effect_cleans_up_exactly_once() {
    thread_local! {
        static INTERVALS: Cell<i32> = const { Cell::new(0) };
        static CLEARED: Cell<u32> = const { Cell::new(0) };
    }
    fn ticker(_: &Props) -> VNode {
        use_effect((), || {
            INTERVALS.with(|i| i.set(i.get() + 1));
            cleanup(|| {
                INTERVALS.with(|i| i.set(i.get() - 1));
                CLEARED.with(|c| c.set(c.get() + 1));
            })
        });
        text("tick")
    }

    let rig = rig();
    rig.render(component(ticker, Props::new(), ()));
    assert_eq!(INTERVALS.with(Cell::get), 0, "the effect waits for a frame");
    rig.advance_frame();
    assert_eq!(INTERVALS.with(Cell::get), 1);

    rig.unmount();
    assert_eq!(INTERVALS.with(Cell::get), 0);
    assert_eq!(CLEARED.with(Cell::get), 1);
}

thread_local! {
    static THEME: Context<&'static str> = create_context("light");
}

#[test]
fn outer_context_swap_leaves_a_shadowed_consumer_alone() {
    thread_local! {
        static CONSUMER_RENDERS: Cell<usize> = const { Cell::new(0) };
    }
    fn consumer(_: &Props) -> VNode {
        CONSUMER_RENDERS.with(|c| c.set(c.get() + 1));
        text(THEME.with(use_context))
    }

    let rig = rig();
    let shadowed =
        THEME.with(|t| t.provide("light", component(consumer, Props::new(), ())));

    rig.render(THEME.with(|t| t.provide("dark", Child::Node(shadowed.clone()))));
    assert_eq!(rig.text(), "light");
    assert_eq!(CONSUMER_RENDERS.with(Cell::get), 1);

    rig.render(THEME.with(|t| t.provide("black", Child::Node(shadowed.clone()))));
    rig.pump_until_idle();
    assert_eq!(rig.text(), "light");
    assert_eq!(CONSUMER_RENDERS.with(Cell::get), 1, "no re-render leaked through");
}

#[test]
fn portal_mounts_into_and_leaves_its_target() {
    let rig = rig();
    let other = rig.dom().create_container("section");

    rig.render(el(
        "div",
        Props::new().set("id", "app"),
        (
            el("span", Props::new(), "A"),
            create_portal(el("em", Props::new(), "B"), other),
            el("span", Props::new(), "C"),
        ),
    ));
    let app = rig.top_children()[0];
    assert_eq!(rig.dom().text_content(app), "AC");
    assert_eq!(rig.dom().to_html(other), "<section><em>B</em></section>");

    rig.render(el(
        "div",
        Props::new().set("id", "app"),
        (el("span", Props::new(), "A"), el("span", Props::new(), "C")),
    ));
    assert_eq!(rig.dom().to_html(other), "<section></section>");
}

#[test]
fn svg_elements_carry_their_namespace_and_update_in_place() {
    let svg_tree = |radius: i32| {
        el(
            "svg",
            Props::new(),
            el("circle", Props::new().set("r", radius), ()),
        )
    };

    let rig = rig();
    rig.render(svg_tree(5));
    let svg = rig.find_tag("svg").unwrap();
    let circle = rig.find_tag("circle").unwrap();
    assert_eq!(rig.dom().namespace(svg), Namespace::Svg);
    assert_eq!(rig.dom().namespace(circle), Namespace::Svg);
    assert_eq!(rig.dom().attribute(circle, "r").as_deref(), Some("5"));

    rig.render(svg_tree(10));
    assert_eq!(rig.find_tag("circle"), Some(circle), "same circle node");
    assert_eq!(rig.dom().attribute(circle, "r").as_deref(), Some("10"));
}

#[test]
fn five_updates_in_one_handler_render_once() {
    thread_local! {
        static RENDERS: Cell<usize> = const { Cell::new(0) };
    }
    fn burst(_: &Props) -> VNode {
        RENDERS.with(|r| r.set(r.get() + 1));
        let (n, set) = use_state(|| 0);
        el(
            "button",
            Props::new().on("click", move |_| {
                for value in 1..=5 {
                    set.set(value);
                }
            }),
            n.to_string(),
        )
    }

    let rig = rig();
    rig.render(component(burst, Props::new(), ()));
    let button = rig.find_tag("button").unwrap();
    rig.click(button);
    assert_eq!(rig.text(), "5");
    assert_eq!(RENDERS.with(Cell::get), 2, "one mount render, one update render");
}

struct Store {
    value: Cell<&'static str>,
    listener: RefCell<Option<Rc<dyn Fn()>>>,
    unsubscribes: Cell<usize>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            value: Cell::new("X"),
            listener: RefCell::new(None),
            unsubscribes: Cell::new(0),
        }
    }
}

thread_local! {
    static STORE: Store = Store::default();
    static SUBSCRIBE: StoreSubscriber = Rc::new(|notify| {
        STORE.with(|store| *store.listener.borrow_mut() = Some(notify));
        Box::new(|| {
            STORE.with(|store| {
                store.unsubscribes.set(store.unsubscribes.get() + 1);
                store.listener.borrow_mut().take();
            });
        })
    });
    static SNAPSHOT: Rc<dyn Fn() -> &'static str> = Rc::new(|| STORE.with(|s| s.value.get()));
}

#[test]
fn external_store_updates_flow_into_the_tree() {
    fn viewer(_: &Props) -> VNode {
        let value = use_sync_external_store(
            SUBSCRIBE.with(Rc::clone),
            SNAPSHOT.with(Rc::clone),
        );
        text(value)
    }

    let rig = rig();
    rig.render(component(viewer, Props::new(), ()));
    assert_eq!(rig.text(), "X");
    rig.pump_until_idle();

    STORE.with(|s| s.value.set("Y"));
    let notify = STORE.with(|s| s.listener.borrow().clone());
    notify.expect("the component subscribed")();
    rig.pump_until_idle();
    assert_eq!(rig.text(), "Y");

    rig.unmount();
    assert_eq!(STORE.with(|s| s.unsubscribes.get()), 1);
}
