//! Per-node diff dispatch and the unmount path.
//!
//! `diff_node` compares one new vnode against its matched predecessor and
//! mutates the document to agree, recursing through the child reconciler.
//! Teardown is recursive and top-down: a parent's cleanups run before its
//! descendants', and document nodes detach at the subtree root — except
//! under portals, whose children live elsewhere and always detach
//! individually.

pub(crate) mod children;

use std::rc::Rc;

use log::error;

use crate::commit::{CommitBatch, RefAction};
use crate::component::ComponentInstance;
use crate::context::ProviderState;
use crate::dom::{DomError, NodeId, Namespace};
use crate::engine::Engine;
use crate::frame;
use crate::property;
use crate::props::{RefSlot, RefValue};
use crate::vnode::{ChildUnit, Children, NodeKind, VNode};

/// Diffs `new` against `old` inside `parent_dom`, inserting fresh
/// document nodes before `old_dom`.
pub(crate) fn diff_node(
    engine: &Engine,
    batch: &mut CommitBatch,
    parent_dom: NodeId,
    new: &VNode,
    old: Option<&VNode>,
    ns: Namespace,
    old_dom: Option<NodeId>,
) -> Result<(), DomError> {
    engine.options().fire_diff_started(new);

    // The reconciler only matches same-type nodes, but the root path and
    // defensive callers may still hand us a mismatch: replace wholesale.
    let old = match old {
        Some(old) if old.kind().same_type(new.kind()) => Some(old),
        Some(old) => {
            unmount(engine, old, true);
            None
        }
        None => None,
    };

    // An unchanged vnode handed back verbatim keeps its whole subtree;
    // nothing can have diverged underneath it.
    if let Some(old) = old {
        if old.ptr_eq(new) {
            engine.options().fire_diff_ended(new);
            return Ok(());
        }
    }

    match new.kind() {
        NodeKind::Text(value) => diff_text(engine, parent_dom, new, old, old_dom, value)?,
        NodeKind::Element(tag) => {
            diff_element(engine, batch, parent_dom, new, old, ns, old_dom, tag.clone())?
        }
        NodeKind::Component(_) => {
            diff_component(engine, batch, parent_dom, new, old, ns, old_dom)?
        }
        NodeKind::Fragment => {
            let old_children = take_old_children(old);
            children::reconcile(
                engine,
                batch,
                parent_dom,
                &new.props().children().clone(),
                new,
                old_children,
                ns,
                old_dom,
            )?;
        }
        NodeKind::Portal { container } => {
            diff_portal(engine, batch, new, old, *container)?;
        }
    }

    engine.options().fire_diff_ended(new);
    Ok(())
}

fn take_old_children(old: Option<&VNode>) -> Vec<VNode> {
    match old {
        Some(old) => old.core.children.take(),
        None => Vec::new(),
    }
}

fn diff_text(
    engine: &Engine,
    parent_dom: NodeId,
    new: &VNode,
    old: Option<&VNode>,
    old_dom: Option<NodeId>,
    value: &Rc<str>,
) -> Result<(), DomError> {
    if let Some(old) = old {
        if let Some(node) = old.dom() {
            new.core.dom.set(Some(node));
            if let NodeKind::Text(prev) = old.kind() {
                if prev != value {
                    engine.dom().set_node_value(node, value)?;
                }
            }
            return Ok(());
        }
    }
    let node = engine.dom().create_text(value);
    engine.dom().insert_before(parent_dom, node, old_dom)?;
    new.core.dom.set(Some(node));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn diff_element(
    engine: &Engine,
    batch: &mut CommitBatch,
    parent_dom: NodeId,
    new: &VNode,
    old: Option<&VNode>,
    ns: Namespace,
    old_dom: Option<NodeId>,
    tag: Rc<str>,
) -> Result<(), DomError> {
    let child_ns = if &*tag == "svg" { Namespace::Svg } else { ns };

    let reused = old.and_then(VNode::dom);
    let node = match reused {
        Some(node) => node,
        None => {
            let node = engine.dom().create_element(&tag, child_ns);
            engine.dom().insert_before(parent_dom, node, old_dom)?;
            node
        }
    };
    new.core.dom.set(Some(node));

    let old_props = old.map(VNode::props);
    property::write_props(engine, node, new.props(), old_props, child_ns)?;

    let old_children = take_old_children(old);
    if new.props().get("dangerouslySetInnerHTML").is_some() {
        // The markup owns the element's content; structural children are
        // not reconciled into it.
        for old_child in &old_children {
            unmount(engine, old_child, false);
        }
        new.core.children.borrow_mut().clear();
    } else {
        let first = if reused.is_some() {
            engine.dom().first_child(node)
        } else {
            None
        };
        children::reconcile(
            engine,
            batch,
            node,
            &new.props().children().clone(),
            new,
            old_children,
            child_ns,
            first,
        )?;
    }

    queue_ref(
        batch,
        new.slot_ref(),
        old.and_then(VNode::slot_ref),
        reused.is_none(),
        RefValue::Node(node),
    );
    Ok(())
}

fn diff_component(
    engine: &Engine,
    batch: &mut CommitBatch,
    parent_dom: NodeId,
    new: &VNode,
    old: Option<&VNode>,
    ns: Namespace,
    old_dom: Option<NodeId>,
) -> Result<(), DomError> {
    let carried = old.and_then(VNode::component);
    let fresh = carried.is_none();
    let instance = match carried {
        Some(instance) => instance,
        None => ComponentInstance::new(Rc::downgrade(&engine.core), new.props().clone()),
    };
    *new.core.component.borrow_mut() = Some(instance.clone());
    instance.attach(new);
    *instance.core.props.borrow_mut() = new.props().clone();

    let old_children = take_old_children(old);
    render_component(engine, batch, parent_dom, new, &instance, old_children, ns, old_dom)?;

    queue_ref(
        batch,
        new.slot_ref(),
        old.and_then(VNode::slot_ref),
        fresh,
        RefValue::Instance(instance),
    );
    Ok(())
}

/// Runs a component body and reconciles its output. Shared between the
/// tree diff and scheduler-driven re-renders.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_component(
    engine: &Engine,
    batch: &mut CommitBatch,
    parent_dom: NodeId,
    vnode: &VNode,
    instance: &ComponentInstance,
    old_children: Vec<VNode>,
    ns: Namespace,
    old_dom: Option<NodeId>,
) -> Result<(), DomError> {
    // Reached through the tree: a queued re-render would be redundant.
    engine.dequeue(instance);

    let NodeKind::Component(component) = vnode.kind() else {
        error!("render_component on a non-component vnode; skipping");
        return Ok(());
    };

    if let Some(context) = component.provides() {
        update_provider(engine, vnode, instance, context);
    }

    engine.options().fire_before_render(vnode);

    let rendered = {
        instance.core.hooks.borrow_mut().reset_cursor();
        let _frame_guard = frame::enter(instance);
        let props = instance.core.props.borrow();
        component.render(&props)
    };

    let raw = Children::One(Box::new(ChildUnit::Node(rendered)));
    children::reconcile(
        engine, batch, parent_dom, &raw, vnode, old_children, ns, old_dom,
    )?;

    if instance.has_pending_effects() {
        batch.commit_queue.push(instance.clone());
    }
    Ok(())
}

/// Provider bookkeeping: store the new value and, when its identity
/// changed, enqueue the live subscribers. They are enqueued before the
/// subtree renders, so reaching them through it dequeues them again and
/// a value change costs one render, not two.
fn update_provider(
    engine: &Engine,
    vnode: &VNode,
    instance: &ComponentInstance,
    context: crate::context::ContextId,
) {
    let value = match vnode.props().get("value").and_then(|v| v.as_opaque()) {
        Some(value) => value.clone(),
        None => {
            error!("provider vnode without a value prop");
            return;
        }
    };
    let existing = instance.core.provider.borrow().clone();
    match existing {
        None => {
            *instance.core.provider.borrow_mut() = Some(ProviderState::new(context, value));
        }
        Some(state) => {
            let changed = !state.value.borrow().same(&value);
            if changed {
                *state.value.borrow_mut() = value;
                for subscriber in state.take_live_subscribers() {
                    engine.enqueue(&subscriber);
                }
            }
        }
    }
}

fn diff_portal(
    engine: &Engine,
    batch: &mut CommitBatch,
    new: &VNode,
    old: Option<&VNode>,
    container: NodeId,
) -> Result<(), DomError> {
    if !engine.dom().is_element(container) {
        error!("portal target {container} is not an element; rendering nothing");
        return Ok(());
    }

    // A container change abandons the old subtree; children are unmounted
    // and recreated rather than moved.
    let old_children = match old {
        Some(old) => match old.kind() {
            NodeKind::Portal {
                container: old_container,
            } if *old_container == container => take_old_children(Some(old)),
            _ => {
                for child in old.core.children.take() {
                    unmount(engine, &child, true);
                }
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let portal_ns = engine.dom().namespace(container);
    let anchor = old_children.iter().find_map(VNode::first_dom);
    children::reconcile(
        engine,
        batch,
        container,
        &new.props().children().clone(),
        new,
        old_children,
        portal_ns,
        anchor,
    )?;

    queue_ref(
        batch,
        new.slot_ref(),
        old.and_then(VNode::slot_ref),
        old.is_none(),
        RefValue::Node(container),
    );
    Ok(())
}

/// Queues a ref update when the destination or the handle changed.
fn queue_ref(
    batch: &mut CommitBatch,
    new_ref: Option<&RefSlot>,
    old_ref: Option<&RefSlot>,
    fresh_target: bool,
    target: RefValue,
) {
    match (old_ref, new_ref) {
        (None, None) => {}
        (Some(old), Some(new)) if old.ptr_eq(new) && !fresh_target => {}
        _ => batch.ref_queue.push(RefAction {
            previous: old_ref.cloned(),
            current: new_ref.cloned(),
            target,
        }),
    }
}

/// Recursive teardown: observer hook, ref cleared, hook cleanups in
/// reverse slot order, context subscriptions dropped, then children, then
/// the document node when this subtree root owns one.
pub(crate) fn unmount(engine: &Engine, vnode: &VNode, detach: bool) {
    engine.options().fire_unmounted(vnode);

    if let Some(slot) = vnode.slot_ref() {
        slot.apply(None);
    }

    if let Some(instance) = vnode.component() {
        let cleanups = instance.core.hooks.borrow_mut().take_cleanups_reversed();
        for cleanup in cleanups {
            cleanup();
        }
        crate::context::cleanup_subscriptions(&instance);
        instance.detach();
    }

    let child_detach = match vnode.kind() {
        // Portal children live in a foreign container; the structural
        // parent's removal never takes them along.
        NodeKind::Portal { .. } => true,
        NodeKind::Element(_) => false,
        _ => detach,
    };
    let children = vnode.core.children.take();
    for child in &children {
        unmount(engine, child, child_detach);
    }

    match vnode.kind() {
        NodeKind::Element(_) | NodeKind::Text(_) => {
            if let Some(node) = vnode.dom() {
                engine.purge_listeners(node);
                if detach {
                    if let Err(err) = engine.dom().remove(node) {
                        error!("failed to remove node {node}: {err}");
                    }
                }
            }
        }
        _ => {}
    }

    vnode.core.dom.set(None);
    vnode.core.component.borrow_mut().take();
}

/// Scheduler entry: re-renders one component in place.
pub(crate) fn rerender_instance(
    engine: &Engine,
    instance: &ComponentInstance,
) -> Result<(), DomError> {
    let Some(vnode) = instance.vnode() else {
        return Ok(());
    };
    let Some(parent_dom) = closest_parent_dom(&vnode) else {
        error!("component has no document ancestor; skipping re-render");
        return Ok(());
    };
    let ns = engine.dom().namespace(parent_dom);
    let old_dom = vnode.first_dom();
    let old_children = vnode.core.children.take();
    let mut batch = CommitBatch::default();
    render_component(
        engine,
        &mut batch,
        parent_dom,
        &vnode,
        instance,
        old_children,
        ns,
        old_dom,
    )?;
    crate::commit::commit(engine, &vnode, batch);
    Ok(())
}

/// Nearest document node up the structural parent chain; a portal
/// ancestor contributes its target container.
fn closest_parent_dom(vnode: &VNode) -> Option<NodeId> {
    let mut cursor = vnode.parent();
    while let Some(ancestor) = cursor {
        if let NodeKind::Portal { container } = ancestor.kind() {
            return Some(*container);
        }
        if let Some(node) = ancestor.dom() {
            return Some(node);
        }
        cursor = ancestor.parent();
    }
    None
}
