//! Keyed child reconciliation.
//!
//! Four phases: normalize the raw payload into vnodes, match new children
//! against old ones (keyed index first, positional and forward scan for
//! the unkeyed), diff-and-place left to right behind a moving cursor, and
//! finally unmount the leftovers. The unmount pass is deferred so that
//! old DOM positions stay valid insertion references while placing.

use rustc_hash::FxHashMap;

use crate::commit::CommitBatch;
use crate::diff;
use crate::dom::{DomError, NodeId, Namespace};
use crate::engine::Engine;
use crate::vnode::{text, ChildUnit, Children, Key, VNode};

/// Reconciles `raw` children of `parent_vnode` against `old_children`
/// inside `parent_dom`. `first_dom_ref` anchors the zone: the document
/// node the first child should precede.
#[allow(clippy::too_many_arguments)]
pub(crate) fn reconcile(
    engine: &Engine,
    batch: &mut CommitBatch,
    parent_dom: NodeId,
    raw: &Children,
    parent_vnode: &VNode,
    old_children: Vec<VNode>,
    ns: Namespace,
    first_dom_ref: Option<NodeId>,
) -> Result<(), DomError> {
    // Phase A: normalize. Strings and numbers become text vnodes here,
    // not in the factory.
    let new_children: Vec<VNode> = raw
        .units()
        .map(|unit| match unit {
            ChildUnit::Node(vnode) => vnode.clone(),
            ChildUnit::Text(s) => text(s.clone()),
            ChildUnit::Number(n) => text(n.to_string()),
        })
        .collect();

    // Phase B: match.
    let matched = match_children(&new_children, &old_children);
    let mut used = vec![false; old_children.len()];
    for old_index in matched.iter().flatten() {
        used[*old_index] = true;
    }

    *parent_vnode.core.children.borrow_mut() = new_children.clone();

    // Phase C: diff and place.
    let mut cursor: Option<NodeId> = None;
    for (index, child) in new_children.iter().enumerate() {
        child.set_parent(parent_vnode);
        child.core.depth.set(parent_vnode.depth() + 1);
        child.core.index.set(index);

        let reference = insertion_reference(engine, cursor, first_dom_ref);
        let old_child = matched[index].map(|old_index| &old_children[old_index]);
        diff::diff_node(engine, batch, parent_dom, child, old_child, ns, reference)?;

        if matched[index].is_some() {
            if let Some(first) = child.first_dom() {
                let expected = insertion_reference(engine, cursor, first_dom_ref);
                if expected != Some(first) {
                    move_dom_range(engine, parent_dom, child, expected)?;
                }
            }
        }

        if let Some(last) = child.last_dom() {
            cursor = Some(last);
        }
    }

    // Phase D: unmount everything the new children did not claim.
    for (old_index, old_child) in old_children.iter().enumerate() {
        if !used[old_index] {
            diff::unmount(engine, old_child, true);
        }
    }

    Ok(())
}

/// Where the next child's first document node belongs: right after the
/// cursor, or at the zone anchor for the first child.
fn insertion_reference(
    engine: &Engine,
    cursor: Option<NodeId>,
    first_dom_ref: Option<NodeId>,
) -> Option<NodeId> {
    match cursor {
        Some(cursor) => engine.dom().next_sibling(cursor),
        None => first_dom_ref,
    }
}

/// Pairs each new child with a reusable old child, or none.
fn match_children(new_children: &[VNode], old_children: &[VNode]) -> Vec<Option<usize>> {
    let mut keyed: FxHashMap<&Key, usize> = FxHashMap::default();
    for (index, old) in old_children.iter().enumerate() {
        if let Some(key) = old.key() {
            keyed.entry(key).or_insert(index);
        }
    }

    let mut taken = vec![false; old_children.len()];
    let mut matched = vec![None; new_children.len()];

    for (index, child) in new_children.iter().enumerate() {
        match child.key() {
            Some(key) => {
                if let Some(&old_index) = keyed.get(key) {
                    let old = &old_children[old_index];
                    if !taken[old_index] && old.kind().same_type(child.kind()) {
                        matched[index] = Some(old_index);
                        taken[old_index] = true;
                    }
                }
            }
            None => {
                // Same position first, then the first unkeyed leftover of
                // the same type further right.
                let positional = old_children.get(index).filter(|old| {
                    !taken[index] && old.key().is_none() && old.kind().same_type(child.kind())
                });
                if positional.is_some() {
                    matched[index] = Some(index);
                    taken[index] = true;
                    continue;
                }
                for old_index in index + 1..old_children.len() {
                    let old = &old_children[old_index];
                    if !taken[old_index]
                        && old.key().is_none()
                        && old.kind().same_type(child.kind())
                    {
                        matched[index] = Some(old_index);
                        taken[old_index] = true;
                        break;
                    }
                }
            }
        }
    }

    matched
}

/// Moves the contiguous document range owned by `child` before
/// `reference` within `parent_dom`.
fn move_dom_range(
    engine: &Engine,
    parent_dom: NodeId,
    child: &VNode,
    reference: Option<NodeId>,
) -> Result<(), DomError> {
    let (Some(first), Some(last)) = (child.first_dom(), child.last_dom()) else {
        return Ok(());
    };
    let mut range = vec![first];
    let mut node = first;
    while node != last {
        match engine.dom().next_sibling(node) {
            Some(next) => {
                range.push(next);
                node = next;
            }
            None => {
                log::error!("document range ended before its last node; partial move");
                break;
            }
        }
    }
    for node in range {
        engine.dom().insert_before(parent_dom, node, reference)?;
    }
    Ok(())
}
