//! The post-diff commit: refs, layout effects, post-paint scheduling.
//!
//! Refs apply first, then layout effects run synchronously in commit
//! order — components enter the queue after their subtrees, so a parent's
//! effects run after its descendants'. Effects deferred to after paint
//! are handed to the engine, which asks the host for a frame callback.

use crate::component::ComponentInstance;
use crate::engine::Engine;
use crate::hooks;
use crate::props::{RefSlot, RefValue};
use crate::vnode::VNode;

/// One ref assignment decided during diff, applied at commit.
pub(crate) struct RefAction {
    pub(crate) previous: Option<RefSlot>,
    pub(crate) current: Option<RefSlot>,
    pub(crate) target: RefValue,
}

/// Work accumulated by one diff pass.
#[derive(Default)]
pub(crate) struct CommitBatch {
    /// Components whose render left pending effects, in completion order.
    pub(crate) commit_queue: Vec<ComponentInstance>,
    pub(crate) ref_queue: Vec<RefAction>,
}

pub(crate) fn commit(engine: &Engine, root: &VNode, mut batch: CommitBatch) {
    engine.options().fire_committed(root, &batch.commit_queue);

    for action in batch.ref_queue.drain(..) {
        let replaced = match (&action.previous, &action.current) {
            (Some(previous), Some(current)) => !previous.ptr_eq(current),
            (Some(_), None) => true,
            _ => false,
        };
        if replaced {
            if let Some(previous) = &action.previous {
                previous.apply(None);
            }
        }
        if let Some(current) = &action.current {
            current.apply(Some(action.target.clone()));
        }
    }

    for instance in &batch.commit_queue {
        let indices = std::mem::take(&mut *instance.core.pending_layout_effects.borrow_mut());
        for index in indices {
            hooks::run_effect_slot(instance, index);
        }
    }

    engine.queue_post_effects(&batch.commit_queue);
}
