//! Engine assembly and the depth-ordered render queue.
//!
//! One `Engine` owns everything process-wide the renderer needs: the host
//! document handle, the options registry, the delegated-listener table,
//! the per-container root cache, and the two pending queues (re-renders
//! and post-paint effects). Everything is single-threaded; the core is
//! explicitly `!Send`.

use std::cell::{Cell, RefCell, RefMut};
use std::marker::PhantomData;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::component::ComponentInstance;
use crate::diff;
use crate::dom::{DomError, DomHost, DomTree, Event, ListenerProxy, NodeId};
use crate::frame;
use crate::hooks;
use crate::options::Options;
use crate::platform::HostScheduler;
use crate::props::EventHandler;
use crate::vnode::VNode;

pub(crate) struct EngineCore {
    pub(crate) dom: Rc<dyn DomHost>,
    pub(crate) scheduler: Rc<dyn HostScheduler>,
    pub(crate) options: Options,

    render_queue: RefCell<Vec<ComponentInstance>>,
    flush_scheduled: Cell<bool>,
    flushing: Cell<bool>,

    /// Current handler per (element, event name). The host sees one proxy
    /// per entry; handler swaps only mutate this table.
    listeners: RefCell<FxHashMap<(NodeId, Rc<str>), EventHandler>>,

    /// Previous root vnode per container.
    roots: RefCell<FxHashMap<NodeId, VNode>>,

    /// Components with effects awaiting the next frame.
    pending_frame: RefCell<Vec<ComponentInstance>>,
    frame_requested: Cell<bool>,

    next_id: Cell<u64>,

    _not_send: PhantomData<*const ()>,
}

#[derive(Clone)]
pub struct Engine {
    pub(crate) core: Rc<EngineCore>,
}

impl Engine {
    pub fn new(dom: Rc<dyn DomHost>, scheduler: Rc<dyn HostScheduler>) -> Self {
        Self {
            core: Rc::new(EngineCore {
                dom,
                scheduler,
                options: Options::default(),
                render_queue: RefCell::new(Vec::new()),
                flush_scheduled: Cell::new(false),
                flushing: Cell::new(false),
                listeners: RefCell::new(FxHashMap::default()),
                roots: RefCell::new(FxHashMap::default()),
                pending_frame: RefCell::new(Vec::new()),
                frame_requested: Cell::new(false),
                next_id: Cell::new(0),
                _not_send: PhantomData,
            }),
        }
    }

    pub(crate) fn from_core(core: Rc<EngineCore>) -> Self {
        Self { core }
    }

    pub(crate) fn clone_core(&self) -> Rc<EngineCore> {
        Rc::clone(&self.core)
    }

    pub fn options(&self) -> &Options {
        &self.core.options
    }

    pub(crate) fn dom(&self) -> RefMut<'_, dyn DomTree> {
        self.core.dom.borrow_dyn()
    }

    pub(crate) fn announce_vnode(&self, vnode: &VNode) {
        self.core.options.fire_vnode_created(vnode);
    }

    // ── Scheduler ─────────────────────────────────────────────────────

    /// Queues a component for re-render; a no-op when it is already
    /// queued. Signals the host once per batch.
    pub(crate) fn enqueue(&self, instance: &ComponentInstance) {
        if instance.core.queued.replace(true) {
            return;
        }
        self.core
            .render_queue
            .borrow_mut()
            .push(instance.clone());
        if !self.core.flush_scheduled.replace(true) {
            self.core.scheduler.schedule_flush();
        }
    }

    /// Drops a queued entry; used when a tree diff reaches the component
    /// through its parent, making the queued re-render redundant.
    pub(crate) fn dequeue(&self, instance: &ComponentInstance) {
        if !instance.core.queued.replace(false) {
            return;
        }
        self.core
            .render_queue
            .borrow_mut()
            .retain(|queued| !queued.ptr_eq(instance));
    }

    /// Drains the render queue: shallowest components first, ties in
    /// insertion order. Components unmounted by an earlier re-render in
    /// the same drain are skipped.
    pub fn flush(&self) -> Result<(), DomError> {
        self.core.flush_scheduled.set(false);
        if self.core.flushing.replace(true) {
            log::warn!("re-entrant flush ignored");
            return Ok(());
        }
        // Unwinding out of a component body must release the latch.
        struct FlushGuard<'a>(&'a Cell<bool>);
        impl Drop for FlushGuard<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _flush_guard = FlushGuard(&self.core.flushing);
        let _engine_guard = frame::enter_engine(self);
        self.flush_inner()
    }

    fn flush_inner(&self) -> Result<(), DomError> {
        loop {
            let mut batch: Vec<ComponentInstance> = {
                let mut queue = self.core.render_queue.borrow_mut();
                if queue.is_empty() {
                    return Ok(());
                }
                queue.drain(..).collect()
            };
            batch.sort_by_key(ComponentInstance::depth);
            for instance in batch {
                instance.core.queued.set(false);
                if !instance.is_mounted() {
                    continue;
                }
                diff::rerender_instance(self, &instance)?;
            }
        }
    }

    /// Whether a drain is pending; lets hosts poll instead of scheduling.
    pub fn has_pending_renders(&self) -> bool {
        !self.core.render_queue.borrow().is_empty()
    }

    // ── Post-paint effects ────────────────────────────────────────────

    pub(crate) fn queue_post_effects(&self, instances: &[ComponentInstance]) {
        let mut pending = self.core.pending_frame.borrow_mut();
        for instance in instances {
            if !instance.core.pending_effects.borrow().is_empty() {
                pending.push(instance.clone());
            }
        }
        let any = !pending.is_empty();
        drop(pending);
        if any && !self.core.frame_requested.replace(true) {
            self.core.scheduler.request_frame();
        }
    }

    /// Runs effects deferred to after paint. The host calls this from its
    /// frame callback (or fallback timer).
    pub fn run_frame(&self) {
        self.core.frame_requested.set(false);
        let _engine_guard = frame::enter_engine(self);
        loop {
            let batch: Vec<ComponentInstance> = {
                let mut pending = self.core.pending_frame.borrow_mut();
                if pending.is_empty() {
                    return;
                }
                pending.drain(..).collect()
            };
            for instance in batch {
                if !instance.is_mounted() {
                    continue;
                }
                let indices = std::mem::take(&mut *instance.core.pending_effects.borrow_mut());
                for index in indices {
                    hooks::run_effect_slot(&instance, index);
                }
            }
        }
    }

    pub fn has_pending_effects(&self) -> bool {
        !self.core.pending_frame.borrow().is_empty()
    }

    // ── Delegated listeners ───────────────────────────────────────────

    /// Installs or swaps the handler for (node, event). The host proxy is
    /// registered exactly once, when the entry first appears.
    pub(crate) fn set_event_handler(
        &self,
        node: NodeId,
        event: Rc<str>,
        handler: EventHandler,
    ) -> Result<(), DomError> {
        let first = {
            let mut listeners = self.core.listeners.borrow_mut();
            listeners
                .insert((node, Rc::clone(&event)), handler)
                .is_none()
        };
        if first {
            let weak = Rc::downgrade(&self.core);
            let proxy_event = Rc::clone(&event);
            let proxy: ListenerProxy = Rc::new(move |dispatched: &Event| {
                let Some(core) = weak.upgrade() else {
                    return;
                };
                let engine = Engine::from_core(core);
                let handler = engine
                    .core
                    .listeners
                    .borrow()
                    .get(&(node, Rc::clone(&proxy_event)))
                    .cloned();
                if let Some(handler) = handler {
                    let _engine_guard = frame::enter_engine(&engine);
                    handler.call(dispatched);
                }
            });
            self.dom().add_listener(node, &event, proxy)?;
        }
        Ok(())
    }

    /// Detaches the proxy and clears the table entry.
    pub(crate) fn remove_event_handler(&self, node: NodeId, event: &str) -> Result<(), DomError> {
        let removed = {
            let mut listeners = self.core.listeners.borrow_mut();
            let key = (node, Rc::from(event));
            listeners.remove(&key).is_some()
        };
        if removed {
            self.dom().remove_listener(node, event)?;
        }
        Ok(())
    }

    /// Clears table entries for a node being destroyed; the host forgets
    /// the proxies together with the node.
    pub(crate) fn purge_listeners(&self, node: NodeId) {
        self.core
            .listeners
            .borrow_mut()
            .retain(|(owner, _), _| *owner != node);
    }

    // ── Root cache ────────────────────────────────────────────────────

    pub(crate) fn take_root(&self, container: NodeId) -> Option<VNode> {
        self.core.roots.borrow_mut().remove(&container)
    }

    pub(crate) fn store_root(&self, container: NodeId, root: VNode) {
        self.core.roots.borrow_mut().insert(container, root);
    }

    // ── Identifiers ───────────────────────────────────────────────────

    pub(crate) fn next_unique_id(&self) -> Rc<str> {
        let n = self.core.next_id.get();
        self.core.next_id.set(n + 1);
        format!("a-{n}").into()
    }
}
