//! Headless harness for exercising arbor trees.
//!
//! [`TestRig`] owns an engine wired to an in-memory document and a
//! recording scheduler, and exposes helpers for driving the microtask
//! drain and frame callbacks to idle without a windowing or browser
//! backend.

use std::cell::{Cell, RefMut};
use std::rc::Rc;

use arbor_core::dom::{ConcreteDomHost, DomTree, Event, MemoryDom, NodeId};
use arbor_core::platform::HostScheduler;
use arbor_core::{Engine, VNode};

#[cfg(test)]
mod tests;

/// Scheduler that records how often the engine signalled the host.
#[derive(Default)]
pub struct RecordingScheduler {
    flush_requests: Cell<usize>,
    frame_requests: Cell<usize>,
}

impl RecordingScheduler {
    pub fn flush_requests(&self) -> usize {
        self.flush_requests.get()
    }

    pub fn frame_requests(&self) -> usize {
        self.frame_requests.get()
    }
}

impl HostScheduler for RecordingScheduler {
    fn schedule_flush(&self) {
        self.flush_requests.set(self.flush_requests.get() + 1);
    }

    fn request_frame(&self) {
        self.frame_requests.set(self.frame_requests.get() + 1);
    }
}

/// Engine plus in-memory document, driven by hand.
pub struct TestRig {
    host: Rc<ConcreteDomHost<MemoryDom>>,
    scheduler: Rc<RecordingScheduler>,
    engine: Engine,
    container: NodeId,
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRig {
    pub fn new() -> Self {
        let host = Rc::new(ConcreteDomHost::new(MemoryDom::new()));
        let container = host.borrow_typed().create_container("div");
        let scheduler = Rc::new(RecordingScheduler::default());
        let engine = Engine::new(host.clone(), scheduler.clone());
        Self {
            host,
            scheduler,
            engine,
            container,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn scheduler(&self) -> &RecordingScheduler {
        &self.scheduler
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Direct access to the in-memory document.
    pub fn dom(&self) -> RefMut<'_, MemoryDom> {
        self.host.borrow_typed()
    }

    pub fn render(&self, vnode: VNode) {
        self.engine
            .render(Some(vnode), self.container)
            .expect("render failed");
    }

    pub fn unmount(&self) {
        self.engine
            .render(None, self.container)
            .expect("unmount failed");
    }

    /// Runs the queued re-renders, as the host's microtask would.
    pub fn flush(&self) {
        self.engine.flush().expect("flush failed");
    }

    /// Runs post-paint effects, as the host's frame callback would.
    pub fn advance_frame(&self) {
        self.engine.run_frame();
    }

    /// Drives renders and effects until the engine is idle.
    pub fn pump_until_idle(&self) {
        let mut spins = 0;
        loop {
            let mut progressed = false;
            if self.engine.has_pending_renders() {
                self.flush();
                progressed = true;
            }
            if self.engine.has_pending_effects() {
                self.advance_frame();
                progressed = true;
            }
            if !progressed {
                break;
            }
            spins += 1;
            assert!(spins < 100, "pump_until_idle looped too many times");
        }
    }

    /// Dispatches an event on `node` with the document borrow released,
    /// so handlers may read it.
    pub fn dispatch(&self, node: NodeId, event: &str) -> bool {
        let proxy = self.host.borrow_typed().listener(node, event);
        match proxy {
            Some(proxy) => {
                proxy(&Event::new(event.to_owned(), node));
                true
            }
            None => false,
        }
    }

    /// Click on `node`, then drive everything that follows to idle.
    pub fn click(&self, node: NodeId) {
        self.dispatch(node, "click");
        self.pump_until_idle();
    }

    pub fn text(&self) -> String {
        self.dom().text_content(self.container)
    }

    pub fn html(&self) -> String {
        self.dom().to_html(self.container)
    }

    pub fn top_children(&self) -> Vec<NodeId> {
        self.dom().child_ids(self.container)
    }

    /// First element in render order matching `tag` under the container.
    pub fn find_tag(&self, tag: &str) -> Option<NodeId> {
        fn walk(dom: &MemoryDom, node: NodeId, tag: &str) -> Option<NodeId> {
            if dom.tag_of(node).as_deref() == Some(tag) {
                return Some(node);
            }
            for child in dom.child_ids(node) {
                if let Some(found) = walk(dom, child, tag) {
                    return Some(found);
                }
            }
            None
        }
        let dom = self.dom();
        dom.child_ids(self.container)
            .into_iter()
            .find_map(|child| walk(&dom, child, tag))
    }
}
