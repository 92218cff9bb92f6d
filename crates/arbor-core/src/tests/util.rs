use std::rc::Rc;

use crate::dom::{ConcreteDomHost, DomTree, MemoryDom, NodeId};
use crate::platform::ManualScheduler;
use crate::vnode::VNode;
use crate::Engine;

/// Engine plus in-memory document, driven by hand.
pub(crate) struct TestBed {
    pub host: Rc<ConcreteDomHost<MemoryDom>>,
    pub engine: Engine,
    pub container: NodeId,
}

pub(crate) fn bed() -> TestBed {
    let _ = env_logger::builder().is_test(true).try_init();
    let host = Rc::new(ConcreteDomHost::new(MemoryDom::new()));
    let container = host.borrow_typed().create_container("div");
    let engine = Engine::new(host.clone(), Rc::new(ManualScheduler));
    TestBed {
        host,
        engine,
        container,
    }
}

impl TestBed {
    pub fn render(&self, vnode: VNode) {
        self.engine.render(Some(vnode), self.container).unwrap();
    }

    pub fn unmount_all(&self) {
        self.engine.render(None, self.container).unwrap();
    }

    /// Drains renders and frame effects until nothing is pending.
    pub fn pump(&self) {
        let mut spins = 0;
        loop {
            let mut progressed = false;
            if self.engine.has_pending_renders() {
                self.engine.flush().unwrap();
                progressed = true;
            }
            if self.engine.has_pending_effects() {
                self.engine.run_frame();
                progressed = true;
            }
            if !progressed {
                break;
            }
            spins += 1;
            assert!(spins < 100, "pump looped too many times");
        }
    }

    pub fn html(&self) -> String {
        self.host.borrow_typed().to_html(self.container)
    }

    pub fn text(&self) -> String {
        self.host.borrow_typed().text_content(self.container)
    }

    pub fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.host.borrow_typed().child_ids(node)
    }

    pub fn top_children(&self) -> Vec<NodeId> {
        self.children_of(self.container)
    }

    pub fn dispatch(&self, node: NodeId, event: &str) -> bool {
        let proxy = self.host.borrow_typed().listener(node, event);
        match proxy {
            Some(proxy) => {
                proxy(&crate::dom::Event::new(event.to_owned(), node));
                true
            }
            None => false,
        }
    }
}
