//! Observer hooks for tooling.
//!
//! A registry of optional callbacks consulted at fixed points of the
//! render cycle. The engine has no knowledge of its observers beyond
//! calling them; dev-tools and hot-reload adapters install what they
//! need. Each engine owns its registry, so tests get isolation for free.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::ComponentInstance;
use crate::dom::NodeId;
use crate::vnode::VNode;

type NodeHook = Rc<dyn Fn(&VNode)>;
type CommitHook = Rc<dyn Fn(&VNode, &[ComponentInstance])>;
type RootHook = Rc<dyn Fn(&VNode, NodeId)>;

#[derive(Default)]
pub struct Options {
    /// A vnode was constructed by a factory.
    vnode_created: RefCell<Option<NodeHook>>,
    /// A node diff is beginning.
    diff_started: RefCell<Option<NodeHook>>,
    /// A component body is about to be invoked.
    before_render: RefCell<Option<NodeHook>>,
    /// A node diff finished.
    diff_ended: RefCell<Option<NodeHook>>,
    /// A render entry finished; receives the root and the commit queue.
    committed: RefCell<Option<CommitHook>>,
    /// A vnode is about to be torn down.
    unmounted: RefCell<Option<NodeHook>>,
    /// A render entry is starting on a container.
    root_entered: RefCell<Option<RootHook>>,
}

impl Options {
    pub fn set_vnode_created(&self, hook: impl Fn(&VNode) + 'static) {
        *self.vnode_created.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn set_diff_started(&self, hook: impl Fn(&VNode) + 'static) {
        *self.diff_started.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn set_before_render(&self, hook: impl Fn(&VNode) + 'static) {
        *self.before_render.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn set_diff_ended(&self, hook: impl Fn(&VNode) + 'static) {
        *self.diff_ended.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn set_committed(&self, hook: impl Fn(&VNode, &[ComponentInstance]) + 'static) {
        *self.committed.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn set_unmounted(&self, hook: impl Fn(&VNode) + 'static) {
        *self.unmounted.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn set_root_entered(&self, hook: impl Fn(&VNode, NodeId) + 'static) {
        *self.root_entered.borrow_mut() = Some(Rc::new(hook));
    }

    // Firing helpers clone the callback out of the cell first; observers
    // are allowed to construct vnodes, which re-enters the registry.

    fn node_hook(cell: &RefCell<Option<NodeHook>>) -> Option<NodeHook> {
        cell.borrow().clone()
    }

    pub(crate) fn fire_vnode_created(&self, vnode: &VNode) {
        if let Some(hook) = Self::node_hook(&self.vnode_created) {
            hook(vnode);
        }
    }

    pub(crate) fn fire_diff_started(&self, vnode: &VNode) {
        if let Some(hook) = Self::node_hook(&self.diff_started) {
            hook(vnode);
        }
    }

    pub(crate) fn fire_before_render(&self, vnode: &VNode) {
        if let Some(hook) = Self::node_hook(&self.before_render) {
            hook(vnode);
        }
    }

    pub(crate) fn fire_diff_ended(&self, vnode: &VNode) {
        if let Some(hook) = Self::node_hook(&self.diff_ended) {
            hook(vnode);
        }
    }

    pub(crate) fn fire_committed(&self, root: &VNode, queue: &[ComponentInstance]) {
        let hook = self.committed.borrow().clone();
        if let Some(hook) = hook {
            hook(root, queue);
        }
    }

    pub(crate) fn fire_unmounted(&self, vnode: &VNode) {
        if let Some(hook) = Self::node_hook(&self.unmounted) {
            hook(vnode);
        }
    }

    pub(crate) fn fire_root_entered(&self, root: &VNode, container: NodeId) {
        let hook = self.root_entered.borrow().clone();
        if let Some(hook) = hook {
            hook(root, container);
        }
    }
}
