//! Function components and their per-instance state.
//!
//! A component's reconciliation identity is the type of its render
//! function. Plain `fn` items each have a unique zero-sized type, so
//! `component(counter, ..)` produces the same identity on every render
//! while two different functions never match. (A capturing closure shares
//! one identity across all captures of the same call site; define
//! components as `fn` items.)

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::context::{ContextId, ProviderState};
use crate::engine::EngineCore;
use crate::hooks::HookList;
use crate::props::Props;
use crate::vnode::{Child, Children, NodeKind, VNode, VNodeCore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ComponentId {
    Render(TypeId),
    Provider(ContextId),
}

/// A reconcilable render function.
#[derive(Clone)]
pub struct ComponentFn {
    name: &'static str,
    id: ComponentId,
    render: Rc<dyn Fn(&Props) -> VNode>,
    provides: Option<ContextId>,
}

impl ComponentFn {
    pub(crate) fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Props) -> VNode + 'static,
    {
        Self {
            name: std::any::type_name::<F>(),
            id: ComponentId::Render(TypeId::of::<F>()),
            render: Rc::new(f),
            provides: None,
        }
    }

    pub(crate) fn provider(
        context: ContextId,
        render: Rc<dyn Fn(&Props) -> VNode>,
    ) -> Self {
        Self {
            name: "Provider",
            id: ComponentId::Provider(context),
            render,
            provides: Some(context),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn provides(&self) -> Option<ContextId> {
        self.provides
    }

    pub(crate) fn render(&self, props: &Props) -> VNode {
        (self.render)(props)
    }

    pub fn same_component(&self, other: &ComponentFn) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ComponentFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentFn({})", self.name)
    }
}

/// Component vnode factory.
pub fn component<F>(f: F, props: Props, children: impl Into<Child>) -> VNode
where
    F: Fn(&Props) -> VNode + 'static,
{
    let mut props = props;
    props.set_children(Children::from_child(children.into()));
    VNode::new(NodeKind::Component(ComponentFn::from_fn(f)), props)
}

pub(crate) struct InstanceCore {
    pub(crate) engine: Weak<EngineCore>,
    /// Current vnode; cleared on unmount, which is the signal the
    /// scheduler uses to skip stale queue entries.
    pub(crate) vnode: RefCell<Option<Weak<VNodeCore>>>,
    pub(crate) props: RefCell<Props>,
    pub(crate) hooks: RefCell<HookList>,
    /// Indices of hook slots whose effects became pending this render.
    pub(crate) pending_effects: RefCell<SmallVec<[usize; 4]>>,
    pub(crate) pending_layout_effects: RefCell<SmallVec<[usize; 4]>>,
    /// Providers this instance currently reads from.
    pub(crate) subscriptions: RefCell<Vec<Rc<ProviderState>>>,
    /// Present when this instance is itself a provider.
    pub(crate) provider: RefCell<Option<Rc<ProviderState>>>,
    pub(crate) depth: Cell<u32>,
    pub(crate) queued: Cell<bool>,
}

/// Shared handle to the per-instance hook store.
#[derive(Clone)]
pub struct ComponentInstance {
    pub(crate) core: Rc<InstanceCore>,
}

impl ComponentInstance {
    pub(crate) fn new(engine: Weak<EngineCore>, props: Props) -> Self {
        Self {
            core: Rc::new(InstanceCore {
                engine,
                vnode: RefCell::new(None),
                props: RefCell::new(props),
                hooks: RefCell::new(HookList::default()),
                pending_effects: RefCell::new(SmallVec::new()),
                pending_layout_effects: RefCell::new(SmallVec::new()),
                subscriptions: RefCell::new(Vec::new()),
                provider: RefCell::new(None),
                depth: Cell::new(0),
                queued: Cell::new(false),
            }),
        }
    }

    pub(crate) fn ptr_eq(&self, other: &ComponentInstance) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn attach(&self, vnode: &VNode) {
        *self.core.vnode.borrow_mut() = Some(vnode.downgrade());
        self.core.depth.set(vnode.depth());
    }

    pub(crate) fn detach(&self) {
        self.core.vnode.borrow_mut().take();
    }

    /// The current vnode, while mounted.
    pub fn vnode(&self) -> Option<VNode> {
        self.core
            .vnode
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|core| VNode { core })
    }

    pub fn is_mounted(&self) -> bool {
        self.vnode().is_some()
    }

    pub fn depth(&self) -> u32 {
        self.core.depth.get()
    }

    pub(crate) fn has_pending_effects(&self) -> bool {
        !self.core.pending_effects.borrow().is_empty()
            || !self.core.pending_layout_effects.borrow().is_empty()
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("depth", &self.core.depth.get())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
