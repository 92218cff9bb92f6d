//! The virtual node: unit of description and carrier of reconciliation
//! state.
//!
//! A `VNode` is a cheap clone over an `Rc` core. The user-visible fields
//! (`kind`, `props`, `key`, ref destination) are fixed at construction;
//! the reconciliation slots (`dom`, normalized `children`, `component`,
//! `parent`, `depth`, `index`) belong to the engine and are only written
//! while the owning parent is being diffed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::component::{ComponentFn, ComponentInstance};
use crate::dom::NodeId;
use crate::frame;
use crate::props::{Props, RefSlot};

/// Identifier matching a child against a previous sibling.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Text(Rc<str>),
    Index(i64),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value.into())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Index(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Index(value.into())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Index(value as i64)
    }
}

/// What a vnode describes.
#[derive(Clone)]
pub enum NodeKind {
    /// Character data; the payload mirrors the live node's value.
    Text(Rc<str>),
    /// Intrinsic element with a tag name.
    Element(Rc<str>),
    /// Function component.
    Component(ComponentFn),
    /// Grouping node: renders its children, owns no document node.
    Fragment,
    /// Children render into `container` instead of the structural parent.
    Portal { container: NodeId },
}

impl NodeKind {
    /// Reconciliation type identity: two vnodes may share a previous
    /// node's state only when their kinds match.
    pub fn same_type(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Text(_), NodeKind::Text(_)) => true,
            (NodeKind::Element(a), NodeKind::Element(b)) => a == b,
            (NodeKind::Component(a), NodeKind::Component(b)) => a.same_component(b),
            (NodeKind::Fragment, NodeKind::Fragment) => true,
            (NodeKind::Portal { .. }, NodeKind::Portal { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Text(s) => write!(f, "Text({s:?})"),
            NodeKind::Element(tag) => write!(f, "Element(<{tag}>)"),
            NodeKind::Component(c) => write!(f, "Component({})", c.name()),
            NodeKind::Fragment => f.write_str("Fragment"),
            NodeKind::Portal { container } => write!(f, "Portal(-> {container})"),
        }
    }
}

/// Raw child payload accepted by the factories.
pub enum Child {
    Empty,
    Node(VNode),
    Text(Rc<str>),
    Number(f64),
    Many(Vec<Child>),
}

impl From<VNode> for Child {
    fn from(value: VNode) -> Self {
        Child::Node(value)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value.into())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Number(value.into())
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Number(value as f64)
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Number(value)
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

/// Booleans render nothing, so `cond.then(..)` toggles a child.
impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Child::Empty
    }
}

impl<C: Into<Child>> From<Option<C>> for Child {
    fn from(value: Option<C>) -> Self {
        match value {
            Some(c) => c.into(),
            None => Child::Empty,
        }
    }
}

impl<C: Into<Child>> From<Vec<C>> for Child {
    fn from(value: Vec<C>) -> Self {
        Child::Many(value.into_iter().map(Into::into).collect())
    }
}

macro_rules! child_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Child>),+> From<($($name,)+)> for Child {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Child::Many(vec![$($name.into()),+])
            }
        }
    };
}

child_tuple!(A, B);
child_tuple!(A, B, C);
child_tuple!(A, B, C, D);
child_tuple!(A, B, C, D, E);
child_tuple!(A, B, C, D, E, F);
child_tuple!(A, B, C, D, E, F, G);
child_tuple!(A, B, C, D, E, F, G, H);

/// One flattened child kept by the factory: nulls and booleans are gone,
/// nested sequences are spliced, strings and numbers stay raw until the
/// reconciler turns them into text vnodes.
#[derive(Clone, Debug)]
pub enum ChildUnit {
    Node(VNode),
    Text(Rc<str>),
    Number(f64),
}

/// Normalized child payload stored on props.
#[derive(Clone, Debug, Default)]
pub enum Children {
    #[default]
    None,
    One(Box<ChildUnit>),
    Many(Vec<ChildUnit>),
}

impl Children {
    pub fn from_child(child: Child) -> Self {
        let mut flat: SmallVec<[ChildUnit; 8]> = SmallVec::new();
        flatten_into(child, &mut flat);
        match flat.len() {
            0 => Children::None,
            1 => Children::One(Box::new(flat.into_iter().next().unwrap())),
            _ => Children::Many(flat.into_vec()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Children::None)
    }

    pub fn units(&self) -> impl Iterator<Item = &ChildUnit> {
        let slice: &[ChildUnit] = match self {
            Children::None => &[],
            Children::One(unit) => std::slice::from_ref(&**unit),
            Children::Many(units) => units,
        };
        slice.iter()
    }

    /// Back to a raw child value; used by pass-through renders.
    pub fn to_child(&self) -> Child {
        fn unit_to_child(unit: &ChildUnit) -> Child {
            match unit {
                ChildUnit::Node(v) => Child::Node(v.clone()),
                ChildUnit::Text(s) => Child::Text(Rc::clone(s)),
                ChildUnit::Number(n) => Child::Number(*n),
            }
        }
        match self {
            Children::None => Child::Empty,
            Children::One(unit) => unit_to_child(unit),
            Children::Many(units) => Child::Many(units.iter().map(unit_to_child).collect()),
        }
    }
}

fn flatten_into(child: Child, out: &mut SmallVec<[ChildUnit; 8]>) {
    match child {
        Child::Empty => {}
        Child::Node(v) => out.push(ChildUnit::Node(v)),
        Child::Text(s) => out.push(ChildUnit::Text(s)),
        Child::Number(n) => out.push(ChildUnit::Number(n)),
        Child::Many(children) => {
            for c in children {
                flatten_into(c, out);
            }
        }
    }
}

pub(crate) struct VNodeCore {
    pub(crate) kind: NodeKind,
    pub(crate) props: Props,
    pub(crate) key: Option<Key>,
    pub(crate) slot_ref: Option<RefSlot>,

    // Reconciliation slots; engine-owned.
    pub(crate) dom: Cell<Option<NodeId>>,
    pub(crate) children: RefCell<Vec<VNode>>,
    pub(crate) component: RefCell<Option<ComponentInstance>>,
    pub(crate) parent: RefCell<Option<Weak<VNodeCore>>>,
    pub(crate) depth: Cell<u32>,
    pub(crate) index: Cell<usize>,
}

#[derive(Clone)]
pub struct VNode {
    pub(crate) core: Rc<VNodeCore>,
}

impl VNode {
    pub(crate) fn new(kind: NodeKind, mut props: Props) -> Self {
        let key = props.take_key();
        let slot_ref = props.take_ref();
        let vnode = Self {
            core: Rc::new(VNodeCore {
                kind,
                props,
                key,
                slot_ref,
                dom: Cell::new(None),
                children: RefCell::new(Vec::new()),
                component: RefCell::new(None),
                parent: RefCell::new(None),
                depth: Cell::new(0),
                index: Cell::new(0),
            }),
        };
        frame::with_engine_opt(|engine| engine.announce_vnode(&vnode));
        vnode
    }

    pub fn kind(&self) -> &NodeKind {
        &self.core.kind
    }

    pub fn props(&self) -> &Props {
        &self.core.props
    }

    pub fn key(&self) -> Option<&Key> {
        self.core.key.as_ref()
    }

    pub fn slot_ref(&self) -> Option<&RefSlot> {
        self.core.slot_ref.as_ref()
    }

    /// The live node this vnode currently owns, if any. Components,
    /// fragments, and portals own none.
    pub fn dom(&self) -> Option<NodeId> {
        self.core.dom.get()
    }

    pub fn depth(&self) -> u32 {
        self.core.depth.get()
    }

    pub fn component(&self) -> Option<ComponentInstance> {
        self.core.component.borrow().clone()
    }

    pub(crate) fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn downgrade(&self) -> Weak<VNodeCore> {
        Rc::downgrade(&self.core)
    }

    pub(crate) fn set_parent(&self, parent: &VNode) {
        *self.core.parent.borrow_mut() = Some(parent.downgrade());
    }

    pub(crate) fn parent(&self) -> Option<VNode> {
        self.core
            .parent
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|core| VNode { core })
    }

    /// First document node owned by this subtree, in render order.
    /// Portals contribute nothing to their structural parent.
    pub(crate) fn first_dom(&self) -> Option<NodeId> {
        match &self.core.kind {
            NodeKind::Text(_) | NodeKind::Element(_) => self.core.dom.get(),
            NodeKind::Portal { .. } => None,
            NodeKind::Component(_) | NodeKind::Fragment => self
                .core
                .children
                .borrow()
                .iter()
                .find_map(|child| child.first_dom()),
        }
    }

    /// Last document node owned by this subtree, in render order.
    pub(crate) fn last_dom(&self) -> Option<NodeId> {
        match &self.core.kind {
            NodeKind::Text(_) | NodeKind::Element(_) => self.core.dom.get(),
            NodeKind::Portal { .. } => None,
            NodeKind::Component(_) | NodeKind::Fragment => self
                .core
                .children
                .borrow()
                .iter()
                .rev()
                .find_map(|child| child.last_dom()),
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("kind", &self.core.kind)
            .field("key", &self.core.key)
            .field("dom", &self.core.dom.get())
            .field("depth", &self.core.depth.get())
            .finish()
    }
}

/// Text node factory.
pub fn text(value: impl Into<Rc<str>>) -> VNode {
    VNode::new(NodeKind::Text(value.into()), Props::new())
}

/// Intrinsic element factory.
pub fn el(tag: impl Into<Rc<str>>, props: Props, children: impl Into<Child>) -> VNode {
    let mut props = props;
    props.set_children(Children::from_child(children.into()));
    VNode::new(NodeKind::Element(tag.into()), props)
}

/// Grouping factory: renders `children` without an element of its own.
pub fn fragment(children: impl Into<Child>) -> VNode {
    let mut props = Props::new();
    props.set_children(Children::from_child(children.into()));
    VNode::new(NodeKind::Fragment, props)
}

/// Keyed grouping, for fragment children of keyed lists.
pub fn keyed_fragment(key: impl Into<Key>, children: impl Into<Child>) -> VNode {
    let mut props = Props::new().key(key);
    props.set_children(Children::from_child(children.into()));
    VNode::new(NodeKind::Fragment, props)
}
