//! The consumed surface of the host document tree.
//!
//! The engine never owns a document; it mutates one through [`DomTree`].
//! Hosts register a single proxy closure per (element, event name) and
//! route dispatches back through it; swapping the user handler afterwards
//! never touches the host's listener table.

use std::any::Any;
use std::cell::RefMut;
use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

pub mod memory;

pub use memory::MemoryDom;

/// Handle to a node owned by the host document.
pub type NodeId = usize;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("node {id} missing")]
    Missing { id: NodeId },
    #[error("node {id} is not an element")]
    NotAnElement { id: NodeId },
    #[error("node {id} cannot host children")]
    BadContainer { id: NodeId },
}

/// Document namespace a subtree is created in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
}

impl Namespace {
    pub fn uri(self) -> Option<&'static str> {
        match self {
            Namespace::Html => None,
            Namespace::Svg => Some("http://www.w3.org/2000/svg"),
        }
    }
}

/// An event delivered to a delegated listener.
#[derive(Clone)]
pub struct Event {
    name: Rc<str>,
    target: NodeId,
    detail: Option<Rc<dyn Any>>,
}

impl Event {
    pub fn new(name: impl Into<Rc<str>>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Rc<dyn Any>) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn detail<T: 'static>(&self) -> Option<&T> {
        self.detail.as_ref().and_then(|d| d.downcast_ref())
    }
}

/// The shared dispatch closure registered with the host for one
/// (element, event name) pair.
pub type ListenerProxy = Rc<dyn Fn(&Event)>;

/// Mutating node API of the host document.
///
/// Every operation is fallible from the engine's point of view; a host
/// refusing an operation on a node the engine believes to be live is a
/// structural anomaly and surfaces as a [`DomError`].
pub trait DomTree: 'static {
    fn create_element(&mut self, tag: &str, ns: Namespace) -> NodeId;
    fn create_text(&mut self, value: &str) -> NodeId;

    /// Inserts `node` into `parent` before `before`, appending when
    /// `before` is `None`. A node already attached elsewhere is moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), DomError>;

    /// Detaches `node` from its parent and releases the subtree.
    fn remove(&mut self, node: NodeId) -> Result<(), DomError>;

    fn set_node_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError>;

    /// Direct property assignment; used for form-control state (`value`,
    /// `checked`) that must not round-trip through attributes.
    fn set_property(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    fn set_style_text(&mut self, node: NodeId, css: &str) -> Result<(), DomError>;
    fn set_style_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DomError>;
    fn remove_style_property(&mut self, node: NodeId, name: &str) -> Result<(), DomError>;

    fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<(), DomError>;

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        proxy: ListenerProxy,
    ) -> Result<(), DomError>;
    fn remove_listener(&mut self, node: NodeId, event: &str) -> Result<(), DomError>;

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn namespace(&self, node: NodeId) -> Namespace;
    fn is_element(&self, node: NodeId) -> bool;

    /// Concatenated text payload of the subtree; read-back for callers and
    /// tests.
    fn text_content(&self, node: NodeId) -> String;
    fn node_value(&self, node: NodeId) -> Option<String>;
}

/// Shared ownership of a host document with interior mutability.
///
/// The engine borrows the tree for the duration of single operations only,
/// never across user code, so event handlers are free to re-enter.
pub trait DomHost {
    fn borrow_dyn(&self) -> RefMut<'_, dyn DomTree>;
}

pub struct ConcreteDomHost<D: DomTree> {
    inner: RefCell<D>,
}

impl<D: DomTree> ConcreteDomHost<D> {
    pub fn new(tree: D) -> Self {
        Self {
            inner: RefCell::new(tree),
        }
    }

    pub fn borrow_typed(&self) -> RefMut<'_, D> {
        self.inner.borrow_mut()
    }

    pub fn into_inner(self) -> D {
        self.inner.into_inner()
    }
}

impl<D: DomTree> DomHost for ConcreteDomHost<D> {
    fn borrow_dyn(&self) -> RefMut<'_, dyn DomTree> {
        RefMut::map(self.inner.borrow_mut(), |tree| tree as &mut dyn DomTree)
    }
}
