//! In-memory reference implementation of [`DomTree`].
//!
//! Backs the unit tests and any headless embedding. Nodes live in a slab
//! of `Option` slots; removal frees the slot and, recursively, the
//! subtree's slots.

use std::rc::Rc;

use indexmap::IndexMap;
use log::warn;
use rustc_hash::FxHashMap;

use super::{DomError, DomTree, Event, ListenerProxy, Namespace, NodeId};

enum MemoryNodeKind {
    Element {
        tag: Rc<str>,
        ns: Namespace,
        attrs: IndexMap<Rc<str>, String>,
        props: FxHashMap<Rc<str>, String>,
        style_text: Option<String>,
        style_props: IndexMap<Rc<str>, String>,
        inner_html: Option<String>,
        listeners: FxHashMap<Rc<str>, ListenerProxy>,
        children: Vec<NodeId>,
    },
    Text {
        value: String,
    },
}

struct MemoryNode {
    kind: MemoryNodeKind,
    parent: Option<NodeId>,
}

#[derive(Default)]
pub struct MemoryDom {
    nodes: Vec<Option<MemoryNode>>,
    /// Count of host `add_listener`/`remove_listener` calls; lets tests
    /// assert that handler swaps never churn the listener table.
    listener_ops: usize,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element to serve as a render container.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        self.create_element(tag, Namespace::Html)
    }

    pub fn listener_ops(&self) -> usize {
        self.listener_ops
    }

    pub fn live_node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn child_ids(&self, node: NodeId) -> Vec<NodeId> {
        match self.node(node) {
            Some(MemoryNode {
                kind: MemoryNodeKind::Element { children, .. },
                ..
            }) => children.clone(),
            _ => Vec::new(),
        }
    }

    pub fn tag_of(&self, node: NodeId) -> Option<Rc<str>> {
        match self.node(node)? {
            MemoryNode {
                kind: MemoryNodeKind::Element { tag, .. },
                ..
            } => Some(Rc::clone(tag)),
            _ => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match self.node(node)? {
            MemoryNode {
                kind: MemoryNodeKind::Element { attrs, .. },
                ..
            } => attrs.get(name).cloned(),
            _ => None,
        }
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<String> {
        match self.node(node)? {
            MemoryNode {
                kind: MemoryNodeKind::Element { props, .. },
                ..
            } => props.get(name).cloned(),
            _ => None,
        }
    }

    pub fn style_property(&self, node: NodeId, name: &str) -> Option<String> {
        match self.node(node)? {
            MemoryNode {
                kind: MemoryNodeKind::Element { style_props, .. },
                ..
            } => style_props.get(name).cloned(),
            _ => None,
        }
    }

    pub fn style_text(&self, node: NodeId) -> Option<String> {
        match self.node(node)? {
            MemoryNode {
                kind: MemoryNodeKind::Element { style_text, .. },
                ..
            } => style_text.clone(),
            _ => None,
        }
    }

    pub fn has_listener(&self, node: NodeId, event: &str) -> bool {
        matches!(
            self.node(node),
            Some(MemoryNode {
                kind: MemoryNodeKind::Element { listeners, .. },
                ..
            }) if listeners.contains_key(event)
        )
    }

    /// The proxy registered for (node, event), if any. Callers driving
    /// events should fetch the proxy, release their document borrow, and
    /// then invoke it, so handlers are free to read the document.
    pub fn listener(&self, node: NodeId, event: &str) -> Option<ListenerProxy> {
        match self.node(node) {
            Some(MemoryNode {
                kind: MemoryNodeKind::Element { listeners, .. },
                ..
            }) => listeners.get(event).cloned(),
            _ => None,
        }
    }

    /// Dispatches an event on `node`. Returns whether a listener ran.
    /// Events do not bubble; delegation happens per element. The document
    /// stays borrowed while the handler runs; handlers that need to read
    /// it should go through [`MemoryDom::listener`] instead.
    pub fn dispatch(&self, node: NodeId, event: &str) -> bool {
        match self.listener(node, event) {
            Some(proxy) => {
                proxy(&Event::new(event.to_owned(), node));
                true
            }
            None => false,
        }
    }

    /// Markup rendering of a subtree, for assertions and debugging.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(&mut out, node);
        out
    }

    fn write_html(&self, out: &mut String, id: NodeId) {
        let node = match self.node(id) {
            Some(node) => node,
            None => {
                out.push_str("<!--missing-->");
                return;
            }
        };
        match &node.kind {
            MemoryNodeKind::Text { value } => out.push_str(value),
            MemoryNodeKind::Element {
                tag,
                attrs,
                style_text,
                style_props,
                inner_html,
                children,
                ..
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                let style = match style_text {
                    Some(text) => text.clone(),
                    None => style_props
                        .iter()
                        .map(|(k, v)| format!("{k}: {v};"))
                        .collect::<Vec<_>>()
                        .join(" "),
                };
                if !style.is_empty() {
                    out.push_str(" style=\"");
                    out.push_str(&style);
                    out.push('"');
                }
                out.push('>');
                match inner_html {
                    Some(html) => out.push_str(html),
                    None => {
                        for child in children {
                            self.write_html(out, *child);
                        }
                    }
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, DomError> {
        self.nodes
            .get_mut(id)
            .and_then(|slot| slot.as_mut())
            .ok_or(DomError::Missing { id })
    }

    fn element_mut(
        &mut self,
        id: NodeId,
    ) -> Result<(&mut IndexMap<Rc<str>, String>, &mut FxHashMap<Rc<str>, String>), DomError> {
        match &mut self.node_mut(id)?.kind {
            MemoryNodeKind::Element { attrs, props, .. } => Ok((attrs, props)),
            MemoryNodeKind::Text { .. } => Err(DomError::NotAnElement { id }),
        }
    }

    fn alloc(&mut self, node: MemoryNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        let parent = self.node_mut(node)?.parent.take();
        if let Some(parent) = parent {
            if let Ok(p) = self.node_mut(parent) {
                if let MemoryNodeKind::Element { children, .. } = &mut p.kind {
                    children.retain(|c| *c != node);
                }
            }
        }
        Ok(())
    }

    fn free(&mut self, node: NodeId) {
        let children = self.child_ids(node);
        for child in children {
            self.free(child);
        }
        if let Some(slot) = self.nodes.get_mut(node) {
            slot.take();
        }
    }
}

impl DomTree for MemoryDom {
    fn create_element(&mut self, tag: &str, ns: Namespace) -> NodeId {
        self.alloc(MemoryNode {
            kind: MemoryNodeKind::Element {
                tag: tag.into(),
                ns,
                attrs: IndexMap::new(),
                props: FxHashMap::default(),
                style_text: None,
                style_props: IndexMap::new(),
                inner_html: None,
                listeners: FxHashMap::default(),
                children: Vec::new(),
            },
            parent: None,
        })
    }

    fn create_text(&mut self, value: &str) -> NodeId {
        self.alloc(MemoryNode {
            kind: MemoryNodeKind::Text {
                value: value.to_owned(),
            },
            parent: None,
        })
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.detach(node)?;
        let position = {
            let parent_node = self.node_mut(parent)?;
            let children = match &mut parent_node.kind {
                MemoryNodeKind::Element { children, .. } => children,
                MemoryNodeKind::Text { .. } => return Err(DomError::BadContainer { id: parent }),
            };
            match before {
                None => children.len(),
                Some(anchor) => match children.iter().position(|c| *c == anchor) {
                    Some(idx) => idx,
                    None => {
                        warn!("insert reference {anchor} is not a child of {parent}; appending");
                        children.len()
                    }
                },
            }
        };
        if let MemoryNodeKind::Element { children, .. } = &mut self.node_mut(parent)?.kind {
            children.insert(position, node);
        }
        self.node_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.detach(node)?;
        self.free(node);
        Ok(())
    }

    fn set_node_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Text { value: current } => {
                *current = value.to_owned();
                Ok(())
            }
            MemoryNodeKind::Element { .. } => Err(DomError::NotAnElement { id: node }),
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let (attrs, _) = self.element_mut(node)?;
        attrs.insert(name.into(), value.to_owned());
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let (attrs, _) = self.element_mut(node)?;
        attrs.shift_remove(name);
        Ok(())
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let (_, props) = self.element_mut(node)?;
        props.insert(name.into(), value.to_owned());
        Ok(())
    }

    fn set_style_text(&mut self, node: NodeId, css: &str) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element {
                style_text,
                style_props,
                ..
            } => {
                style_props.clear();
                *style_text = if css.is_empty() {
                    None
                } else {
                    Some(css.to_owned())
                };
                Ok(())
            }
            MemoryNodeKind::Text { .. } => Err(DomError::NotAnElement { id: node }),
        }
    }

    fn set_style_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element {
                style_text,
                style_props,
                ..
            } => {
                *style_text = None;
                style_props.insert(name.into(), value.to_owned());
                Ok(())
            }
            MemoryNodeKind::Text { .. } => Err(DomError::NotAnElement { id: node }),
        }
    }

    fn remove_style_property(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { style_props, .. } => {
                style_props.shift_remove(name);
                Ok(())
            }
            MemoryNodeKind::Text { .. } => Err(DomError::NotAnElement { id: node }),
        }
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<(), DomError> {
        let children = self.child_ids(node);
        for child in children {
            let _ = self.remove(child);
        }
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { inner_html, .. } => {
                *inner_html = if html.is_empty() {
                    None
                } else {
                    Some(html.to_owned())
                };
                Ok(())
            }
            MemoryNodeKind::Text { .. } => Err(DomError::NotAnElement { id: node }),
        }
    }

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        proxy: ListenerProxy,
    ) -> Result<(), DomError> {
        self.listener_ops += 1;
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { listeners, .. } => {
                listeners.insert(event.into(), proxy);
                Ok(())
            }
            MemoryNodeKind::Text { .. } => Err(DomError::NotAnElement { id: node }),
        }
    }

    fn remove_listener(&mut self, node: NodeId, event: &str) -> Result<(), DomError> {
        self.listener_ops += 1;
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { listeners, .. } => {
                listeners.remove(event);
                Ok(())
            }
            MemoryNodeKind::Text { .. } => Err(DomError::NotAnElement { id: node }),
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        match &self.node(node)?.kind {
            MemoryNodeKind::Element { children, .. } => children.first().copied(),
            MemoryNodeKind::Text { .. } => None,
        }
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent?;
        match &self.node(parent)?.kind {
            MemoryNodeKind::Element { children, .. } => {
                let idx = children.iter().position(|c| *c == node)?;
                children.get(idx + 1).copied()
            }
            MemoryNodeKind::Text { .. } => None,
        }
    }

    fn namespace(&self, node: NodeId) -> Namespace {
        match self.node(node) {
            Some(MemoryNode {
                kind: MemoryNodeKind::Element { ns, .. },
                ..
            }) => *ns,
            _ => Namespace::Html,
        }
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.node(node),
            Some(MemoryNode {
                kind: MemoryNodeKind::Element { .. },
                ..
            })
        )
    }

    fn text_content(&self, node: NodeId) -> String {
        match self.node(node) {
            Some(MemoryNode {
                kind: MemoryNodeKind::Text { value },
                ..
            }) => value.clone(),
            Some(MemoryNode {
                kind: MemoryNodeKind::Element { children, .. },
                ..
            }) => {
                let ids = children.clone();
                ids.iter().map(|c| self.text_content(*c)).collect()
            }
            None => String::new(),
        }
    }

    fn node_value(&self, node: NodeId) -> Option<String> {
        match &self.node(node)?.kind {
            MemoryNodeKind::Text { value } => Some(value.clone()),
            MemoryNodeKind::Element { .. } => None,
        }
    }
}
