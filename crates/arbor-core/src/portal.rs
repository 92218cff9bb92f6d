//! Portals: children that render into a foreign container.

use crate::dom::NodeId;
use crate::props::Props;
use crate::vnode::{Child, Children, NodeKind, VNode};

/// Builds a vnode whose children mount into `container` instead of the
/// structural parent's document node. The vnode itself owns no node; its
/// ref, if any, receives the container.
pub fn create_portal(children: impl Into<Child>, container: NodeId) -> VNode {
    let mut props = Props::new();
    props.set_children(Children::from_child(children.into()));
    VNode::new(NodeKind::Portal { container }, props)
}
