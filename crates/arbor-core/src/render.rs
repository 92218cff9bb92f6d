//! Public mount/update/unmount entry.

use crate::commit::{self, CommitBatch};
use crate::diff;
use crate::dom::{DomError, NodeId};
use crate::engine::Engine;
use crate::frame;
use crate::props::Props;
use crate::vnode::{Child, Children, NodeKind, VNode};

impl Engine {
    /// Renders `tree` into `container`, diffing against whatever this
    /// engine rendered there before. `None` unmounts the previous tree
    /// and clears the cached root.
    pub fn render(&self, tree: Option<VNode>, container: NodeId) -> Result<(), DomError> {
        let _engine_guard = frame::enter_engine(self);
        let previous = self.take_root(container);

        let Some(tree) = tree else {
            if let Some(previous) = previous {
                diff::unmount(self, &previous, true);
            }
            return Ok(());
        };

        // The root is wrapped in a grouping node so that every render
        // entry diffs a stable type, and carries the container as its
        // document node for ancestor walks.
        let root = {
            let mut props = Props::new();
            props.set_children(Children::from_child(Child::Node(tree)));
            VNode::new(NodeKind::Fragment, props)
        };
        root.core.dom.set(Some(container));
        root.core.depth.set(0);
        self.store_root(container, root.clone());

        self.options().fire_root_entered(&root, container);

        let ns = self.dom().namespace(container);
        let old_dom = self.dom().first_child(container);
        let mut batch = CommitBatch::default();
        diff::diff_node(
            self,
            &mut batch,
            container,
            &root,
            previous.as_ref(),
            ns,
            old_dom,
        )?;
        commit::commit(self, &root, batch);
        Ok(())
    }

    /// No server-rendered markup is adopted; hydration is a fresh render.
    pub fn hydrate(&self, tree: Option<VNode>, container: NodeId) -> Result<(), DomError> {
        self.render(tree, container)
    }
}
