//! Ancestor-provided values with change notification.
//!
//! A context is an identity plus a default. Its provider is an ordinary
//! component whose render result is its children; the engine recognizes
//! provider vnodes during diff, stores the live value beside the instance,
//! and re-enqueues subscribed components when the value's identity
//! changes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::component::{ComponentFn, ComponentInstance, InstanceCore};
use crate::props::{OpaqueValue, PropValue, Props};
use crate::value::SameValue;
use crate::vnode::{Child, Children, NodeKind, VNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_context_id() -> ContextId {
    ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Live state carried by a mounted provider.
pub(crate) struct ProviderState {
    pub(crate) context: ContextId,
    pub(crate) value: RefCell<OpaqueValue>,
    pub(crate) subscribers: RefCell<Vec<Weak<InstanceCore>>>,
}

impl ProviderState {
    pub(crate) fn new(context: ContextId, value: OpaqueValue) -> Rc<Self> {
        Rc::new(Self {
            context,
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn subscribe(self: &Rc<Self>, consumer: &ComponentInstance) {
        {
            let mut subs = self.subscribers.borrow_mut();
            let present = subs
                .iter()
                .any(|w| w.upgrade().is_some_and(|core| Rc::ptr_eq(&core, &consumer.core)));
            if !present {
                subs.push(Rc::downgrade(&consumer.core));
            }
        }
        let mut links = consumer.core.subscriptions.borrow_mut();
        if !links.iter().any(|s| Rc::ptr_eq(s, self)) {
            links.push(Rc::clone(self));
        }
    }

    /// Live subscribers, pruning entries whose component has unmounted.
    pub(crate) fn take_live_subscribers(&self) -> Vec<ComponentInstance> {
        let mut subs = self.subscribers.borrow_mut();
        let mut live = Vec::with_capacity(subs.len());
        subs.retain(|weak| match weak.upgrade() {
            Some(core) => {
                let instance = ComponentInstance { core };
                if instance.is_mounted() {
                    live.push(instance);
                    true
                } else {
                    false
                }
            }
            None => false,
        });
        live
    }
}

/// Removes `instance` from every provider set that references it.
pub(crate) fn cleanup_subscriptions(instance: &ComponentInstance) {
    let links = std::mem::take(&mut *instance.core.subscriptions.borrow_mut());
    for state in links {
        state
            .subscribers
            .borrow_mut()
            .retain(|weak| match weak.upgrade() {
                Some(core) => !Rc::ptr_eq(&core, &instance.core),
                None => false,
            });
    }
}

/// Nearest ancestor provider of `context`, walking structural parents.
pub(crate) fn find_provider(start: &VNode, context: ContextId) -> Option<ComponentInstance> {
    let mut cursor = start.parent();
    while let Some(vnode) = cursor {
        if let NodeKind::Component(component) = vnode.kind() {
            if component.provides() == Some(context) {
                return vnode.component();
            }
        }
        cursor = vnode.parent();
    }
    None
}

pub struct Context<T: Clone + SameValue> {
    id: ContextId,
    default: Rc<T>,
}

impl<T: Clone + SameValue> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T: Clone + SameValue> Context<T> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn default_value(&self) -> T {
        (*self.default).clone()
    }

    /// Builds a provider vnode carrying `value` for the subtree.
    pub fn provide(&self, value: T, children: impl Into<Child>) -> VNode {
        let mut props = Props::new().set("value", PropValue::Opaque(OpaqueValue::new(value)));
        props.set_children(Children::from_child(children.into()));
        let render: Rc<dyn Fn(&Props) -> VNode> =
            Rc::new(|props: &Props| crate::vnode::fragment(props.children_value()));
        VNode::new(
            NodeKind::Component(ComponentFn::provider(self.id, render)),
            props,
        )
    }

    /// Current value beside a provider instance, when the types line up.
    pub(crate) fn read(&self, provider: &ComponentInstance) -> Option<T> {
        let state = provider.core.provider.borrow().clone()?;
        let value = state.value.borrow();
        value.downcast::<T>().cloned()
    }
}

/// Creates a context with a default for consumers outside any provider.
pub fn create_context<T: Clone + SameValue>(default: T) -> Context<T> {
    Context {
        id: next_context_id(),
        default: Rc::new(default),
    }
}
