//! arbor: a virtual-document rendering engine.
//!
//! A declarative [`VNode`] tree is compared against the previously
//! rendered tree and a live document — anything implementing
//! [`dom::DomTree`] — is mutated to match with the minimum necessary
//! operations. Plain component functions participate through positional
//! hooks that give them per-instance memory across re-renders.
//!
//! ```
//! use std::rc::Rc;
//! use arbor_core::dom::{ConcreteDomHost, DomTree, MemoryDom};
//! use arbor_core::platform::ManualScheduler;
//! use arbor_core::{component, el, use_state, Engine, Props, VNode};
//!
//! fn counter(_props: &Props) -> VNode {
//!     let (count, set_count) = use_state(|| 0);
//!     el(
//!         "button",
//!         Props::new().on("click", move |_| set_count.update(|n| n + 1)),
//!         count.to_string(),
//!     )
//! }
//!
//! let host = Rc::new(ConcreteDomHost::new(MemoryDom::new()));
//! let container = host.borrow_typed().create_container("div");
//! let engine = Engine::new(host.clone(), Rc::new(ManualScheduler));
//! engine
//!     .render(Some(component(counter, Props::new(), ())), container)
//!     .unwrap();
//! assert_eq!(host.borrow_typed().text_content(container), "0");
//! let button = host.borrow_typed().first_child(container).unwrap();
//! host.borrow_typed().dispatch(button, "click");
//! engine.flush().unwrap();
//! assert_eq!(host.borrow_typed().text_content(container), "1");
//! ```
//!
//! The engine is single-threaded and cooperative: diffs, commits, and
//! hooks run to completion in the caller's turn. The host is signalled
//! through [`platform::HostScheduler`] when a flush or a frame callback
//! becomes due.

mod commit;
mod component;
mod context;
mod diff;
pub mod dom;
mod engine;
mod frame;
mod hooks;
mod options;
pub mod platform;
mod portal;
mod property;
mod props;
mod render;
mod value;
mod vnode;

#[cfg(test)]
mod tests;

pub use component::{component, ComponentFn, ComponentInstance};
pub use context::{create_context, Context, ContextId};
pub use engine::Engine;
pub use hooks::{
    cleanup, use_callback, use_context, use_debug_value, use_effect, use_effect_always, use_id,
    use_layout_effect, use_layout_effect_always, use_memo, use_memo_always, use_reducer,
    use_reducer_with, use_ref, use_state, use_sync_external_store,
    use_sync_external_store_with_server, Dispatch, EffectCleanup, Mut, StateSetter,
    StoreSubscriber, Unsubscribe,
};
pub use options::Options;
pub use portal::create_portal;
pub use props::{
    create_ref, EventHandler, OpaqueValue, PropValue, Props, RefObject, RefSlot, RefValue,
    StyleEntry, StyleValue,
};
pub use value::{DepList, SameValue};
pub use vnode::{el, fragment, keyed_fragment, text, Child, ChildUnit, Children, Key, NodeKind, VNode};
