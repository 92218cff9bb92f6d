//! Thread-local registers for the rendering engine.
//!
//! While a component body runs, its instance is the "current frame" that
//! the hook functions resolve against. The engine itself is registered for
//! the duration of render entry, queue flushes, and frame callbacks so
//! that vnode factories can announce constructions to the options
//! registry.
//!
//! Both registers are stacks with drop-guards: a panicking component body
//! unwinds through the guard and cannot leave a stale frame behind.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::{ComponentInstance, InstanceCore};
use crate::engine::{Engine, EngineCore};

thread_local! {
    static FRAME_STACK: RefCell<Vec<Rc<InstanceCore>>> = const { RefCell::new(Vec::new()) };
    static ENGINE_STACK: RefCell<Vec<Rc<EngineCore>>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame stack on drop.
#[must_use = "FrameGuard pops the current-frame stack on drop"]
pub(crate) struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub(crate) fn enter(instance: &ComponentInstance) -> FrameGuard {
    FRAME_STACK.with(|stack| {
        stack.borrow_mut().push(Rc::clone(&instance.core));
    });
    FrameGuard
}

/// Access the instance whose body is currently executing.
///
/// # Panics
/// Panics when no component render is in progress; calling a hook outside
/// a render is out of contract.
pub(crate) fn with_current<R>(f: impl FnOnce(&ComponentInstance) -> R) -> R {
    let core = FRAME_STACK.with(|stack| stack.borrow().last().cloned());
    match core {
        Some(core) => f(&ComponentInstance { core }),
        None => {
            log::error!("hook called outside a component render");
            panic!("hook called outside a component render");
        }
    }
}

/// Pops the engine stack on drop.
#[must_use = "EngineGuard pops the current-engine stack on drop"]
pub(crate) struct EngineGuard;

impl Drop for EngineGuard {
    fn drop(&mut self) {
        ENGINE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub(crate) fn enter_engine(engine: &Engine) -> EngineGuard {
    ENGINE_STACK.with(|stack| {
        stack.borrow_mut().push(engine.clone_core());
    });
    EngineGuard
}

/// Access the engine currently rendering, if any. Vnode construction
/// outside a render pass is silent.
pub(crate) fn with_engine_opt<R>(f: impl FnOnce(&Engine) -> R) -> Option<R> {
    let core = ENGINE_STACK.with(|stack| stack.borrow().last().cloned());
    core.map(|core| f(&Engine::from_core(core)))
}
