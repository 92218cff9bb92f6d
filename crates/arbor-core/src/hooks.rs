//! Positional hook slots.
//!
//! Each component instance owns an ordered list of slots; a hook call
//! claims the next position. Slots are created on first appearance and
//! live until the component unmounts, so hooks must run in the same order
//! on every render — a slot whose kind changes between renders is a
//! contract violation and panics with a diagnostic.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::component::{ComponentInstance, InstanceCore};
use crate::context::{self, Context};
use crate::engine::Engine;
use crate::frame;
use crate::value::{DepList, SameValue};

pub(crate) enum HookSlot {
    State(StateSlot),
    Memo(MemoSlot),
    Effect(EffectSlot),
    Context,
    Id(Rc<str>),
}

impl HookSlot {
    fn kind_name(&self) -> &'static str {
        match self {
            HookSlot::State(_) => "state",
            HookSlot::Memo(_) => "memo",
            HookSlot::Effect(_) => "effect",
            HookSlot::Context => "context",
            HookSlot::Id(_) => "id",
        }
    }
}

pub(crate) struct StateSlot {
    value: Box<dyn Any>,
    /// The typed setter/dispatcher handed out on every render; created
    /// once so its identity is stable for the component's lifetime.
    accessor: Box<dyn Any>,
    /// Latest reducer; refreshed each render so late dispatches see the
    /// newest closure.
    reducer: Option<Box<dyn Any>>,
}

pub(crate) struct MemoSlot {
    value: Option<Box<dyn Any>>,
    deps: Option<Box<dyn Any>>,
}

#[derive(Default)]
pub(crate) struct EffectSlot {
    cleanup: Option<Box<dyn FnOnce()>>,
    pending: Option<Box<dyn FnOnce() -> Option<Box<dyn FnOnce()>>>>,
    deps: Option<Box<dyn Any>>,
    pending_deps: Option<Box<dyn Any>>,
}

#[derive(Default)]
pub(crate) struct HookList {
    slots: Vec<HookSlot>,
    cursor: usize,
}

impl HookList {
    pub(crate) fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    /// Cleanup thunks in reverse slot order, taken for unmount.
    pub(crate) fn take_cleanups_reversed(&mut self) -> Vec<Box<dyn FnOnce()>> {
        self.slots
            .iter_mut()
            .rev()
            .filter_map(|slot| match slot {
                HookSlot::Effect(effect) => effect.cleanup.take(),
                _ => None,
            })
            .collect()
    }
}

fn hook_order_violation(expected: &'static str, found: &'static str) -> ! {
    log::error!("hook order changed between renders: expected {expected}, found {found} slot");
    panic!("hook order changed between renders");
}

/// Claims the next slot position; creates the slot if this is its first
/// appearance. Returns (index, created).
fn claim_slot(instance: &ComponentInstance, create: impl FnOnce() -> HookSlot) -> (usize, bool) {
    let mut hooks = instance.core.hooks.borrow_mut();
    let index = hooks.cursor;
    hooks.cursor += 1;
    if index == hooks.slots.len() {
        hooks.slots.push(create());
        (index, true)
    } else {
        (index, false)
    }
}

fn with_state_slot<R>(
    instance: &ComponentInstance,
    index: usize,
    f: impl FnOnce(&mut StateSlot) -> R,
) -> R {
    let mut hooks = instance.core.hooks.borrow_mut();
    match &mut hooks.slots[index] {
        HookSlot::State(slot) => f(slot),
        other => hook_order_violation("state", other.kind_name()),
    }
}

fn with_memo_slot<R>(
    instance: &ComponentInstance,
    index: usize,
    f: impl FnOnce(&mut MemoSlot) -> R,
) -> R {
    let mut hooks = instance.core.hooks.borrow_mut();
    match &mut hooks.slots[index] {
        HookSlot::Memo(slot) => f(slot),
        other => hook_order_violation("memo", other.kind_name()),
    }
}

fn with_effect_slot<R>(
    instance: &ComponentInstance,
    index: usize,
    f: impl FnOnce(&mut EffectSlot) -> R,
) -> R {
    let mut hooks = instance.core.hooks.borrow_mut();
    match &mut hooks.slots[index] {
        HookSlot::Effect(slot) => f(slot),
        other => hook_order_violation("effect", other.kind_name()),
    }
}

fn enqueue_self(instance: &ComponentInstance) {
    if let Some(engine) = instance.core.engine.upgrade() {
        Engine::from_core(engine).enqueue(instance);
    }
}

// ───────────────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────────────

/// Stable setter returned by [`use_state`].
pub struct StateSetter<T> {
    instance: Weak<InstanceCore>,
    index: usize,
    _value: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            index: self.index,
            _value: PhantomData,
        }
    }
}

impl<T: Clone + SameValue> StateSetter<T> {
    /// Stores `value` and enqueues a re-render, unless the new value is
    /// the same as the current one.
    pub fn set(&self, value: T) {
        self.replace_with(|_| value)
    }

    /// Updater form: computes the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.replace_with(f)
    }

    fn replace_with(&self, f: impl FnOnce(&T) -> T) {
        let Some(core) = self.instance.upgrade() else {
            return;
        };
        let instance = ComponentInstance { core };
        let current: T = with_state_slot(&instance, self.index, |slot| {
            slot.value
                .downcast_ref::<T>()
                .expect("state type changed between renders")
                .clone()
        });
        let next = f(&current);
        if current.same_value(&next) {
            return;
        }
        with_state_slot(&instance, self.index, |slot| {
            slot.value = Box::new(next);
        });
        enqueue_self(&instance);
    }
}

/// Stateful value with a lazy initializer. The setter's identity is
/// stable across renders.
pub fn use_state<T>(init: impl FnOnce() -> T) -> (T, StateSetter<T>)
where
    T: Clone + SameValue,
{
    frame::with_current(|instance| {
        let (index, created) = claim_slot(instance, || {
            HookSlot::State(StateSlot {
                value: Box::new(()),
                accessor: Box::new(()),
                reducer: None,
            })
        });
        if created {
            let value = init();
            let setter = StateSetter::<T> {
                instance: Rc::downgrade(&instance.core),
                index,
                _value: PhantomData,
            };
            with_state_slot(instance, index, |slot| {
                slot.value = Box::new(value);
                slot.accessor = Box::new(setter);
            });
        }
        with_state_slot(instance, index, |slot| {
            let value = slot
                .value
                .downcast_ref::<T>()
                .expect("state type changed between renders")
                .clone();
            let setter = slot
                .accessor
                .downcast_ref::<StateSetter<T>>()
                .expect("state type changed between renders")
                .clone();
            (value, setter)
        })
    })
}

// ───────────────────────────────────────────────────────────────────────
// Reducer
// ───────────────────────────────────────────────────────────────────────

type ReducerFn<T, A> = Rc<dyn Fn(&T, A) -> T>;

/// Stable dispatcher returned by [`use_reducer`].
pub struct Dispatch<T, A> {
    instance: Weak<InstanceCore>,
    index: usize,
    _value: PhantomData<fn(T, A)>,
}

impl<T, A> Clone for Dispatch<T, A> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            index: self.index,
            _value: PhantomData,
        }
    }
}

impl<T: Clone + SameValue, A: 'static> Dispatch<T, A> {
    pub fn dispatch(&self, action: A) {
        let Some(core) = self.instance.upgrade() else {
            return;
        };
        let instance = ComponentInstance { core };
        let (current, reducer): (T, ReducerFn<T, A>) =
            with_state_slot(&instance, self.index, |slot| {
                let current = slot
                    .value
                    .downcast_ref::<T>()
                    .expect("reducer state type changed between renders")
                    .clone();
                let reducer = slot
                    .reducer
                    .as_ref()
                    .and_then(|r| r.downcast_ref::<ReducerFn<T, A>>())
                    .expect("reducer type changed between renders")
                    .clone();
                (current, reducer)
            });
        let next = reducer(&current, action);
        if current.same_value(&next) {
            return;
        }
        with_state_slot(&instance, self.index, |slot| {
            slot.value = Box::new(next);
        });
        enqueue_self(&instance);
    }
}

/// Reducer-driven state. The dispatcher is stable; the reducer reference
/// is refreshed each render so dispatches always run the latest closure.
pub fn use_reducer<T, A>(
    reducer: impl Fn(&T, A) -> T + 'static,
    init: impl FnOnce() -> T,
) -> (T, Dispatch<T, A>)
where
    T: Clone + SameValue,
    A: 'static,
{
    frame::with_current(|instance| {
        let (index, created) = claim_slot(instance, || {
            HookSlot::State(StateSlot {
                value: Box::new(()),
                accessor: Box::new(()),
                reducer: None,
            })
        });
        if created {
            let value = init();
            let dispatch = Dispatch::<T, A> {
                instance: Rc::downgrade(&instance.core),
                index,
                _value: PhantomData,
            };
            with_state_slot(instance, index, |slot| {
                slot.value = Box::new(value);
                slot.accessor = Box::new(dispatch);
            });
        }
        let latest: ReducerFn<T, A> = Rc::new(reducer);
        with_state_slot(instance, index, |slot| {
            slot.reducer = Some(Box::new(latest.clone()));
            let value = slot
                .value
                .downcast_ref::<T>()
                .expect("reducer state type changed between renders")
                .clone();
            let dispatch = slot
                .accessor
                .downcast_ref::<Dispatch<T, A>>()
                .expect("reducer state type changed between renders")
                .clone();
            (value, dispatch)
        })
    })
}

/// Reducer with an initial argument transformed by `init`.
pub fn use_reducer_with<T, A, I>(
    reducer: impl Fn(&T, A) -> T + 'static,
    initial_arg: I,
    init: impl FnOnce(I) -> T,
) -> (T, Dispatch<T, A>)
where
    T: Clone + SameValue,
    A: 'static,
{
    use_reducer(reducer, move || init(initial_arg))
}

// ───────────────────────────────────────────────────────────────────────
// Memo / callback / ref
// ───────────────────────────────────────────────────────────────────────

/// Memoized value, re-evaluated when `deps` change element-wise under
/// the same-value predicate.
pub fn use_memo<T, D>(deps: D, compute: impl FnOnce() -> T) -> T
where
    T: Clone + 'static,
    D: DepList,
{
    frame::with_current(|instance| {
        let (index, created) = claim_slot(instance, || {
            HookSlot::Memo(MemoSlot {
                value: None,
                deps: None,
            })
        });
        let recompute = created
            || with_memo_slot(instance, index, |slot| match &slot.deps {
                Some(prev) if slot.value.is_some() => deps.changed_from(prev.as_ref()),
                _ => true,
            });
        if recompute {
            let value = compute();
            with_memo_slot(instance, index, |slot| {
                slot.value = Some(Box::new(value.clone()));
                slot.deps = Some(deps.boxed());
            });
            value
        } else {
            with_memo_slot(instance, index, |slot| {
                slot.value
                    .as_ref()
                    .and_then(|v| v.downcast_ref::<T>())
                    .expect("memo type changed between renders")
                    .clone()
            })
        }
    })
}

/// Memoized value with no dependency list: re-evaluated every render.
pub fn use_memo_always<T: Clone + 'static>(compute: impl FnOnce() -> T) -> T {
    frame::with_current(|instance| {
        let (index, _) = claim_slot(instance, || {
            HookSlot::Memo(MemoSlot {
                value: None,
                deps: None,
            })
        });
        let value = compute();
        with_memo_slot(instance, index, |slot| {
            slot.value = Some(Box::new(value.clone()));
            slot.deps = None;
        });
        value
    })
}

/// Memoized callback: `use_memo` over the closure itself.
pub fn use_callback<F, D>(deps: D, f: F) -> Rc<F>
where
    F: 'static,
    D: DepList,
{
    use_memo(deps, move || Rc::new(f))
}

/// Shared mutable cell handed out by [`use_ref`].
pub struct Mut<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for Mut<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Mut<T> {
    fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }
}

impl<T: Clone + 'static> Mut<T> {
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

/// Per-instance mutable cell: a memo with empty deps, so one stable cell
/// for the component's lifetime. Mutating it does not schedule a render.
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> Mut<T> {
    use_memo((), move || Mut::new(init()))
}

// ───────────────────────────────────────────────────────────────────────
// Effects
// ───────────────────────────────────────────────────────────────────────

/// Cleanup returned by an effect callback.
pub struct EffectCleanup {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl EffectCleanup {
    pub fn none() -> Self {
        Self { cleanup: None }
    }

    fn into_cleanup(self) -> Option<Box<dyn FnOnce()>> {
        self.cleanup
    }
}

/// Wraps a thunk to run before the effect's next invocation and on
/// unmount.
pub fn cleanup(f: impl FnOnce() + 'static) -> EffectCleanup {
    EffectCleanup {
        cleanup: Some(Box::new(f)),
    }
}

#[derive(Clone, Copy)]
enum EffectPhase {
    /// After the next paint.
    Deferred,
    /// Synchronously at commit, before paint.
    Layout,
}

fn effect_impl<D: DepList>(
    phase: EffectPhase,
    deps: Option<D>,
    effect: impl FnOnce() -> EffectCleanup + 'static,
) {
    frame::with_current(|instance| {
        let (index, created) = claim_slot(instance, || HookSlot::Effect(EffectSlot::default()));
        let should_run = created
            || with_effect_slot(instance, index, |slot| match (&deps, &slot.deps) {
                (Some(next), Some(prev)) => next.changed_from(prev.as_ref()),
                _ => true,
            });
        if !should_run {
            return;
        }
        with_effect_slot(instance, index, |slot| {
            slot.pending = Some(Box::new(move || effect().into_cleanup()));
            slot.pending_deps = deps.map(DepList::boxed);
        });
        let queue = match phase {
            EffectPhase::Deferred => &instance.core.pending_effects,
            EffectPhase::Layout => &instance.core.pending_layout_effects,
        };
        let mut queue = queue.borrow_mut();
        if !queue.contains(&index) {
            queue.push(index);
        }
    })
}

/// Post-paint effect, run when `deps` changed (and on mount).
pub fn use_effect<D: DepList>(deps: D, effect: impl FnOnce() -> EffectCleanup + 'static) {
    effect_impl(EffectPhase::Deferred, Some(deps), effect)
}

/// Post-paint effect with no dependency list: runs after every render.
pub fn use_effect_always(effect: impl FnOnce() -> EffectCleanup + 'static) {
    effect_impl::<()>(EffectPhase::Deferred, None, effect)
}

/// Layout effect: runs synchronously after the document is mutated,
/// before the host paints.
pub fn use_layout_effect<D: DepList>(deps: D, effect: impl FnOnce() -> EffectCleanup + 'static) {
    effect_impl(EffectPhase::Layout, Some(deps), effect)
}

pub fn use_layout_effect_always(effect: impl FnOnce() -> EffectCleanup + 'static) {
    effect_impl::<()>(EffectPhase::Layout, None, effect)
}

/// Runs one pending effect slot: prior cleanup, then the callback, then
/// store the new cleanup and accept the pending deps.
pub(crate) fn run_effect_slot(instance: &ComponentInstance, index: usize) {
    let (pending, pending_deps) =
        with_effect_slot(instance, index, |slot| {
            (slot.pending.take(), slot.pending_deps.take())
        });
    let Some(pending) = pending else {
        return;
    };
    let prior_cleanup = with_effect_slot(instance, index, |slot| slot.cleanup.take());
    if let Some(prior) = prior_cleanup {
        prior();
    }
    let next_cleanup = pending();
    with_effect_slot(instance, index, |slot| {
        slot.cleanup = next_cleanup;
        if pending_deps.is_some() {
            slot.deps = pending_deps;
        }
    });
}

// ───────────────────────────────────────────────────────────────────────
// Context
// ───────────────────────────────────────────────────────────────────────

/// Reads the nearest ancestor provider's value and subscribes this
/// component to its changes; the context default when no provider is in
/// scope.
pub fn use_context<T: Clone + SameValue>(ctx: &Context<T>) -> T {
    frame::with_current(|instance| {
        let (index, _) = claim_slot(instance, || HookSlot::Context);
        {
            let hooks = instance.core.hooks.borrow();
            if !matches!(&hooks.slots[index], HookSlot::Context) {
                hook_order_violation("context", hooks.slots[index].kind_name());
            }
        }
        let Some(vnode) = instance.vnode() else {
            return ctx.default_value();
        };
        match context::find_provider(&vnode, ctx.id()) {
            Some(provider) => {
                if let Some(state) = provider.core.provider.borrow().clone() {
                    if state.context == ctx.id() {
                        state.subscribe(instance);
                    }
                }
                match ctx.read(&provider) {
                    Some(value) => value,
                    None => {
                        log::error!("context value type mismatch; using default");
                        ctx.default_value()
                    }
                }
            }
            None => ctx.default_value(),
        }
    })
}

// ───────────────────────────────────────────────────────────────────────
// External stores
// ───────────────────────────────────────────────────────────────────────

pub type Unsubscribe = Box<dyn FnOnce()>;

/// Subscription entry point of an external store: receives the engine's
/// notify thunk, returns the unsubscribe thunk.
pub type StoreSubscriber = Rc<dyn Fn(Rc<dyn Fn()>) -> Unsubscribe>;

/// Mirrors an external store into component state.
///
/// The snapshot lives in a state slot; an effect keyed on the subscriber's
/// identity re-checks the snapshot for updates missed between render and
/// subscription, then subscribes. The notify thunk re-reads the snapshot
/// and stores it, which is a no-op when the value is unchanged.
pub fn use_sync_external_store<T>(subscribe: StoreSubscriber, get_snapshot: Rc<dyn Fn() -> T>) -> T
where
    T: Clone + SameValue,
{
    let (snapshot, set_snapshot) = use_state({
        let get_snapshot = Rc::clone(&get_snapshot);
        move || get_snapshot()
    });
    let subscriber = Rc::clone(&subscribe);
    use_effect((subscriber,), move || {
        set_snapshot.set(get_snapshot());
        let notify: Rc<dyn Fn()> = Rc::new({
            let set_snapshot = set_snapshot.clone();
            let get_snapshot = Rc::clone(&get_snapshot);
            move || set_snapshot.set(get_snapshot())
        });
        let unsubscribe = subscribe(notify);
        cleanup(move || unsubscribe())
    });
    snapshot
}

/// Server-snapshot form; the server snapshot is accepted for API parity
/// and unused in client rendering.
pub fn use_sync_external_store_with_server<T>(
    subscribe: StoreSubscriber,
    get_snapshot: Rc<dyn Fn() -> T>,
    _get_server_snapshot: Rc<dyn Fn() -> T>,
) -> T
where
    T: Clone + SameValue,
{
    use_sync_external_store(subscribe, get_snapshot)
}

// ───────────────────────────────────────────────────────────────────────
// Identity and debugging
// ───────────────────────────────────────────────────────────────────────

/// Identifier stable across re-renders of this slot and unique within
/// the engine.
pub fn use_id() -> Rc<str> {
    frame::with_current(|instance| {
        let (index, created) = claim_slot(instance, || HookSlot::Id("".into()));
        if created {
            let id: Rc<str> = match instance.core.engine.upgrade() {
                Some(engine) => Engine::from_core(engine).next_unique_id(),
                None => "a-0".into(),
            };
            let mut hooks = instance.core.hooks.borrow_mut();
            hooks.slots[index] = HookSlot::Id(Rc::clone(&id));
        }
        let hooks = instance.core.hooks.borrow();
        match &hooks.slots[index] {
            HookSlot::Id(id) => Rc::clone(id),
            other => hook_order_violation("id", other.kind_name()),
        }
    })
}

/// Accepted for API compatibility; does nothing.
pub fn use_debug_value<T>(_value: T) {}
