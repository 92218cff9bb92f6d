//! Property model for intrinsic elements and components.
//!
//! Prop values form an open union at the engine boundary; the property
//! writer validates and routes them when they reach a live element.
//! `key` and `ref` are engine concepts, not element state: the factory
//! hoists them out of the map into dedicated vnode fields.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::component::ComponentInstance;
use crate::dom::{Event, NodeId};
use crate::value::SameValue;
use crate::vnode::{Child, Children, Key};

/// A delegated event handler.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler")
    }
}

#[derive(Clone, Debug)]
pub enum StyleEntry {
    Text(Rc<str>),
    Number(f64),
}

impl From<&str> for StyleEntry {
    fn from(value: &str) -> Self {
        StyleEntry::Text(value.into())
    }
}

impl From<f64> for StyleEntry {
    fn from(value: f64) -> Self {
        StyleEntry::Number(value)
    }
}

impl From<i32> for StyleEntry {
    fn from(value: i32) -> Self {
        StyleEntry::Number(value.into())
    }
}

#[derive(Clone, Debug)]
pub enum StyleValue {
    /// Verbatim css text.
    Text(Rc<str>),
    /// Property map diffed entry-wise.
    Map(IndexMap<Rc<str>, StyleEntry>),
}

impl StyleValue {
    pub fn map() -> StyleMapBuilder {
        StyleMapBuilder::default()
    }
}

#[derive(Default)]
pub struct StyleMapBuilder {
    entries: IndexMap<Rc<str>, StyleEntry>,
}

impl StyleMapBuilder {
    pub fn entry(mut self, name: impl Into<Rc<str>>, value: impl Into<StyleEntry>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> StyleValue {
        StyleValue::Map(self.entries)
    }
}

/// Engine-opaque payload (context values and similar): never written to
/// the document, compared with the same-value predicate of its concrete
/// type.
#[derive(Clone)]
pub struct OpaqueValue {
    value: Rc<dyn Any>,
    same: fn(&dyn Any, &dyn Any) -> bool,
}

fn same_opaque<T: SameValue>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a.same_value(b),
        _ => false,
    }
}

impl OpaqueValue {
    pub fn new<T: SameValue>(value: T) -> Self {
        Self {
            value: Rc::new(value),
            same: same_opaque::<T>,
        }
    }

    pub fn value(&self) -> &Rc<dyn Any> {
        &self.value
    }

    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn same(&self, other: &OpaqueValue) -> bool {
        Rc::ptr_eq(&self.value, &other.value) || (self.same)(&*self.value, &*other.value)
    }
}

/// Value domain of element and component props.
#[derive(Clone)]
pub enum PropValue {
    Text(Rc<str>),
    Number(f64),
    Bool(bool),
    Style(StyleValue),
    Handler(EventHandler),
    /// Markup assigned verbatim to the element's innerHTML.
    InnerHtml(Rc<str>),
    Opaque(OpaqueValue),
}

impl PropValue {
    /// Equality as used by the property diff: contents for plain data,
    /// identity for handlers and opaque payloads.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a.to_bits() == b.to_bits(),
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::InnerHtml(a), PropValue::InnerHtml(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            (PropValue::Opaque(a), PropValue::Opaque(b)) => a.same(b),
            (PropValue::Style(StyleValue::Text(a)), PropValue::Style(StyleValue::Text(b))) => {
                a == b
            }
            // Style maps are diffed entry-wise by the property writer; the
            // coarse answer here only gates whether that diff runs.
            (PropValue::Style(_), PropValue::Style(_)) => false,
            _ => false,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&OpaqueValue> {
        match self {
            PropValue::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Stringification used for attribute writes.
    pub fn to_attr_string(&self) -> String {
        match self {
            PropValue::Text(s) => s.to_string(),
            PropValue::Number(n) => n.to_string(),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Style(_) | PropValue::Handler(_) | PropValue::InnerHtml(_) => String::new(),
            PropValue::Opaque(_) => String::new(),
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(s) => write!(f, "Text({s:?})"),
            PropValue::Number(n) => write!(f, "Number({n})"),
            PropValue::Bool(b) => write!(f, "Bool({b})"),
            PropValue::Style(_) => f.write_str("Style(..)"),
            PropValue::Handler(_) => f.write_str("Handler(..)"),
            PropValue::InnerHtml(_) => f.write_str("InnerHtml(..)"),
            PropValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(value.into())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<StyleValue> for PropValue {
    fn from(value: StyleValue) -> Self {
        PropValue::Style(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

/// Handle produced for a ref: the live element, or the component instance.
#[derive(Clone)]
pub enum RefValue {
    Node(NodeId),
    Instance(ComponentInstance),
}

impl RefValue {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            RefValue::Node(id) => Some(*id),
            RefValue::Instance(_) => None,
        }
    }
}

impl fmt::Debug for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefValue::Node(id) => write!(f, "Node({id})"),
            RefValue::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// Single-slot container refs are created with [`create_ref`].
pub type RefObject = Rc<std::cell::RefCell<Option<RefValue>>>;

pub fn create_ref() -> RefObject {
    Rc::new(std::cell::RefCell::new(None))
}

/// Destination of a produced handle: a slot, or a callback invoked with
/// the handle (and later with `None`).
#[derive(Clone)]
pub enum RefSlot {
    Object(RefObject),
    Callback(Rc<dyn Fn(Option<RefValue>)>),
}

impl RefSlot {
    pub fn callback(f: impl Fn(Option<RefValue>) + 'static) -> Self {
        RefSlot::Callback(Rc::new(f))
    }

    pub fn apply(&self, value: Option<RefValue>) {
        match self {
            RefSlot::Object(slot) => *slot.borrow_mut() = value,
            RefSlot::Callback(f) => f(value),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RefSlot::Object(a), RefSlot::Object(b)) => Rc::ptr_eq(a, b),
            (RefSlot::Callback(a), RefSlot::Callback(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<RefObject> for RefSlot {
    fn from(value: RefObject) -> Self {
        RefSlot::Object(value)
    }
}

impl fmt::Debug for RefSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefSlot::Object(_) => f.write_str("RefSlot::Object"),
            RefSlot::Callback(_) => f.write_str("RefSlot::Callback"),
        }
    }
}

/// Prop mapping plus the normalized child payload.
#[derive(Clone, Default, Debug)]
pub struct Props {
    entries: IndexMap<Rc<str>, PropValue>,
    children: Children,
    key: Option<Key>,
    slot_ref: Option<RefSlot>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Registers a delegated listener under the conventional
    /// `on` + capitalized-event prop name (`click` becomes `onClick`).
    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        let mut name = String::with_capacity(event.len() + 2);
        name.push_str("on");
        let mut chars = event.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
        self.entries
            .insert(name.into(), PropValue::Handler(EventHandler::new(handler)));
        self
    }

    pub fn style(self, style: StyleValue) -> Self {
        self.set("style", PropValue::Style(style))
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn node_ref(mut self, slot: impl Into<RefSlot>) -> Self {
        self.slot_ref = Some(slot.into());
        self
    }

    pub fn ref_callback(mut self, f: impl Fn(Option<RefValue>) + 'static) -> Self {
        self.slot_ref = Some(RefSlot::callback(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Rc<str>, &PropValue)> {
        self.entries.iter()
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Child payload as a renderable value; what `Fragment`-like
    /// pass-through components return.
    pub fn children_value(&self) -> Child {
        self.children.to_child()
    }

    pub(crate) fn set_children(&mut self, children: Children) {
        self.children = children;
    }

    pub(crate) fn take_key(&mut self) -> Option<Key> {
        self.key.take()
    }

    pub(crate) fn take_ref(&mut self) -> Option<RefSlot> {
        self.slot_ref.take()
    }
}
