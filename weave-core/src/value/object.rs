//! Raw observed values.
//!
//! An [`Object`] is a shared handle to structured data. Its identity is the
//! [`ObjectId`] assigned at creation, which is what the observation store and
//! the wrapper cache key on. The shape (record, list, map or set) is fixed
//! for the lifetime of the object, so it lives outside the `RefCell` and can
//! be inspected while the data is borrowed.
//!
//! Nothing in this module tracks or triggers: this is the layer wrappers
//! delegate to once they have done their bookkeeping.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};

use super::{format_number, Value, MAX_LIST_LEN};

/// Counter for generating unique object IDs.
static OBJECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stable identity token of a raw object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(OBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Structural kind of a raw object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Named properties plus an optional prototype.
    Record,
    /// Dense ordered sequence with a `length`.
    List,
    /// Associative collection keyed by arbitrary values.
    Map,
    /// Collection of unique values.
    Set,
}

impl ShapeKind {
    /// Map-like and set-like shapes mutate through methods rather than
    /// assignment.
    pub fn is_collection(self) -> bool {
        matches!(self, ShapeKind::Map | ShapeKind::Set)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeKind::Record => "record",
            ShapeKind::List => "list",
            ShapeKind::Map => "map",
            ShapeKind::Set => "set",
        })
    }
}

pub(crate) enum ObjectData {
    Record {
        props: IndexMap<Rc<str>, Value>,
        proto: Option<Value>,
    },
    List(Vec<Value>),
    Map(IndexMap<Value, Value>),
    Set(IndexSet<Value>),
}

/// How a key addresses a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKey {
    Index(usize),
    Length,
    Other,
}

impl ListKey {
    pub(crate) fn parse(key: &Value) -> Self {
        match key {
            Value::Number(_) => match key.as_index() {
                Some(index) if index < MAX_LIST_LEN => ListKey::Index(index),
                _ => ListKey::Other,
            },
            Value::Str(s) if &**s == "length" => ListKey::Length,
            Value::Str(s) => match s.parse::<usize>() {
                Ok(index) if index < MAX_LIST_LEN && index.to_string() == **s => {
                    ListKey::Index(index)
                }
                _ => ListKey::Other,
            },
            _ => ListKey::Other,
        }
    }
}

/// The property name a key stands for on a record.
pub(crate) fn property_name(key: &Value) -> Rc<str> {
    match key {
        Value::Str(s) => s.clone(),
        Value::Number(n) => Rc::from(format_number(*n)),
        other => Rc::from(other.to_string()),
    }
}

pub(crate) struct ObjectCell {
    id: ObjectId,
    kind: ShapeKind,
    data: RefCell<ObjectData>,
}

/// A raw structured value.
///
/// Cloning an `Object` clones the handle, not the data.
#[derive(Clone)]
pub struct Object(Rc<ObjectCell>);

/// Non-owning handle to an [`Object`].
#[derive(Clone)]
pub struct WeakObject(Weak<ObjectCell>);

impl WeakObject {
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(Object)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Object {
    fn from_data(kind: ShapeKind, data: ObjectData) -> Self {
        Self(Rc::new(ObjectCell {
            id: ObjectId::next(),
            kind,
            data: RefCell::new(data),
        }))
    }

    /// Create an empty object of the given shape.
    pub fn new(kind: ShapeKind) -> Self {
        let data = match kind {
            ShapeKind::Record => ObjectData::Record {
                props: IndexMap::new(),
                proto: None,
            },
            ShapeKind::List => ObjectData::List(Vec::new()),
            ShapeKind::Map => ObjectData::Map(IndexMap::new()),
            ShapeKind::Set => ObjectData::Set(IndexSet::new()),
        };
        Self::from_data(kind, data)
    }

    /// Create a record from `(name, value)` pairs.
    pub fn record<I, K, V>(props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let props = props
            .into_iter()
            .map(|(k, v)| (Rc::from(k.as_ref()), v.into()))
            .collect();
        Self::from_data(ShapeKind::Record, ObjectData::Record { props, proto: None })
    }

    /// Create a list.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Self::from_data(ShapeKind::List, ObjectData::List(items))
    }

    /// Create a map from `(key, value)` pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_data(ShapeKind::Map, ObjectData::Map(entries))
    }

    /// Create a set. Duplicate items collapse.
    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Self::from_data(ShapeKind::Set, ObjectData::Set(items))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.0.kind
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.0))
    }

    pub(crate) fn data(&self) -> Ref<'_, ObjectData> {
        self.0.data.borrow()
    }

    pub(crate) fn data_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.data.borrow_mut()
    }

    /// Number of own properties, elements or entries.
    pub fn len(&self) -> usize {
        match &*self.data() {
            ObjectData::Record { props, .. } => props.len(),
            ObjectData::List(items) => items.len(),
            ObjectData::Map(entries) => entries.len(),
            ObjectData::Set(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Own lookup, without consulting the prototype.
    ///
    /// Lists answer `length`; sets answer with the stored member.
    pub(crate) fn own(&self, key: &Value) -> Option<Value> {
        match &*self.data() {
            ObjectData::Record { props, .. } => props.get(&*property_name(key)).cloned(),
            ObjectData::List(items) => match ListKey::parse(key) {
                ListKey::Index(i) => items.get(i).cloned(),
                ListKey::Length => Some(Value::from(items.len())),
                ListKey::Other => None,
            },
            ObjectData::Map(entries) => entries.get(key).cloned(),
            ObjectData::Set(items) => items.get(key).cloned(),
        }
    }

    pub(crate) fn has_own(&self, key: &Value) -> bool {
        match &*self.data() {
            ObjectData::Record { props, .. } => props.contains_key(&*property_name(key)),
            ObjectData::List(items) => match ListKey::parse(key) {
                ListKey::Index(i) => i < items.len(),
                ListKey::Length => true,
                ListKey::Other => false,
            },
            ObjectData::Map(entries) => entries.contains_key(key),
            ObjectData::Set(items) => items.contains(key),
        }
    }

    /// Read a property, element or entry. Records fall back to their
    /// prototype; a missing key reads as `Undefined`.
    pub fn get(&self, key: impl Into<Value>) -> Value {
        let key = key.into();
        if let Some(value) = self.own(&key) {
            return value;
        }
        match self.prototype() {
            Some(Value::Reactive(proto)) => proto.get(key),
            Some(Value::Object(proto)) => proto.get(key),
            _ => Value::Undefined,
        }
    }

    /// Whether the key is present, following the prototype for records.
    pub fn contains(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        if self.has_own(&key) {
            return true;
        }
        match self.prototype() {
            Some(Value::Reactive(proto)) => proto.has(key),
            Some(Value::Object(proto)) => proto.contains(key),
            _ => false,
        }
    }

    /// Write a property, element or map entry. Writing past the end of a
    /// list pads it with `Undefined`. Returns `false` if the key has no
    /// meaning for this shape (including any write to a set).
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        match &mut *self.data_mut() {
            ObjectData::Record { props, .. } => {
                props.insert(property_name(&key), value);
                true
            }
            ObjectData::List(items) => match ListKey::parse(&key) {
                ListKey::Index(i) => {
                    if i >= items.len() {
                        items.resize(i + 1, Value::Undefined);
                    }
                    items[i] = value;
                    true
                }
                ListKey::Length => match value.as_index() {
                    Some(len) => {
                        items.resize(len, Value::Undefined);
                        true
                    }
                    None => false,
                },
                ListKey::Other => false,
            },
            ObjectData::Map(entries) => {
                entries.insert(key, value);
                true
            }
            ObjectData::Set(_) => false,
        }
    }

    /// Remove a key. List elements become holes (`Undefined`) without
    /// shrinking the list. Returns whether anything was removed.
    pub fn remove(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        match &mut *self.data_mut() {
            ObjectData::Record { props, .. } => props.shift_remove(&*property_name(&key)).is_some(),
            ObjectData::List(items) => match ListKey::parse(&key) {
                ListKey::Index(i) if i < items.len() => {
                    items[i] = Value::Undefined;
                    true
                }
                _ => false,
            },
            ObjectData::Map(entries) => entries.shift_remove(&key).is_some(),
            ObjectData::Set(items) => items.shift_remove(&key),
        }
    }

    /// Add a member to a set, or append to a list. Returns whether the
    /// object changed.
    pub fn add(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        match &mut *self.data_mut() {
            ObjectData::Set(items) => items.insert(value),
            ObjectData::List(items) => {
                items.push(value);
                true
            }
            _ => false,
        }
    }

    /// Remove every own property, element or entry.
    pub fn clear(&self) {
        match &mut *self.data_mut() {
            ObjectData::Record { props, .. } => props.clear(),
            ObjectData::List(items) => items.clear(),
            ObjectData::Map(entries) => entries.clear(),
            ObjectData::Set(items) => items.clear(),
        }
    }

    pub(crate) fn truncate_or_pad(&self, len: usize) {
        if let ObjectData::List(items) = &mut *self.data_mut() {
            items.resize(len, Value::Undefined);
        }
    }

    /// Entry at a position in iteration order.
    ///
    /// Records yield `(name, value)`, lists `(index, element)`, maps
    /// `(key, value)` and sets `(member, member)`.
    pub(crate) fn entry_at(&self, pos: usize) -> Option<(Value, Value)> {
        match &*self.data() {
            ObjectData::Record { props, .. } => props
                .get_index(pos)
                .map(|(k, v)| (Value::Str(k.clone()), v.clone())),
            ObjectData::List(items) => items.get(pos).map(|v| (Value::from(pos), v.clone())),
            ObjectData::Map(entries) => entries.get_index(pos).map(|(k, v)| (k.clone(), v.clone())),
            ObjectData::Set(items) => items.get_index(pos).map(|v| (v.clone(), v.clone())),
        }
    }

    /// Snapshot of own entries in iteration order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        (0..self.len()).filter_map(|pos| self.entry_at(pos)).collect()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(k, _)| k).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(_, v)| v).collect()
    }

    pub fn prototype(&self) -> Option<Value> {
        match &*self.data() {
            ObjectData::Record { proto, .. } => proto.clone(),
            _ => None,
        }
    }

    /// Install (or clear) a record's prototype. Other shapes refuse.
    pub fn set_prototype(&self, prototype: Option<Value>) -> bool {
        match &mut *self.data_mut() {
            ObjectData::Record { proto, .. } => {
                *proto = prototype;
                true
            }
            _ => false,
        }
    }
}

impl From<&Object> for Object {
    fn from(object: &Object) -> Self {
        object.clone()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.0.data.try_borrow().map(|_| self.len()).ok();
        f.debug_struct("Object")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("len", &len)
            .finish()
    }
}
