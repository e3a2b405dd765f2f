//! Observation Wrappers
//!
//! A [`Reactive`] wraps exactly one raw [`Object`] and turns reads into
//! `track` calls and writes into `trigger` calls. What a read or write does
//! depends on the wrapper's [`Mode`] and on the object's shape:
//!
//! - records and lists go through the base interception in `base.rs`, with
//!   the list methods (`push`, `splice`, `includes`, ...) in `array.rs`;
//! - maps and sets mutate through methods and iterate through cursors, in
//!   `collection.rs`.
//!
//! # Identity
//!
//! Wrapping the same raw object twice in the same mode returns the same
//! wrapper, as long as that wrapper is still alive. The engine's identity
//! cache holds wrappers weakly and is keyed by `(object id, mode)`.
//!
//! # Deep and shallow
//!
//! A deep wrapper hands out nested structured values wrapped in the same
//! flavour (reactive or readonly), creating the child wrapper on first
//! read. A shallow wrapper hands them out raw. Deep mutable writes store
//! the raw form of what they are given, so raw data never contains
//! wrappers.

mod array;
mod base;
mod collection;
mod refs;

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

pub use collection::{Entries, Keys, Values};
pub use refs::{proxy_refs, PropertyAccess, RefProxy};

use crate::graph::{TrackKey, TriggerOp};
use crate::reactive::Engine;
use crate::value::{Object, ObjectId, ShapeKind, Value};

/// The flavour of a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Tracks reads, triggers on writes, wraps nested values.
    Reactive,
    /// Like `Reactive` but nested values are handed out raw.
    ShallowReactive,
    /// Refuses writes, tracks nothing, wraps nested values readonly.
    Readonly,
    /// Refuses writes to its own keys; nested values are handed out raw.
    ShallowReadonly,
}

impl Mode {
    pub fn is_readonly(self) -> bool {
        matches!(self, Mode::Readonly | Mode::ShallowReadonly)
    }

    pub fn is_shallow(self) -> bool {
        matches!(self, Mode::ShallowReactive | Mode::ShallowReadonly)
    }

    /// The mode nested values are wrapped in, for deep modes.
    fn child(self) -> Option<Mode> {
        match self {
            Mode::Reactive => Some(Mode::Reactive),
            Mode::Readonly => Some(Mode::Readonly),
            Mode::ShallowReactive | Mode::ShallowReadonly => None,
        }
    }
}

pub(crate) struct ProxyInner {
    raw: Object,
    mode: Mode,
    engine: Engine,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        if let Ok(mut cache) = self.engine.proxies().try_borrow_mut() {
            cache.remove_dead(self.raw.id(), self.mode);
        }
    }
}

/// An interception wrapper around a raw object.
#[derive(Clone)]
pub struct Reactive(Rc<ProxyInner>);

/// The engine's wrapper identity cache.
#[derive(Default)]
pub(crate) struct ProxyCache {
    entries: HashMap<(ObjectId, Mode), Weak<ProxyInner>>,
}

impl ProxyCache {
    fn get(&self, id: ObjectId, mode: Mode) -> Option<Reactive> {
        self.entries.get(&(id, mode)).and_then(Weak::upgrade).map(Reactive)
    }

    fn insert(&mut self, proxy: &Reactive) {
        self.entries
            .insert((proxy.0.raw.id(), proxy.0.mode), Rc::downgrade(&proxy.0));
    }

    fn remove_dead(&mut self, id: ObjectId, mode: Mode) {
        if let Some(weak) = self.entries.get(&(id, mode)) {
            if weak.strong_count() == 0 {
                self.entries.remove(&(id, mode));
            }
        }
    }

    /// Drop entries whose wrapper is gone. Returns how many were dropped.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Engine {
    /// Get the wrapper for `raw` in `mode`, creating it if needed.
    pub fn create_reactive_object(&self, raw: Object, mode: Mode) -> Reactive {
        if let Some(existing) = self.proxies().borrow().get(raw.id(), mode) {
            return existing;
        }
        let proxy = Reactive(Rc::new(ProxyInner {
            raw,
            mode,
            engine: self.clone(),
        }));
        self.proxies().borrow_mut().insert(&proxy);
        tracing::trace!(object = proxy.0.raw.id().raw(), mode = ?mode, "created wrapper");
        self.maybe_sweep();
        proxy
    }

    /// Deep mutable wrapper.
    pub fn reactive(&self, raw: impl Into<Object>) -> Reactive {
        self.create_reactive_object(raw.into(), Mode::Reactive)
    }

    pub fn shallow_reactive(&self, raw: impl Into<Object>) -> Reactive {
        self.create_reactive_object(raw.into(), Mode::ShallowReactive)
    }

    /// Deep readonly wrapper.
    pub fn readonly(&self, raw: impl Into<Object>) -> Reactive {
        self.create_reactive_object(raw.into(), Mode::Readonly)
    }

    pub fn shallow_readonly(&self, raw: impl Into<Object>) -> Reactive {
        self.create_reactive_object(raw.into(), Mode::ShallowReadonly)
    }

    /// Wrap a structured value reactively; anything else is returned as is.
    pub fn to_reactive(&self, value: &Value) -> Value {
        match value {
            Value::Object(object) => Value::Reactive(self.reactive(object)),
            other => other.clone(),
        }
    }

    /// Wrap a structured value readonly; anything else is returned as is.
    pub fn to_readonly(&self, value: &Value) -> Value {
        match value {
            Value::Object(object) => Value::Reactive(self.readonly(object)),
            Value::Reactive(proxy) if !proxy.is_readonly() => {
                Value::Reactive(self.readonly(proxy.raw()))
            }
            other => other.clone(),
        }
    }
}

/// Whether `value` is a mutable wrapper.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(proxy) if proxy.is_reactive())
}

/// Whether `value` is a readonly wrapper.
pub fn is_readonly(value: &Value) -> bool {
    matches!(value, Value::Reactive(proxy) if proxy.is_readonly())
}

/// The raw form of `value`.
pub fn to_raw(value: &Value) -> Value {
    value.to_raw()
}

impl Reactive {
    /// The wrapped object.
    pub fn raw(&self) -> &Object {
        &self.0.raw
    }

    pub fn mode(&self) -> Mode {
        self.0.mode
    }

    pub fn kind(&self) -> ShapeKind {
        self.0.raw.kind()
    }

    pub fn engine(&self) -> &Engine {
        &self.0.engine
    }

    pub fn is_readonly(&self) -> bool {
        self.0.mode.is_readonly()
    }

    /// Whether this is a mutable wrapper.
    pub fn is_reactive(&self) -> bool {
        !self.0.mode.is_readonly()
    }

    pub fn is_shallow(&self) -> bool {
        self.0.mode.is_shallow()
    }

    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// What a reader of this wrapper sees for a stored value.
    pub(crate) fn view(&self, value: Value) -> Value {
        match (value, self.0.mode.child()) {
            (Value::Object(object), Some(mode)) => {
                Value::Reactive(self.0.engine.create_reactive_object(object, mode))
            }
            (Value::Reactive(proxy), Some(mode)) if mode.is_readonly() && !proxy.is_readonly() => {
                Value::Reactive(self.0.engine.create_reactive_object(proxy.raw().clone(), mode))
            }
            (value, _) => value,
        }
    }

    /// What gets stored for a written value.
    pub(crate) fn store_form(&self, value: Value) -> Value {
        if self.is_shallow() {
            value
        } else {
            value.to_raw()
        }
    }

    pub(crate) fn track(&self, key: TrackKey) {
        if !self.is_readonly() {
            self.0.engine.track(&self.0.raw, key);
        }
    }

    pub(crate) fn trigger(&self, key: TrackKey, op: TriggerOp, value: Option<&Value>) {
        self.0.engine.trigger(&self.0.raw, key, op, value);
    }

    /// Log a refused write and report whether it was refused.
    pub(crate) fn refuse_if_readonly(&self, op: &'static str, key: &Value) -> bool {
        if self.is_readonly() {
            self.0.engine.warn_readonly(op, key);
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Shape-dispatched operations
    // ------------------------------------------------------------------

    /// Read a key. Maps and sets look the key up as an entry.
    pub fn get(&self, key: impl Into<Value>) -> Value {
        let key = key.into();
        match self.kind() {
            ShapeKind::Map | ShapeKind::Set => self.collection_get(key),
            ShapeKind::Record | ShapeKind::List => self.base_get(key),
        }
    }

    /// Write a key. Sets have no keyed writes: use [`Reactive::add`].
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> bool {
        let (key, value) = (key.into(), value.into());
        match self.kind() {
            ShapeKind::Map => self.collection_set(key, value),
            ShapeKind::Record | ShapeKind::List => self.set_on(key, value, &self.0.raw),
            ShapeKind::Set => {
                tracing::warn!(key = %key, "keyed write on a set wrapper ignored");
                false
            }
        }
    }

    pub fn has(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        match self.kind() {
            ShapeKind::Map | ShapeKind::Set => self.collection_has(key),
            ShapeKind::Record | ShapeKind::List => self.base_has(key),
        }
    }

    /// Remove a key. Returns whether something was removed (readonly
    /// wrappers report `true` without removing anything).
    pub fn delete(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        match self.kind() {
            ShapeKind::Map | ShapeKind::Set => self.collection_delete(key),
            ShapeKind::Record | ShapeKind::List => self.base_delete(key),
        }
    }

    /// Number of properties, elements or entries. Tracks the iteration key
    /// (and `length` for lists).
    pub fn len(&self) -> usize {
        match self.kind() {
            ShapeKind::List => self.track(TrackKey::Length),
            _ => self.track(TrackKey::Iterate),
        }
        self.0.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collection size; the same as [`Reactive::len`].
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Call `f(value, key)` for every entry, over a snapshot taken at the
    /// start.
    pub fn for_each(&self, mut f: impl FnMut(Value, Value)) {
        let entries: Vec<(Value, Value)> = self.entries().collect();
        for (key, value) in entries {
            f(value, key);
        }
    }

    /// Install a record's prototype. Reads of missing keys fall through to
    /// it.
    pub fn set_prototype_of(&self, prototype: Option<Value>) -> bool {
        if self.refuse_if_readonly("set_prototype_of", &Value::Undefined) {
            return true;
        }
        self.0.raw.set_prototype(prototype)
    }
}

impl<'a> IntoIterator for &'a Reactive {
    type Item = (Value, Value);
    type IntoIter = Entries;

    fn into_iter(self) -> Entries {
        self.entries()
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("raw", &self.0.raw)
            .field("mode", &self.0.mode)
            .finish()
    }
}
