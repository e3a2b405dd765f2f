//! Keyed access shared by raw objects, wrappers and values, and the
//! ref-unwrapping view built on it.

use crate::reactive::{unref, Ref};
use crate::value::{Object, Value};

use super::Reactive;

/// Read and write a key on something that has keys.
pub trait PropertyAccess {
    fn get_prop(&self, key: &Value) -> Value;

    fn set_prop(&self, key: Value, value: Value) -> bool;
}

impl PropertyAccess for Object {
    fn get_prop(&self, key: &Value) -> Value {
        self.get(key)
    }

    fn set_prop(&self, key: Value, value: Value) -> bool {
        self.insert(key, value)
    }
}

impl PropertyAccess for Reactive {
    fn get_prop(&self, key: &Value) -> Value {
        self.get(key)
    }

    fn set_prop(&self, key: Value, value: Value) -> bool {
        self.set(key, value)
    }
}

/// Structured values delegate; anything else reads `Undefined` and refuses
/// writes.
impl PropertyAccess for Value {
    fn get_prop(&self, key: &Value) -> Value {
        match self {
            Value::Object(object) => object.get_prop(key),
            Value::Reactive(proxy) => proxy.get_prop(key),
            _ => Value::Undefined,
        }
    }

    fn set_prop(&self, key: Value, value: Value) -> bool {
        match self {
            Value::Object(object) => object.set_prop(key, value),
            Value::Reactive(proxy) => proxy.set_prop(key, value),
            _ => false,
        }
    }
}

/// A view over `target` that unwraps refs on read and writes through them.
#[derive(Debug, Clone)]
pub struct RefProxy {
    target: Value,
}

impl RefProxy {
    pub fn target(&self) -> &Value {
        &self.target
    }

    /// Read `key`; a ref stored there reads as its value.
    pub fn get(&self, key: impl Into<Value>) -> Value {
        unref(&self.target.get_prop(&key.into()))
    }

    /// Write `key`. If the key currently holds a ref and `value` is not a
    /// ref, the ref is updated in place; otherwise the key is replaced.
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> bool {
        let (key, value) = (key.into(), value.into());
        let current = match &self.target {
            Value::Reactive(proxy) => proxy.engine().untracked(|| self.target.get_prop(&key)),
            _ => self.target.get_prop(&key),
        };
        match current {
            Value::Ref(existing) if !matches!(value, Value::Ref(_)) => {
                existing.set(value);
                true
            }
            _ => self.target.set_prop(key, value),
        }
    }

    /// The ref stored at `key`, if there is one.
    pub fn get_ref(&self, key: impl Into<Value>) -> Option<Ref> {
        match self.target.get_prop(&key.into()) {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }
}

/// Wrap `target` so that refs stored on it read and write transparently.
pub fn proxy_refs(target: impl Into<Value>) -> RefProxy {
    RefProxy {
        target: target.into(),
    }
}
