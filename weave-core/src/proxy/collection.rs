//! Map and set interception, and iteration for every shape.
//!
//! Collections track per entry (`TrackKey::Entry`) and per iteration
//! (`Iterate`, or `MapKeyIterate` for a pass over map keys only). Keys and
//! values are stored raw by deep wrappers and handed out wrapped.

use super::Reactive;
use crate::error::{ReactiveError, Result};
use crate::graph::{TrackKey, TriggerOp};
use crate::value::{has_changed, ShapeKind, Value};

impl Reactive {
    /// The key as stored: the given key if present, else its raw form.
    fn stored_key(&self, key: Value) -> Value {
        if self.raw().has_own(&key) {
            key
        } else {
            key.to_raw()
        }
    }

    pub(super) fn collection_get(&self, key: Value) -> Value {
        let key = self.stored_key(key);
        self.track(TrackKey::Entry(key.clone()));
        let value = self.raw().own(&key).unwrap_or_default();
        self.view(value)
    }

    pub(super) fn collection_has(&self, key: Value) -> bool {
        let key = self.stored_key(key);
        self.track(TrackKey::Entry(key.clone()));
        self.raw().has_own(&key)
    }

    pub(super) fn collection_set(&self, key: Value, value: Value) -> bool {
        if self.refuse_if_readonly("set", &key) {
            return true;
        }
        let key = self.store_form(self.stored_key(key));
        let value = self.store_form(value);
        let raw = self.raw();
        let old = raw.own(&key);
        raw.insert(key.clone(), value.clone());

        match old {
            None => self.trigger(TrackKey::Entry(key), TriggerOp::Add, Some(&value)),
            Some(old) if has_changed(&old, &value) => {
                self.trigger(TrackKey::Entry(key), TriggerOp::Set, Some(&value))
            }
            Some(_) => {}
        }
        true
    }

    pub(super) fn collection_delete(&self, key: Value) -> bool {
        if self.refuse_if_readonly("delete", &key) {
            return true;
        }
        let key = self.stored_key(key);
        let had = self.raw().has_own(&key);
        let removed = self.raw().remove(key.clone());
        if had && removed {
            self.trigger(TrackKey::Entry(key), TriggerOp::Delete, None);
        }
        removed
    }

    /// Add a member to a set. Returns whether the set grew.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        if self.kind() != ShapeKind::Set {
            return Err(ReactiveError::ShapeMismatch {
                op: "add",
                expected: "set",
                found: self.kind(),
            });
        }
        if self.refuse_if_readonly("add", &value) {
            return Ok(false);
        }
        let value = self.store_form(value);
        let added = self.raw().add(value.clone());
        if added {
            self.trigger(TrackKey::Entry(value.clone()), TriggerOp::Add, Some(&value));
        }
        Ok(added)
    }

    /// Remove every entry of a map or set.
    pub fn clear(&self) -> Result<()> {
        if !self.kind().is_collection() {
            return Err(ReactiveError::ShapeMismatch {
                op: "clear",
                expected: "map or set",
                found: self.kind(),
            });
        }
        if self.refuse_if_readonly("clear", &Value::Undefined) {
            return Ok(());
        }
        let had = !self.raw().is_empty();
        self.raw().clear();
        if had {
            self.trigger(TrackKey::Iterate, TriggerOp::Clear, None);
        }
        Ok(())
    }

    /// Cursor over `(key, value)` pairs. Sets yield `(member, member)`.
    pub fn entries(&self) -> Entries {
        self.track_iteration(false);
        Entries {
            proxy: self.clone(),
            pos: 0,
        }
    }

    /// Cursor over keys. On a map this depends only on which keys exist,
    /// not on their values.
    pub fn keys(&self) -> Keys {
        self.track_iteration(true);
        Keys {
            inner: Entries {
                proxy: self.clone(),
                pos: 0,
            },
        }
    }

    pub fn values(&self) -> Values {
        Values {
            inner: self.entries(),
        }
    }

    pub fn iter(&self) -> Entries {
        self.entries()
    }
}

/// Iterator over a wrapper's entries, yielding wrapped keys and values.
///
/// The cursor reads the live object, so writes made during iteration are
/// visible to it.
#[derive(Debug, Clone)]
pub struct Entries {
    proxy: Reactive,
    pos: usize,
}

impl Entries {
    fn next_raw(&mut self) -> Option<(Value, Value)> {
        let entry = self.proxy.raw().entry_at(self.pos)?;
        self.pos += 1;
        Some(entry)
    }
}

impl Iterator for Entries {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<(Value, Value)> {
        let (key, value) = self.next_raw()?;
        self.proxy.track_entry(&key);
        Some((self.proxy.view(key), self.proxy.view(value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.proxy.raw().len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

#[derive(Debug, Clone)]
pub struct Keys {
    inner: Entries,
}

impl Iterator for Keys {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (key, _) = self.inner.next_raw()?;
        Some(self.inner.proxy.view(key))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[derive(Debug, Clone)]
pub struct Values {
    inner: Entries,
}

impl Iterator for Values {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ReactiveError;
    use crate::reactive::Engine;
    use crate::value::{Object, Value};

    #[test]
    fn map_keys_and_values_are_stored_raw() {
        let engine = Engine::new();
        let raw = Object::map(Vec::<(Value, Value)>::new());
        let map = engine.reactive(&raw);
        let key = engine.reactive(Object::record([("k", 1)]));
        let value = engine.reactive(Object::record([("v", 1)]));

        map.set(&key, &value);
        assert!(raw.contains(key.raw()));
        assert_eq!(raw.get(key.raw()), Value::from(value.raw()));

        assert!(map.has(&key));
        assert!(map.get(&key).as_reactive().is_some_and(|v| v.ptr_eq(&value)));
    }

    #[test]
    fn set_add_dedups() {
        let engine = Engine::new();
        let set = engine.reactive(Object::set([1]));
        assert!(!set.add(1).unwrap());
        assert!(set.add(2).unwrap());
        assert_eq!(set.size(), 2);
        assert!(!set.set(3, 3));
    }

    #[test]
    fn clear_only_applies_to_collections() {
        let engine = Engine::new();
        let set = engine.reactive(Object::set([1, 2]));
        set.clear().unwrap();
        assert_eq!(set.size(), 0);

        let record = engine.reactive(Object::record([("a", 1)]));
        assert!(matches!(
            record.clear(),
            Err(ReactiveError::ShapeMismatch { op: "clear", .. })
        ));
    }

    #[test]
    fn iteration_wraps_nested_values() {
        let engine = Engine::new();
        let inner = Object::record([("n", 1)]);
        let map = engine.reactive(Object::map([("a", &inner)]));

        let entries: Vec<(Value, Value)> = map.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "a");
        assert!(crate::proxy::is_reactive(&entries[0].1));

        let keys: Vec<Value> = map.keys().collect();
        assert_eq!(keys, vec![Value::from("a")]);
        assert_eq!(map.values().count(), 1);
    }
}
