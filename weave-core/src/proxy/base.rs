//! Record and list interception.

use super::Reactive;
use crate::graph::{TrackKey, TriggerOp};
use crate::value::{has_changed, property_name, ListKey, Object, ShapeKind, Value};

impl Reactive {
    /// The track key a record or list read of `key` maps to.
    fn base_key(&self, key: &Value) -> Option<TrackKey> {
        match self.kind() {
            ShapeKind::List => match ListKey::parse(key) {
                ListKey::Index(i) => Some(TrackKey::Index(i)),
                ListKey::Length => Some(TrackKey::Length),
                ListKey::Other => None,
            },
            _ => Some(TrackKey::Prop(property_name(key))),
        }
    }

    pub(super) fn base_get(&self, key: Value) -> Value {
        if let Some(tracked) = self.base_key(&key) {
            self.track(tracked);
        }
        let value = self.raw().get(key);
        self.view(value)
    }

    pub(super) fn base_has(&self, key: Value) -> bool {
        if let Some(tracked) = self.base_key(&key) {
            self.track(tracked);
        }
        self.raw().contains(key)
    }

    /// Write `key` with `receiver` as the object the write lands on.
    ///
    /// A record without the key delegates to a wrapped prototype, which
    /// writes onto the receiver; only the wrapper whose raw object is the
    /// receiver triggers.
    pub(crate) fn set_on(&self, key: Value, value: Value, receiver: &Object) -> bool {
        if self.refuse_if_readonly("set", &key) {
            return true;
        }
        if self.kind() == ShapeKind::List {
            return match ListKey::parse(&key) {
                ListKey::Index(i) => self.list_set(i, value),
                ListKey::Length => match value.as_index() {
                    Some(len) => self.list_set_len(len),
                    None => {
                        tracing::warn!(value = %value, "invalid list length ignored");
                        false
                    }
                },
                ListKey::Other => {
                    tracing::warn!(key = %key, "non-index key written on a list wrapper ignored");
                    false
                }
            };
        }

        let raw = self.raw();
        let value = self.store_form(value);
        let old = self.engine().untracked(|| raw.get(key.clone()));
        let had = raw.has_own(&key);

        let written = match raw.prototype() {
            Some(Value::Reactive(proto)) if !had => proto.set_on(key.clone(), value.clone(), receiver),
            _ => receiver.insert(key.clone(), value.clone()),
        };

        if receiver.ptr_eq(raw) && has_changed(&old.to_raw(), &value.to_raw()) {
            let op = if had { TriggerOp::Set } else { TriggerOp::Add };
            self.trigger(TrackKey::Prop(property_name(&key)), op, Some(&value));
        }
        written
    }

    /// Write element `index`, padding the list if it is past the end.
    pub(super) fn list_set(&self, index: usize, value: Value) -> bool {
        if self.refuse_if_readonly("set", &Value::from(index)) {
            return true;
        }
        let raw = self.raw();
        let value = self.store_form(value);
        let len = raw.len();
        let old = raw.get(index);
        raw.insert(index, value.clone());

        if index >= len {
            self.trigger(TrackKey::Index(index), TriggerOp::Add, Some(&value));
        } else if has_changed(&old.to_raw(), &value.to_raw()) {
            self.trigger(TrackKey::Index(index), TriggerOp::Set, Some(&value));
        }
        true
    }

    /// Resize the list. Shrinking notifies readers of the removed elements.
    pub(super) fn list_set_len(&self, len: usize) -> bool {
        if self.refuse_if_readonly("set", &Value::from("length")) {
            return true;
        }
        let raw = self.raw();
        let old = raw.len();
        raw.truncate_or_pad(len);
        if old != len {
            self.trigger(TrackKey::Length, TriggerOp::Set, Some(&Value::from(len)));
        }
        true
    }

    pub(super) fn base_delete(&self, key: Value) -> bool {
        if self.refuse_if_readonly("delete", &key) {
            return true;
        }
        let Some(tracked) = self.base_key(&key) else {
            return false;
        };
        if tracked == TrackKey::Length {
            tracing::warn!("list length cannot be deleted");
            return false;
        }
        let raw = self.raw();
        let had = raw.has_own(&key);
        let removed = raw.remove(key);
        if had && removed {
            self.trigger(tracked, TriggerOp::Delete, None);
        }
        removed
    }

    /// Track whatever a full pass over the keys depends on.
    pub(super) fn track_iteration(&self, key_only: bool) {
        match self.kind() {
            ShapeKind::List => {
                self.track(TrackKey::Iterate);
                self.track(TrackKey::Length);
            }
            ShapeKind::Map if key_only => self.track(TrackKey::MapKeyIterate),
            _ => self.track(TrackKey::Iterate),
        }
    }

    /// Track one record property or list element reached by iteration.
    pub(super) fn track_entry(&self, key: &Value) {
        if !self.kind().is_collection() {
            if let Some(tracked) = self.base_key(key) {
                self.track(tracked);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::reactive::Engine;
    use crate::value::{Object, Value};

    #[test]
    fn deep_writes_store_raw_values() {
        let engine = Engine::new();
        let raw = Object::record([("a", 1)]);
        let state = engine.reactive(&raw);
        let child = engine.reactive(Object::record([("b", 2)]));

        state.set("child", &child);
        assert_eq!(raw.get("child"), Value::from(child.raw()));
        assert!(state.get("child").as_reactive().is_some_and(|c| c.ptr_eq(&child)));
    }

    #[test]
    fn shallow_writes_store_what_they_are_given() {
        let engine = Engine::new();
        let raw = Object::record([("a", 1)]);
        let state = engine.shallow_reactive(&raw);
        let child = engine.reactive(Object::record([("b", 2)]));

        state.set("child", &child);
        assert_eq!(raw.get("child"), Value::from(&child));
    }

    #[test]
    fn readonly_writes_are_refused_but_report_success() {
        let engine = Engine::new();
        let raw = Object::record([("a", 1)]);
        let view = engine.readonly(&raw);

        assert!(view.set("a", 2));
        assert!(view.delete("a"));
        assert_eq!(raw.get("a"), 1);
    }

    #[test]
    fn list_writes() {
        let engine = Engine::new();
        let raw = Object::list([1, 2, 3]);
        let list = engine.reactive(&raw);

        assert!(list.set(5, 6));
        assert_eq!(raw.len(), 6);
        assert!(raw.get(4).is_undefined());

        assert!(list.set("length", 2));
        assert_eq!(raw.values(), vec![Value::from(1), Value::from(2)]);
        assert!(!list.set("foo", 1));

        assert!(list.delete(0));
        assert!(raw.get(0).is_undefined());
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn oversized_list_indexes_and_lengths_are_ignored() {
        let engine = Engine::new();
        let raw = Object::list([1, 2, 3]);
        let list = engine.reactive(&raw);

        assert!(!list.set(usize::MAX as f64, 2));
        assert!(!list.set(u32::MAX, 2));
        assert!(!list.set(1e12, 2));
        assert!(!list.set("length", (usize::MAX / 2) as f64));
        assert!(!list.set("length", 1e12));
        assert_eq!(raw.len(), 3);
        assert!(list.get(u32::MAX).is_undefined());
    }
}
