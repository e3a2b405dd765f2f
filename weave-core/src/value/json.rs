//! Serde support for values.
//!
//! Serializing a value takes an untracked snapshot: wrappers serialize the
//! raw object they wrap and boxes serialize their current contents. Records
//! become maps, lists and sets become sequences, and maps become sequences
//! of `[key, value]` pairs so that non-string keys survive.

use std::cell::RefCell;

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::{Object, ObjectId, ShapeKind, Value};
use crate::error::Result;

struct Snapshot<'a> {
    value: &'a Value,
    path: &'a RefCell<Vec<ObjectId>>,
}

impl<'a> Snapshot<'a> {
    fn child(&self, value: &'a Value) -> Snapshot<'a> {
        Snapshot {
            value,
            path: self.path,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let path = RefCell::new(Vec::new());
        Snapshot { value: self, path: &path }.serialize(serializer)
    }
}

impl Serialize for Snapshot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.value {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match self.value.as_i64() {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Value::Str(s) => serializer.serialize_str(s),
            Value::Ref(r) => {
                let inner = r.get_untracked();
                self.child(&inner).serialize(serializer)
            }
            Value::Object(_) | Value::Reactive(_) => {
                let Some(object) = self.value.raw_object() else {
                    return serializer.serialize_unit();
                };
                if self.path.borrow().contains(&object.id()) {
                    return Err(S::Error::custom(format!(
                        "cyclic value: object {} contains itself",
                        object.id().raw()
                    )));
                }
                self.path.borrow_mut().push(object.id());
                let result = self.serialize_object(&object, serializer);
                self.path.borrow_mut().pop();
                result
            }
        }
    }
}

impl Snapshot<'_> {
    fn serialize_object<S: Serializer>(
        &self,
        object: &Object,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let entries = object.entries();
        match object.kind() {
            ShapeKind::Record => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in &entries {
                    map.serialize_entry(&self.child(key), &self.child(value))?;
                }
                map.end()
            }
            ShapeKind::List | ShapeKind::Set => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for (_, value) in &entries {
                    seq.serialize_element(&self.child(value))?;
                }
                seq.end()
            }
            ShapeKind::Map => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for (key, value) in &entries {
                    seq.serialize_element(&(self.child(key), self.child(value)))?;
                }
                seq.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Object(Object::list(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(props) => Value::Object(Object::record(
                props.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}

impl Value {
    /// Snapshot this value as JSON without tracking anything.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
