//! List methods.
//!
//! The mutating methods read the list's own length while they work. Those
//! reads are not dependencies of the caller, so they run with tracking
//! paused; otherwise two effects that both push onto the same list would
//! keep re-running each other.
//!
//! The search methods look through the wrapped elements first and then
//! through the raw ones, so both a wrapper and the raw object it wraps are
//! found.

use super::Reactive;
use crate::error::{ReactiveError, Result};
use crate::value::{ShapeKind, Value};

impl Reactive {
    fn expect_list(&self, op: &'static str) -> Result<()> {
        if self.kind() == ShapeKind::List {
            Ok(())
        } else {
            Err(ReactiveError::ShapeMismatch {
                op,
                expected: "list",
                found: self.kind(),
            })
        }
    }

    /// Append `items`, returning the new length.
    pub fn push<I, V>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.expect_list("push")?;
        let _pause = self.engine().stack().pause_scope();
        for item in items {
            self.list_set(self.raw().len(), item.into());
        }
        Ok(self.raw().len())
    }

    /// Remove and return the last element, or `Undefined` if empty.
    pub fn pop(&self) -> Result<Value> {
        self.expect_list("pop")?;
        let _pause = self.engine().stack().pause_scope();
        let len = self.raw().len();
        if len == 0 {
            return Ok(Value::Undefined);
        }
        let last = self.get(len - 1);
        self.list_set_len(len - 1);
        Ok(last)
    }

    /// Remove and return the first element, or `Undefined` if empty.
    pub fn shift(&self) -> Result<Value> {
        self.expect_list("shift")?;
        let _pause = self.engine().stack().pause_scope();
        let len = self.raw().len();
        if len == 0 {
            return Ok(Value::Undefined);
        }
        let first = self.get(0);
        for i in 1..len {
            self.list_set(i - 1, self.raw().get(i));
        }
        self.list_set_len(len - 1);
        Ok(first)
    }

    /// Prepend `items`, returning the new length.
    pub fn unshift<I, V>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.expect_list("unshift")?;
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let _pause = self.engine().stack().pause_scope();
        let len = self.raw().len();
        if !items.is_empty() {
            for i in (0..len).rev() {
                self.list_set(i + items.len(), self.raw().get(i));
            }
            for (i, item) in items.into_iter().enumerate() {
                self.list_set(i, item);
            }
        }
        Ok(self.raw().len())
    }

    /// Remove `delete_count` elements at `start` and insert `items` in
    /// their place. Returns the removed elements.
    ///
    /// `start` and `delete_count` are clamped to the list.
    pub fn splice<I, V>(&self, start: usize, delete_count: usize, items: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.expect_list("splice")?;
        let _pause = self.engine().stack().pause_scope();
        let mut next = self.raw().values();
        let start = start.min(next.len());
        let end = start + delete_count.min(next.len() - start);
        let removed: Vec<Value> = next
            .splice(start..end, items.into_iter().map(|v| self.store_form(v.into())))
            .collect();

        for (i, value) in next.iter().enumerate().skip(start) {
            self.list_set(i, value.clone());
        }
        if next.len() < self.raw().len() {
            self.list_set_len(next.len());
        }
        Ok(removed.into_iter().map(|v| self.view(v)).collect())
    }

    /// Set the list's length, truncating or padding with `Undefined`.
    pub fn set_len(&self, len: usize) -> Result<bool> {
        self.expect_list("set_len")?;
        Ok(self.list_set_len(len))
    }

    /// Whether the list contains `value`, compared like `==`.
    pub fn includes(&self, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        self.expect_list("includes")?;
        Ok(self.search(|item| *item == value, false).is_some())
    }

    /// First position holding `value`, compared strictly.
    pub fn index_of(&self, value: impl Into<Value>) -> Result<Option<usize>> {
        let value = value.into();
        self.expect_list("index_of")?;
        Ok(self.search(|item| item.strict_equals(&value), false))
    }

    /// Last position holding `value`, compared strictly.
    pub fn last_index_of(&self, value: impl Into<Value>) -> Result<Option<usize>> {
        let value = value.into();
        self.expect_list("last_index_of")?;
        Ok(self.search(|item| item.strict_equals(&value), true))
    }

    /// Search the wrapped elements, then the raw ones. Reading every
    /// wrapped element tracks each index and the length.
    fn search(&self, matches: impl Fn(&Value) -> bool, from_end: bool) -> Option<usize> {
        let len = self.len();
        let wrapped: Vec<Value> = (0..len).map(|i| self.get(i)).collect();
        let raw = self.raw().values();
        let find = |items: &[Value]| {
            if from_end {
                items.iter().rposition(&matches)
            } else {
                items.iter().position(&matches)
            }
        };
        find(&wrapped).or_else(|| find(&raw))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ReactiveError;
    use crate::reactive::Engine;
    use crate::value::{Object, Value};

    fn values(items: &[i32]) -> Vec<Value> {
        items.iter().copied().map(Value::from).collect()
    }

    #[test]
    fn push_pop_shift_unshift() {
        let engine = Engine::new();
        let raw = Object::list([1, 2]);
        let list = engine.reactive(&raw);

        assert_eq!(list.push([3, 4]).unwrap(), 4);
        assert_eq!(list.pop().unwrap(), 4);
        assert_eq!(list.shift().unwrap(), 1);
        assert_eq!(raw.values(), values(&[2, 3]));

        assert_eq!(list.unshift([0, 1]).unwrap(), 4);
        assert_eq!(raw.values(), values(&[0, 1, 2, 3]));
    }

    #[test]
    fn pop_on_empty_list() {
        let engine = Engine::new();
        let list = engine.reactive(Object::list(Vec::<Value>::new()));
        assert!(list.pop().unwrap().is_undefined());
        assert!(list.shift().unwrap().is_undefined());
    }

    #[test]
    fn splice_replaces_a_range() {
        let engine = Engine::new();
        let raw = Object::list([1, 2, 3, 4]);
        let list = engine.reactive(&raw);

        let removed = list.splice(1, 2, [9]).unwrap();
        assert_eq!(removed, values(&[2, 3]));
        assert_eq!(raw.values(), values(&[1, 9, 4]));

        let removed = list.splice(10, 1, [5, 6]).unwrap();
        assert!(removed.is_empty());
        assert_eq!(raw.values(), values(&[1, 9, 4, 5, 6]));
    }

    #[test]
    fn list_methods_on_other_shapes_fail() {
        let engine = Engine::new();
        let record = engine.reactive(Object::record([("a", 1)]));
        let err = record.push([1]).unwrap_err();
        assert!(matches!(err, ReactiveError::ShapeMismatch { op: "push", .. }));
    }

    #[test]
    fn search_compares_strictly() {
        let engine = Engine::new();
        let list = engine.reactive(Object::list([Value::from(1), Value::from(f64::NAN), Value::from(1)]));

        assert!(list.includes(f64::NAN).unwrap());
        assert_eq!(list.index_of(f64::NAN).unwrap(), None);
        assert_eq!(list.index_of(1).unwrap(), Some(0));
        assert_eq!(list.last_index_of(1).unwrap(), Some(2));
    }

    #[test]
    fn search_finds_wrappers_and_raw_objects() {
        let engine = Engine::new();
        let item = Object::record([("id", 1)]);
        let list = engine.reactive(Object::list([&item]));

        let wrapped = list.get(0);
        assert!(list.includes(wrapped.clone()).unwrap());
        assert!(list.includes(&item).unwrap());
        assert_eq!(list.index_of(&item).unwrap(), Some(0));
    }
}
