//! Ref Implementation
//!
//! A Ref is a single-slot observable box. Unlike a wrapper it does not go
//! through the observation store: each ref owns a private [`Dep`], which
//! plays the part of a key registry with the single key `value`.
//!
//! Refs come in two flavours:
//!
//! - A cell ref (from [`Engine::new_ref`]) stores its own value. It keeps
//!   the raw form for change detection and a deep reactive view for reads.
//! - A property ref (from [`Engine::to_ref`]) is linked to one key of a
//!   structured value: reads and writes go through the target, so it
//!   tracks and triggers exactly like the property does.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::Engine;
use super::subscriber::Dep;
use crate::proxy::PropertyAccess;
use crate::value::{has_changed, is_object, Object, ShapeKind, Value};

enum RefInner {
    Cell {
        engine: Engine,
        /// Raw form of the current value, used for change detection.
        raw: RefCell<Value>,
        /// What readers see: the raw value, wrapped if structured.
        value: RefCell<Value>,
        dep: Dep,
    },
    Property {
        target: Value,
        key: Value,
    },
}

/// A single-slot observable box.
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

impl Ref {
    fn cell(engine: &Engine, initial: Value) -> Self {
        let raw = initial.to_raw();
        let value = engine.to_reactive(&initial);
        Self(Rc::new(RefInner::Cell {
            engine: engine.clone(),
            raw: RefCell::new(raw),
            value: RefCell::new(value),
            dep: Dep::new(),
        }))
    }

    fn property(target: Value, key: Value) -> Self {
        Self(Rc::new(RefInner::Property { target, key }))
    }

    /// Read the value, tracking the ref if a computation is running.
    pub fn get(&self) -> Value {
        match &*self.0 {
            RefInner::Cell { engine, value, dep, .. } => {
                engine.track_dep(dep);
                value.borrow().clone()
            }
            RefInner::Property { target, key } => target.get_prop(key),
        }
    }

    /// Read the value without tracking.
    pub fn get_untracked(&self) -> Value {
        match &*self.0 {
            RefInner::Cell { value, .. } => value.borrow().clone(),
            RefInner::Property { target, key } => match target {
                Value::Reactive(proxy) => proxy.engine().untracked(|| target.get_prop(key)),
                _ => target.get_prop(key),
            },
        }
    }

    /// Replace the value. Subscribers re-run only if the raw value changed.
    pub fn set(&self, new_value: impl Into<Value>) {
        let new_value = new_value.into();
        match &*self.0 {
            RefInner::Cell { engine, raw, value, dep } => {
                let new_raw = new_value.to_raw();
                if !has_changed(&raw.borrow(), &new_raw) {
                    return;
                }
                *value.borrow_mut() = engine.to_reactive(&new_raw);
                *raw.borrow_mut() = new_raw;
                engine.trigger_dep(dep);
            }
            RefInner::Property { target, key } => {
                target.set_prop(key.clone(), new_value);
            }
        }
    }

    /// Replace the value with `f` applied to the current one.
    pub fn update(&self, f: impl FnOnce(Value) -> Value) {
        self.set(f(self.get_untracked()));
    }

    /// Whether this ref is linked to a property rather than holding a value.
    pub fn is_linked(&self) -> bool {
        matches!(&*self.0, RefInner::Property { .. })
    }

    /// Number of live computations reading this ref directly.
    pub fn subscriber_count(&self) -> usize {
        match &*self.0 {
            RefInner::Cell { dep, .. } => dep.live_count(),
            RefInner::Property { .. } => 0,
        }
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            RefInner::Cell { raw, .. } => match raw.try_borrow() {
                Ok(raw) => f.debug_tuple("Ref").field(&*raw).finish(),
                Err(_) => f.write_str("Ref(<borrowed>)"),
            },
            RefInner::Property { key, .. } => f.debug_struct("Ref").field("linked", key).finish(),
        }
    }
}

/// Whether `value` is a ref.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// The ref's value if `value` is a ref, otherwise `value` itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

impl Engine {
    /// Create a ref holding `initial`.
    pub fn new_ref(&self, initial: impl Into<Value>) -> Ref {
        Ref::cell(self, initial.into())
    }

    /// A ref for `key` on `target`.
    ///
    /// If `target` is already a ref it is returned. If the property
    /// currently holds a ref, that ref is returned. Otherwise the result is
    /// linked to the property. A primitive `target` gets a fresh cell ref.
    pub fn to_ref(&self, target: impl Into<Value>, key: impl Into<Value>) -> Ref {
        let target = target.into();
        if let Value::Ref(r) = target {
            return r;
        }
        if !is_object(&target) {
            return self.new_ref(target);
        }
        let key = key.into();
        match self.untracked(|| target.get_prop(&key)) {
            Value::Ref(existing) => existing,
            _ => Ref::property(target, key),
        }
    }

    /// A record with one linked ref per own key of `target`.
    pub fn to_refs(&self, target: impl Into<Value>) -> Object {
        let target = target.into();
        let keys = match &target {
            Value::Reactive(proxy) => self.untracked(|| proxy.keys().collect::<Vec<_>>()),
            Value::Object(object) => object.keys(),
            _ => Vec::new(),
        };
        let refs = Object::new(ShapeKind::Record);
        for key in keys {
            let r = self.to_ref(target.clone(), key.clone());
            refs.insert(key, r);
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn ref_holds_a_value() {
        let engine = Engine::new();
        let a = engine.new_ref(0);
        assert_eq!(a.get(), 0);
        a.set(2);
        assert_eq!(a.get(), 2);
    }

    #[test]
    fn reads_are_only_tracked_inside_computations() {
        let engine = Engine::new();
        let a = engine.new_ref(1);
        a.get();
        assert_eq!(a.subscriber_count(), 0);

        let _e = engine.effect({
            let a = a.clone();
            move || a.get()
        });
        assert_eq!(a.subscriber_count(), 1);
    }

    #[test]
    fn setting_the_same_raw_value_does_not_notify() {
        let engine = Engine::new();
        let obj = Object::record([("x", 1)]);
        let a = engine.new_ref(&obj);
        let runs = Rc::new(Cell::new(0));

        let _e = engine.effect({
            let a = a.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                a.get()
            }
        });

        // A wrapper around the same raw object is not a change.
        a.set(engine.reactive(&obj));
        assert_eq!(runs.get(), 1);

        a.set(f64::NAN);
        a.set(f64::NAN);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn structured_values_are_exposed_wrapped() {
        let engine = Engine::new();
        let a = engine.new_ref(Object::record([("count", 1)]));
        assert!(crate::proxy::is_reactive(&a.get()));
    }

    #[test]
    fn update_applies_to_the_current_value() {
        let engine = Engine::new();
        let a = engine.new_ref(1);
        a.update(|v| Value::from(v.as_number().unwrap_or(0.0) + 1.0));
        assert_eq!(a.get(), 2);
    }

    #[test]
    fn unref_and_is_ref() {
        let engine = Engine::new();
        let a = Value::from(engine.new_ref(1));
        assert!(is_ref(&a));
        assert!(!is_ref(&Value::from(1)));
        assert_eq!(unref(&a), 1);
        assert_eq!(unref(&Value::from(1)), 1);
    }
}
