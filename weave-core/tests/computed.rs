//! Integration Tests for Computed Values

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weave_core::{Engine, Object, Reactive, Value};

fn sum(obj: &Reactive) -> f64 {
    obj.get("foo").as_number().unwrap_or(0.0) + obj.get("bar").as_number().unwrap_or(0.0)
}

/// Test that a computed value reads its getter.
#[test]
fn computed_reads_getter() {
    let engine = Engine::new();
    let obj = engine.reactive(Object::record([("foo", 1), ("bar", 2)]));

    let total = engine.computed({
        let obj = obj.clone();
        move || sum(&obj)
    });

    assert_eq!(total.get(), 3);
}

/// Test that repeated reads without writes run the getter once.
#[test]
fn computed_caches() {
    let engine = Engine::new();
    let obj = engine.reactive(Object::record([("foo", 1), ("bar", 2)]));
    let calls = Rc::new(Cell::new(0));

    let total = engine.computed({
        let obj = obj.clone();
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            sum(&obj)
        }
    });

    assert_eq!(total.get(), 3);
    assert_eq!(total.get(), 3);
    assert_eq!(calls.get(), 1);
}

/// Test that an effect reading a computed value follows its dependencies.
#[test]
fn computed_inside_effect() {
    let engine = Engine::new();
    let obj = engine.reactive(Object::record([("foo", 1), ("bar", 2)]));
    let total = engine.computed({
        let obj = obj.clone();
        move || sum(&obj)
    });

    let res = Rc::new(RefCell::new(Value::Undefined));
    let _e = engine.effect({
        let total = total.clone();
        let res = res.clone();
        move || *res.borrow_mut() = total.get()
    });

    let next = obj.get("foo").as_number().unwrap_or(0.0) + 1.0;
    obj.set("foo", next);
    assert_eq!(*res.borrow(), 4);
}

/// Test that a computed value can read another computed value.
#[test]
fn computed_chains() {
    let engine = Engine::new();
    let obj = engine.reactive(Object::record([("foo", 1), ("bar", 2)]));
    let total = engine.computed({
        let obj = obj.clone();
        move || sum(&obj)
    });
    let doubled = engine.computed({
        let total = total.clone();
        move || total.get().as_number().unwrap_or(0.0) * 2.0
    });

    let seen = Rc::new(RefCell::new(Value::Undefined));
    let _e = engine.effect({
        let doubled = doubled.clone();
        let seen = seen.clone();
        move || *seen.borrow_mut() = doubled.get()
    });
    assert_eq!(*seen.borrow(), 6);

    obj.set("bar", 4);
    assert_eq!(*seen.borrow(), 10);
}

/// Test that an unread computed value does not recompute on writes.
#[test]
fn computed_stays_lazy_after_invalidation() {
    let engine = Engine::new();
    let obj = engine.reactive(Object::record([("foo", 1), ("bar", 2)]));
    let calls = Rc::new(Cell::new(0));
    let total = engine.computed({
        let obj = obj.clone();
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            sum(&obj)
        }
    });
    total.get();

    for i in 0..5 {
        obj.set("foo", i);
    }
    assert_eq!(calls.get(), 1);
    assert!(total.is_dirty());
    assert_eq!(total.get(), 6);
    assert_eq!(calls.get(), 2);
}

/// Test that a computed over a ref follows the ref.
#[test]
fn computed_over_ref() {
    let engine = Engine::new();
    let count = engine.new_ref(1);
    let plus_one = engine.computed({
        let count = count.clone();
        move || count.get().as_number().unwrap_or(0.0) + 1.0
    });

    assert_eq!(plus_one.get(), 2);
    count.set(5);
    assert_eq!(plus_one.get(), 6);
}
