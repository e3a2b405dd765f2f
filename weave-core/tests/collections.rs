//! Integration Tests for Map and Set Wrappers

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weave_core::{is_reactive, Engine, Object, Reactive, Value};

fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

/// An effect running `read` against `target`, counting its runs.
fn observe(
    engine: &Engine,
    target: &Reactive,
    read: impl Fn(&Reactive) + 'static,
) -> (weave_core::Effect, Rc<Cell<usize>>) {
    let calls = counter();
    let effect = engine.effect({
        let target = target.clone();
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            read(&target);
        }
    });
    (effect, calls)
}

/// Test that a set wrapper exposes its size and methods.
#[test]
fn set_size_and_delete() {
    let engine = Engine::new();
    let p = engine.reactive(Object::set([1, 2, 3]));

    assert_eq!(p.size(), 3);
    assert!(p.delete(1));
    assert_eq!(p.size(), 2);
}

/// Test that a map wrapper exposes its size and methods.
#[test]
fn map_size_and_delete() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("key", 1)]));

    assert_eq!(p.size(), 1);
    assert!(p.delete("key"));
    assert_eq!(p.size(), 0);
}

/// Test that adding an existing member does not notify size readers.
#[test]
fn set_add_notifies_only_on_growth() {
    let engine = Engine::new();
    let p = engine.reactive(Object::set([1, 2, 3]));
    let size = Rc::new(Cell::new(0));

    let (_e, calls) = observe(&engine, &p, {
        let size = size.clone();
        move |p| size.set(p.size())
    });

    p.add(1).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(size.get(), 3);

    p.add(4).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(size.get(), 4);
}

/// Test that deleting a map key re-runs its readers.
#[test]
fn map_delete_reruns_reader() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("key", 1)]));
    let seen = Rc::new(RefCell::new(Value::Undefined));

    let (_e, calls) = observe(&engine, &p, {
        let seen = seen.clone();
        move |p| *seen.borrow_mut() = p.get("key")
    });
    assert_eq!(*seen.borrow(), 1);

    p.delete("key");
    assert!(seen.borrow().is_undefined());
    assert_eq!(calls.get(), 2);
}

/// Test that a map write only notifies readers of that key.
#[test]
fn map_get_tracks_one_key() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("a", 1), ("b", 1)]));

    let (_e, calls) = observe(&engine, &p, |p| {
        p.get("a");
    });

    p.set("b", 2);
    assert_eq!(calls.get(), 1);
    p.set("a", 2);
    assert_eq!(calls.get(), 2);
    p.set("a", 2);
    assert_eq!(calls.get(), 2);
}

/// Test that raw collections store raw objects, not wrappers.
#[test]
fn raw_collections_never_hold_wrappers() {
    let engine = Engine::new();
    let m = Object::map(Vec::<(Value, Value)>::new());
    let p1 = engine.reactive(&m);
    let p2 = engine.reactive(Object::map(Vec::<(Value, Value)>::new()));
    p1.set("p2", &p2);

    let calls = counter();
    let _e = engine.effect({
        let m = m.clone();
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            if let Some(inner) = m.get("p2").as_object() {
                inner.len();
            }
        }
    });

    let stored = m.get("p2");
    assert!(stored.as_object().is_some());
    if let Some(inner) = stored.as_object() {
        inner.insert("foo", 1);
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(p2.get("foo"), 1);
}

/// Test that `for_each` re-runs when an entry is added.
#[test]
fn for_each_tracks_additions() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([(
        Object::record([("key", 1)]),
        Object::record([("value", 1)]),
    )]));

    let (_e, calls) = observe(&engine, &p, |p| p.for_each(|_value, _key| {}));

    p.set(Object::record([("key", 2)]), Object::record([("value", 2)]));
    assert_eq!(calls.get(), 2);
}

/// Test that `for_each` hands out wrapped values that track themselves.
#[test]
fn for_each_arguments_are_reactive() {
    let engine = Engine::new();
    let key = Object::record([("key", 1)]);
    let value = Object::set([1, 2, 3]);
    let p = engine.reactive(Object::map([(&key, &value)]));

    let (_e, calls) = observe(&engine, &p, |p| {
        p.for_each(|value, key| {
            assert!(is_reactive(&key));
            if let Some(set) = value.as_reactive() {
                set.size();
            }
        })
    });

    if let Some(set) = p.get(&key).as_reactive() {
        set.delete(1);
    }
    assert_eq!(calls.get(), 2);
}

/// Test that `for_each` also depends on values, not just keys.
#[test]
fn for_each_tracks_value_changes() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("key", 1)]));

    let (_e, calls) = observe(&engine, &p, |p| p.for_each(|_value, _key| {}));

    p.set("key", 2);
    assert_eq!(calls.get(), 2);
}

/// Test that iterating the wrapper depends on additions.
#[test]
fn iteration_tracks_additions() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("key1", "value1"), ("key2", "value2")]));

    let (_e, calls) = observe(&engine, &p, |p| for (_key, _value) in p {});

    p.set("key3", "value3");
    assert_eq!(calls.get(), 2);
}

/// Test that `entries` depends on additions.
#[test]
fn entries_track_additions() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("key1", "value1"), ("key2", "value2")]));

    let (_e, calls) = observe(&engine, &p, |p| for (_key, _value) in p.entries() {});

    p.set("key3", "value3");
    assert_eq!(calls.get(), 2);
}

/// Test that iteration yields wrapped keys and values.
#[test]
fn iteration_yields_wrappers() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([(
        Object::record([("key", 1)]),
        Object::record([("value", 1)]),
    )]));
    let last = Rc::new(RefCell::new((Value::Undefined, Value::Undefined)));

    let _e = observe(&engine, &p, {
        let last = last.clone();
        move |p| {
            for entry in p {
                *last.borrow_mut() = entry;
            }
        }
    });

    let (key, value) = last.borrow().clone();
    assert!(is_reactive(&key));
    assert!(is_reactive(&value));
}

/// Test that `values` depends on additions.
#[test]
fn values_track_additions() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("key1", "value1"), ("key2", "value2")]));

    let (_e, calls) = observe(&engine, &p, |p| for _value in p.values() {});

    p.set("key3", "value3");
    assert_eq!(calls.get(), 2);
}

/// Test that `keys` ignores value-only changes.
#[test]
fn keys_ignore_value_changes() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("key1", "value1"), ("key2", "value2")]));

    let (_e, calls) = observe(&engine, &p, |p| for _key in p.keys() {});

    p.set("key2", "value3");
    assert_eq!(calls.get(), 1);

    p.set("key3", "value3");
    assert_eq!(calls.get(), 2);
}

/// Test that clearing notifies every reader of the collection.
#[test]
fn clear_notifies_everyone() {
    let engine = Engine::new();
    let p = engine.reactive(Object::map([("a", 1), ("b", 2)]));

    let (_get, get_calls) = observe(&engine, &p, |p| {
        p.get("a");
    });
    let (_keys, key_calls) = observe(&engine, &p, |p| for _key in p.keys() {});

    p.clear().unwrap();
    assert_eq!(get_calls.get(), 2);
    assert_eq!(key_calls.get(), 2);
    assert_eq!(p.size(), 0);

    // clearing an empty collection is not a change
    p.clear().unwrap();
    assert_eq!(get_calls.get(), 2);
}

/// Test that set membership checks track the member.
#[test]
fn set_has_tracks_the_member() {
    let engine = Engine::new();
    let p = engine.reactive(Object::set([1]));
    let present = Rc::new(Cell::new(false));

    let (_e, calls) = observe(&engine, &p, {
        let present = present.clone();
        move |p| present.set(p.has(2))
    });
    assert!(!present.get());

    p.add(2).unwrap();
    assert!(present.get());
    assert_eq!(calls.get(), 2);
}

/// Test that set members added through a wrapper are stored raw.
#[test]
fn set_add_stores_raw_members() {
    let engine = Engine::new();
    let raw = Object::set(Vec::<Value>::new());
    let p = engine.reactive(&raw);
    let member = engine.reactive(Object::record([("id", 1)]));

    assert!(p.add(&member).unwrap());
    assert!(raw.contains(member.raw()));
    assert!(!p.add(member.raw()).unwrap());
    assert!(p.has(&member));
}
