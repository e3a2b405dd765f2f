//! Watch Implementation
//!
//! A watcher runs a callback with the new and the previous value whenever
//! its source changes. It is a lazy effect whose scheduler, instead of
//! re-running the body, re-evaluates the source and calls the callback.
//!
//! A source is either a getter or a value. A value source is read deeply:
//! every key reachable from it is visited so that a write anywhere inside
//! notifies the watcher. Cycles are cut with a visited set keyed by object
//! identity.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use super::computed::Computed;
use super::effect::{Effect, EffectOptions};
use super::reference::Ref;
use super::runtime::Engine;
use crate::graph::Job;
use crate::proxy::Reactive;
use crate::value::{Object, ObjectId, ShapeKind, Value};

/// What a watcher observes.
#[derive(Clone)]
pub enum WatchSource {
    /// Re-evaluated on every change; its result is the watched value.
    Getter(Rc<dyn Fn() -> Value>),
    /// Traversed deeply; the value itself is passed to the callback.
    Value(Value),
}

impl WatchSource {
    pub fn getter<F, R>(getter: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: Into<Value>,
    {
        WatchSource::Getter(Rc::new(move || getter().into()))
    }
}

impl From<Value> for WatchSource {
    fn from(value: Value) -> Self {
        WatchSource::Value(value)
    }
}

impl From<Reactive> for WatchSource {
    fn from(proxy: Reactive) -> Self {
        WatchSource::Value(Value::Reactive(proxy))
    }
}

impl From<&Reactive> for WatchSource {
    fn from(proxy: &Reactive) -> Self {
        WatchSource::Value(Value::Reactive(proxy.clone()))
    }
}

impl From<Object> for WatchSource {
    fn from(object: Object) -> Self {
        WatchSource::Value(Value::Object(object))
    }
}

impl From<Ref> for WatchSource {
    fn from(r: Ref) -> Self {
        WatchSource::Value(Value::Ref(r))
    }
}

impl From<&Ref> for WatchSource {
    fn from(r: &Ref) -> Self {
        WatchSource::Value(Value::Ref(r.clone()))
    }
}

impl From<Computed> for WatchSource {
    fn from(computed: Computed) -> Self {
        WatchSource::getter(move || computed.get())
    }
}

/// When the callback runs relative to the write that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    /// Synchronously, before the write returns.
    #[default]
    Pre,
    /// From the engine's post-flush queue, on the next `flush_jobs`.
    Post,
}

/// Options for [`Engine::watch_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    pub immediate: bool,
    pub flush: Flush,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call the callback once at creation, with `Undefined` as the old value.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn flush(mut self, flush: Flush) -> Self {
        self.flush = flush;
        self
    }
}

type Callback = Box<dyn Fn(&Value, &Value)>;

struct Watcher {
    effect: Effect,
    callback: Callback,
    old: RefCell<Value>,
    /// Jobs of this watcher currently on the call stack.
    depth: Cell<usize>,
}

impl Watcher {
    fn job(&self) {
        if !self.effect.is_active() {
            return;
        }
        let limit = self.effect.engine().config().recursion_limit;
        if self.depth.get() >= limit {
            tracing::warn!(
                effect = ?self.effect.id(),
                limit,
                "watch callback re-triggered itself too deeply; dropping nested run"
            );
            return;
        }
        self.depth.set(self.depth.get() + 1);
        let new = self.effect.run();
        let old = self.old.replace(new.clone());
        (self.callback)(&new, &old);
        self.depth.set(self.depth.get() - 1);
    }
}

/// Keeps a watch alive. Dropping the handle stops the watch.
#[must_use = "the watch stops when its handle is dropped"]
pub struct WatchHandle {
    watcher: Rc<Watcher>,
}

impl WatchHandle {
    /// Stop watching. Pending deferred callbacks are dropped.
    pub fn stop(&self) {
        self.watcher.effect.dispose();
    }

    pub fn is_active(&self) -> bool {
        self.watcher.effect.is_active()
    }

    pub fn effect(&self) -> &Effect {
        &self.watcher.effect
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("effect", &self.watcher.effect.id())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Read everything reachable from `value` so that it is all tracked.
fn traverse(value: &Value, seen: &mut HashSet<ObjectId>) {
    match value {
        Value::Ref(r) => traverse(&r.get(), seen),
        Value::Reactive(proxy) => {
            if !seen.insert(proxy.raw().id()) {
                return;
            }
            match proxy.kind() {
                ShapeKind::Record | ShapeKind::List => {
                    for key in proxy.keys() {
                        traverse(&proxy.get(key), seen);
                    }
                }
                ShapeKind::Map | ShapeKind::Set => {
                    for (key, value) in proxy.entries() {
                        traverse(&key, seen);
                        traverse(&value, seen);
                    }
                }
            }
        }
        Value::Object(object) => {
            if !seen.insert(object.id()) {
                return;
            }
            for (key, value) in object.entries() {
                traverse(&key, seen);
                traverse(&value, seen);
            }
        }
        _ => {}
    }
}

impl Engine {
    /// Watch `source`, calling `callback(new, old)` synchronously on every
    /// change.
    #[must_use = "the watch stops when its handle is dropped"]
    pub fn watch<S, F>(&self, source: S, callback: F) -> WatchHandle
    where
        S: Into<WatchSource>,
        F: Fn(&Value, &Value) + 'static,
    {
        self.watch_with(source, callback, WatchOptions::default())
    }

    #[must_use = "the watch stops when its handle is dropped"]
    pub fn watch_with<S, F>(&self, source: S, callback: F, options: WatchOptions) -> WatchHandle
    where
        S: Into<WatchSource>,
        F: Fn(&Value, &Value) + 'static,
    {
        let getter: Rc<dyn Fn() -> Value> = match source.into() {
            WatchSource::Getter(getter) => getter,
            WatchSource::Value(Value::Ref(r)) => Rc::new(move || {
                let value = r.get();
                traverse(&value, &mut HashSet::new());
                value
            }),
            WatchSource::Value(value) => Rc::new(move || {
                traverse(&value, &mut HashSet::new());
                value.clone()
            }),
        };

        let watcher = Rc::new_cyclic(|weak: &Weak<Watcher>| {
            let weak = weak.clone();
            let flush = options.flush;
            let scheduler = move |effect: &Effect| match flush {
                Flush::Pre => {
                    if let Some(watcher) = weak.upgrade() {
                        watcher.job();
                    }
                }
                Flush::Post => {
                    let weak = weak.clone();
                    effect.engine().queue_post_flush(Job::new(effect.id(), move || {
                        if let Some(watcher) = weak.upgrade() {
                            watcher.job();
                        }
                    }));
                }
            };
            let options = EffectOptions::new().lazy(true).scheduler(scheduler);
            Watcher {
                effect: self.effect_with(move || getter(), options),
                callback: Box::new(callback),
                old: RefCell::new(Value::Undefined),
                depth: Cell::new(0),
            }
        });

        if options.immediate {
            watcher.job();
        } else {
            let initial = watcher.effect.run();
            *watcher.old.borrow_mut() = initial;
        }
        tracing::debug!(effect = ?watcher.effect.id(), flush = ?options.flush, "created watcher");

        WatchHandle { watcher }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, impl Fn(&Value, &Value)) {
        let calls = Rc::new(Cell::new(0));
        let callback = {
            let calls = calls.clone();
            move |_: &Value, _: &Value| calls.set(calls.get() + 1)
        };
        (calls, callback)
    }

    #[test]
    fn traverse_survives_cycles() {
        let engine = Engine::new();
        let node = Object::record([("name", "a")]);
        node.insert("me", &node);
        let state = engine.reactive(&node);

        let (calls, callback) = counter();
        let _w = engine.watch(&state, callback);
        state.set("name", "b");
        assert_eq!(calls.get(), 1);

        node.remove("me");
    }

    #[test]
    fn stopped_watch_stays_quiet() {
        let engine = Engine::new();
        let state = engine.reactive(Object::record([("a", 1)]));
        let (calls, callback) = counter();

        let handle = engine.watch(&state, callback);
        handle.stop();
        assert!(!handle.is_active());

        state.set("a", 2);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn watching_a_ref_reads_through_it() {
        let engine = Engine::new();
        let count = engine.new_ref(Object::record([("n", 1)]));
        let last = Rc::new(RefCell::new((Value::Undefined, Value::Undefined)));
        let calls = Rc::new(Cell::new(0));
        let _w = engine.watch(&count, {
            let last = last.clone();
            let calls = calls.clone();
            move |new: &Value, old: &Value| {
                calls.set(calls.get() + 1);
                *last.borrow_mut() = (new.clone(), old.clone());
            }
        });
        let first = count.get();

        if let Some(inner) = first.as_reactive() {
            inner.set("n", 2);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(last.borrow().0, first);

        count.set(5);
        assert_eq!(calls.get(), 2);
        let (new, old) = last.borrow().clone();
        assert_eq!(new, 5);
        assert_eq!(old, first);
    }

    #[test]
    fn watching_a_primitive_ref_sees_its_values() {
        let engine = Engine::new();
        let count = engine.new_ref(1);
        let last = Rc::new(RefCell::new((Value::Undefined, Value::Undefined)));
        let _w = engine.watch(&count, {
            let last = last.clone();
            move |new: &Value, old: &Value| *last.borrow_mut() = (new.clone(), old.clone())
        });

        count.set(5);
        let (new, old) = last.borrow().clone();
        assert_eq!(new, 5);
        assert_eq!(old, 1);
    }

    #[test]
    fn watching_a_computed() {
        let engine = Engine::new();
        let state = engine.reactive(Object::record([("a", 1)]));
        let doubled = engine.computed({
            let state = state.clone();
            move || state.get("a").as_number().unwrap_or(0.0) * 2.0
        });

        let last = Rc::new(RefCell::new((Value::Undefined, Value::Undefined)));
        let _w = engine.watch(doubled, {
            let last = last.clone();
            move |new: &Value, old: &Value| *last.borrow_mut() = (new.clone(), old.clone())
        });

        state.set("a", 3);
        let (new, old) = last.borrow().clone();
        assert_eq!(new, 6);
        assert_eq!(old, 2);
    }
}
