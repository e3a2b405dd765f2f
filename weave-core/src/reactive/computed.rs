//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computed Values Work
//!
//! 1. The getter runs inside a lazy effect, so nothing is computed until
//!    the first read.
//!
//! 2. When a dependency changes, the effect's scheduler does not re-run the
//!    getter. It marks the cache dirty and, if it was clean, notifies the
//!    computations that read this computed value.
//!
//! 3. The next read re-runs the getter and caches the result.
//!
//! A burst of writes therefore costs at most one recomputation, and only
//! if someone reads the value afterwards.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::effect::{Effect, EffectOptions};
use super::runtime::Engine;
use super::subscriber::Dep;
use crate::value::Value;

/// Cache state for a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed since the last computation.
    Dirty,
}

struct ComputedInner {
    engine: Engine,
    effect: Effect,
    value: RefCell<Value>,
    state: Cell<CacheState>,

    /// Computations that read this computed value.
    dep: Dep,
}

impl ComputedInner {
    fn invalidate(&self) {
        if self.state.replace(CacheState::Dirty) == CacheState::Clean {
            self.engine.trigger_dep(&self.dep);
        }
    }
}

/// A lazily evaluated, cached derived value.
///
/// # Example
///
/// ```rust
/// use weave_core::{Engine, Object};
///
/// let engine = Engine::new();
/// let obj = engine.reactive(Object::record([("foo", 1), ("bar", 2)]));
///
/// let sum = engine.computed({
///     let obj = obj.clone();
///     move || {
///         let foo = obj.get("foo").as_number().unwrap_or(0.0);
///         let bar = obj.get("bar").as_number().unwrap_or(0.0);
///         foo + bar
///     }
/// });
///
/// assert_eq!(sum.get(), 3);
/// obj.set("foo", 2);
/// assert_eq!(sum.get(), 4);
/// ```
#[derive(Clone)]
pub struct Computed(Rc<ComputedInner>);

impl Computed {
    fn new<F>(engine: &Engine, getter: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        Self(Rc::new_cyclic(|weak: &Weak<ComputedInner>| {
            let weak = weak.clone();
            let options = EffectOptions::new().lazy(true).scheduler(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.invalidate();
                }
            });
            ComputedInner {
                engine: engine.clone(),
                effect: engine.effect_with(getter, options),
                value: RefCell::new(Value::Undefined),
                state: Cell::new(CacheState::Dirty),
                dep: Dep::new(),
            }
        }))
    }

    /// Get the current value, recomputing if a dependency changed.
    ///
    /// Reading inside a computation makes it depend on this value.
    pub fn get(&self) -> Value {
        let inner = &self.0;
        if inner.state.get() == CacheState::Dirty {
            let value = inner.effect.run();
            *inner.value.borrow_mut() = value;
            inner.state.set(CacheState::Clean);
        }
        inner.engine.track_dep(&inner.dep);
        inner.value.borrow().clone()
    }

    pub fn state(&self) -> CacheState {
        self.0.state.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.state.get() == CacheState::Dirty
    }

    /// The lazy effect running the getter.
    pub fn effect(&self) -> &Effect {
        &self.0.effect
    }

    /// Number of live computations reading this value.
    pub fn subscriber_count(&self) -> usize {
        self.0.dep.live_count()
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("state", &self.state())
            .field("effect", &self.0.effect.id())
            .finish()
    }
}

impl Engine {
    /// Create a computed value over `getter`. Nothing runs until the first
    /// read.
    #[must_use = "the computed value stops updating when its handle is dropped"]
    pub fn computed<F, R>(&self, getter: F) -> Computed
    where
        F: Fn() -> R + 'static,
        R: Into<Value>,
    {
        Computed::new(self, move || getter().into())
    }
}
