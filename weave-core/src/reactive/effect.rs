//! Effect Implementation
//!
//! An Effect is a re-runnable computation whose reads are tracked and
//! which re-runs (or is handed to its scheduler) when one of them changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately to establish
//!    initial dependencies, unless it is lazy.
//!
//! 2. When any dependency changes, `trigger` either calls the effect's
//!    scheduler with the effect, or re-runs it directly.
//!
//! 3. Before every run, the effect leaves every subscriber set it joined
//!    last time and tracks afresh, so a body that switches branches never
//!    keeps a stale subscription.
//!
//! # Ownership
//!
//! Subscriber sets hold effects weakly. An effect lives as long as some
//! handle to it does; dropping the last handle removes it from every set
//! it belongs to. [`Effect::dispose`] does the same while handles remain.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::runtime::Engine;
use super::subscriber::{Dep, SubscriberId};
use crate::value::Value;

/// Callback that receives a triggered effect instead of it re-running.
pub type Scheduler = Rc<dyn Fn(&Effect)>;

/// Options for [`Engine::effect_with`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    pub(crate) scheduler: Option<Scheduler>,
    pub(crate) lazy: bool,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run the body at creation.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Hand triggered runs to `scheduler` instead of running directly.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&Effect) + 'static,
    {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

pub(crate) struct EffectInner {
    id: SubscriberId,
    engine: Engine,
    body: Box<dyn Fn() -> Value>,
    scheduler: Option<Scheduler>,

    /// Subscriber sets this effect currently belongs to.
    deps: RefCell<SmallVec<[Dep; 4]>>,

    active: Cell<bool>,
    run_count: Cell<usize>,
}

/// A tracked, re-runnable computation.
///
/// # Example
///
/// ```rust
/// use weave_core::{Engine, Object};
///
/// let engine = Engine::new();
/// let state = engine.reactive(Object::record([("count", 0)]));
///
/// let effect = engine.effect({
///     let state = state.clone();
///     move || println!("count is {}", state.get("count"))
/// });
///
/// state.set("count", 5); // prints "count is 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Effect(Rc<EffectInner>);

/// Non-owning handle to an [`Effect`].
#[derive(Clone)]
pub struct WeakEffect(Weak<EffectInner>);

impl WeakEffect {
    pub fn upgrade(&self) -> Option<Effect> {
        self.0.upgrade().map(Effect)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Effect {
    /// Build an effect without running it.
    pub(crate) fn new<F>(engine: &Engine, body: F, options: EffectOptions) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        Self(Rc::new(EffectInner {
            id: SubscriberId::new(),
            engine: engine.clone(),
            body: Box::new(body),
            scheduler: options.scheduler,
            deps: RefCell::new(SmallVec::new()),
            active: Cell::new(true),
            run_count: Cell::new(0),
        }))
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.0.id
    }

    pub fn engine(&self) -> &Engine {
        &self.0.engine
    }

    /// Run the body now, tracking what it reads, and return its value.
    ///
    /// A disposed effect still runs its body, but untracked.
    pub fn run(&self) -> Value {
        let inner = &self.0;
        if !inner.active.get() {
            return inner.engine.untracked(|| (inner.body)());
        }

        self.cleanup();
        let value = {
            let _ctx = inner.engine.stack().enter(self.clone());
            (inner.body)()
        };
        inner.run_count.set(inner.run_count.get() + 1);
        value
    }

    /// Respond to a trigger: hand off to the scheduler if there is one,
    /// otherwise re-run.
    pub(crate) fn schedule(&self) {
        if !self.0.active.get() {
            return;
        }
        match &self.0.scheduler {
            Some(scheduler) => scheduler(self),
            None => {
                self.run();
            }
        }
    }

    pub fn has_scheduler(&self) -> bool {
        self.0.scheduler.is_some()
    }

    /// Join `dep` and remember it for cleanup.
    pub(crate) fn track(&self, dep: &Dep) -> bool {
        if !dep.insert(self) {
            return false;
        }
        self.0.deps.borrow_mut().push(dep.clone());
        true
    }

    /// Leave every subscriber set this effect belongs to.
    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.0.deps.borrow_mut());
        for dep in &deps {
            dep.remove(self.0.id);
        }
    }

    /// Stop the effect: it leaves all subscriber sets and is never
    /// triggered again.
    pub fn dispose(&self) {
        if self.0.active.replace(false) {
            self.cleanup();
            tracing::debug!(effect = ?self.0.id, "disposed effect");
        }
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.0.run_count.get()
    }

    /// Get the number of subscriber sets the effect belongs to.
    pub fn dependency_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    pub fn downgrade(&self) -> WeakEffect {
        WeakEffect(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Effect) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        for dep in self.deps.get_mut().drain(..) {
            dep.remove(self.id);
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.0.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    #[test]
    fn effect_runs_on_creation() {
        let engine = Engine::new();
        let run_count = Rc::new(Cell::new(0));

        let _effect = engine.effect({
            let run_count = run_count.clone();
            move || run_count.set(run_count.get() + 1)
        });

        // Effect should have run once on creation
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let engine = Engine::new();
        let run_count = Rc::new(Cell::new(0));

        let effect = engine.effect_with(
            {
                let run_count = run_count.clone();
                move || run_count.set(run_count.get() + 1)
            },
            EffectOptions::new().lazy(true),
        );

        assert_eq!(run_count.get(), 0);
        assert_eq!(effect.run_count(), 0);

        // Manually run
        effect.run();
        assert_eq!(run_count.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn run_returns_the_body_value() {
        let engine = Engine::new();
        let effect = engine.effect_with(|| 42, EffectOptions::new().lazy(true));
        assert_eq!(effect.run(), 42);
    }

    #[test]
    fn dispose_clears_dependencies() {
        let engine = Engine::new();
        let state = engine.reactive(Object::record([("a", 1)]));

        let effect = engine.effect({
            let state = state.clone();
            move || state.get("a")
        });
        assert_eq!(effect.dependency_count(), 1);

        effect.dispose();
        assert!(!effect.is_active());
        assert_eq!(effect.dependency_count(), 0);

        state.set("a", 2);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn dropping_the_last_handle_unsubscribes() {
        let engine = Engine::new();
        let state = engine.reactive(Object::record([("a", 1)]));
        let raw = state.raw().clone();

        {
            let _effect = engine.effect({
                let state = state.clone();
                move || state.get("a")
            });
            assert_eq!(engine.subscriber_count(&raw, &"a".into()), 1);
        }
        assert_eq!(engine.subscriber_count(&raw, &"a".into()), 0);
    }

    #[test]
    fn effect_clone_shares_state() {
        let engine = Engine::new();
        let effect1 = engine.effect(|| ());
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        assert!(effect1.ptr_eq(&effect2));

        effect1.run();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(!effect2.is_active());
    }
}
