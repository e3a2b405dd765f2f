//! Reactive Runtime
//!
//! The [`Engine`] is the central coordinator that connects wrappers, refs,
//! computed values and effects. It owns the observation store, the wrapper
//! identity cache, the active stack and the job queue; nothing is global,
//! so two engines never see each other's state.
//!
//! # How It Works
//!
//! 1. When a computation runs, it is pushed onto the active stack.
//!
//! 2. When a wrapper is read, it calls [`Engine::track`], which adds the
//!    current computation to the subscriber set for `(object, key)`.
//!
//! 3. When a wrapper is written, it calls [`Engine::trigger`], which:
//!    a. Collects the subscriber set for the key
//!    b. Adds the sets implied by the kind of write (length for list
//!       appends, truncated elements for length writes, the iteration keys
//!       for additions and removals)
//!    c. Drops the computation that is currently running, so that a
//!       body writing what it reads does not loop
//!    d. Runs each remaining computation once, through its scheduler if
//!       it has one

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::context::ActiveStack;
use super::effect::{Effect, EffectOptions};
use super::subscriber::{Dep, SubscriberId};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::{Job, JobQueue, ObservationStore, TrackKey, TriggerOp};
use crate::proxy::ProxyCache;
use crate::value::{Object, ShapeKind, Value};

pub(crate) struct EngineInner {
    config: EngineConfig,
    store: RefCell<ObservationStore>,
    proxies: RefCell<ProxyCache>,
    stack: ActiveStack,
    jobs: JobQueue,

    /// Combined store and cache size that triggers the next sweep.
    sweep_at: Cell<usize>,
}

/// Handle to one reactive engine instance.
///
/// Cloning the handle is cheap and shares the instance.
#[derive(Clone)]
pub struct Engine(Rc<EngineInner>);

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let sweep_at = config.sweep_threshold;
        Self(Rc::new(EngineInner {
            config,
            store: RefCell::new(ObservationStore::new()),
            proxies: RefCell::new(ProxyCache::default()),
            stack: ActiveStack::new(),
            jobs: JobQueue::new(),
            sweep_at: Cell::new(sweep_at),
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.0.config
    }

    pub fn stack(&self) -> &ActiveStack {
        &self.0.stack
    }

    pub(crate) fn proxies(&self) -> &RefCell<ProxyCache> {
        &self.0.proxies
    }

    pub fn ptr_eq(&self, other: &Engine) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------
    // Tracking state
    // ------------------------------------------------------------------

    /// The computation currently running, if any.
    pub fn current_effect(&self) -> Option<Effect> {
        self.0.stack.current()
    }

    pub fn pause_tracking(&self) {
        self.0.stack.pause();
    }

    pub fn resume_tracking(&self) {
        self.0.stack.resume();
    }

    /// Whether a read right now would be recorded.
    pub fn is_tracking(&self) -> bool {
        self.0.stack.should_track()
    }

    /// Run `f` with tracking paused.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _pause = self.0.stack.pause_scope();
        f()
    }

    // ------------------------------------------------------------------
    // Track / trigger
    // ------------------------------------------------------------------

    /// Record that the running computation read `key` on `target`.
    pub fn track(&self, target: &Object, key: TrackKey) {
        if !self.is_tracking() {
            return;
        }
        let Some(effect) = self.0.stack.current() else {
            return;
        };
        tracing::trace!(target_id = target.id().raw(), key = %key, effect = ?effect.id(), "track");
        let dep = self.0.store.borrow_mut().dep(target, key);
        effect.track(&dep);
        self.maybe_sweep();
    }

    /// Record that the running computation read a private subscriber set
    /// (a ref or computed value).
    pub(crate) fn track_dep(&self, dep: &Dep) {
        if !self.is_tracking() {
            return;
        }
        if let Some(effect) = self.0.stack.current() {
            effect.track(dep);
        }
    }

    /// Report a write of kind `op` to `key` on `target` and run every
    /// computation that depends on it.
    ///
    /// `new_value` is only consulted for list `length` writes, where it is
    /// the new length.
    pub fn trigger(&self, target: &Object, key: TrackKey, op: TriggerOp, new_value: Option<&Value>) {
        let mut to_run: IndexMap<SubscriberId, Effect> = IndexMap::new();
        {
            let store = self.0.store.borrow();
            let Some(registry) = store.registry(target.id()) else {
                return;
            };
            let mut collect = |dep: Option<&Dep>| {
                if let Some(dep) = dep {
                    for effect in dep.subscribers() {
                        to_run.entry(effect.id()).or_insert(effect);
                    }
                }
            };

            let kind = target.kind();
            if op == TriggerOp::Clear {
                for (_, dep) in registry.iter() {
                    collect(Some(dep));
                }
            } else {
                collect(registry.get(&key));

                if op == TriggerOp::Add && kind == ShapeKind::List {
                    collect(registry.get(&TrackKey::Length));
                }

                if kind == ShapeKind::List && key == TrackKey::Length {
                    let len = new_value.and_then(Value::as_index).unwrap_or(0);
                    for (tracked, dep) in registry.iter() {
                        if matches!(tracked, TrackKey::Index(i) if *i >= len) {
                            collect(Some(dep));
                        }
                    }
                }

                let structural = matches!(op, TriggerOp::Add | TriggerOp::Delete);
                if structural || (op == TriggerOp::Set && kind == ShapeKind::Map) {
                    collect(registry.get(&TrackKey::Iterate));
                }
                if structural && kind == ShapeKind::Map {
                    collect(registry.get(&TrackKey::MapKeyIterate));
                }
            }
        }

        tracing::trace!(
            target_id = target.id().raw(),
            key = %key,
            op = ?op,
            candidates = to_run.len(),
            "trigger"
        );
        self.run_effects(to_run.into_values());
    }

    /// Run every subscriber of a private subscriber set.
    pub(crate) fn trigger_dep(&self, dep: &Dep) {
        self.run_effects(dep.subscribers());
    }

    fn run_effects(&self, effects: impl IntoIterator<Item = Effect>) {
        let current = self.0.stack.current_id();
        for effect in effects {
            if Some(effect.id()) == current {
                continue;
            }
            effect.schedule();
        }
    }

    // ------------------------------------------------------------------
    // Computations
    // ------------------------------------------------------------------

    /// Create an effect and run it once.
    #[must_use = "the effect stops when its handle is dropped"]
    pub fn effect<F, R>(&self, body: F) -> Effect
    where
        F: Fn() -> R + 'static,
        R: Into<Value>,
    {
        self.effect_with(body, EffectOptions::default())
    }

    /// Create an effect with options. Unless `lazy` is set, it runs once
    /// before this returns.
    #[must_use = "the effect stops when its handle is dropped"]
    pub fn effect_with<F, R>(&self, body: F, options: EffectOptions) -> Effect
    where
        F: Fn() -> R + 'static,
        R: Into<Value>,
    {
        let lazy = options.lazy;
        let effect = Effect::new(self, move || body().into(), options);
        tracing::debug!(effect = ?effect.id(), lazy, "created effect");
        if !lazy {
            effect.run();
        }
        effect
    }

    // ------------------------------------------------------------------
    // Job queue
    // ------------------------------------------------------------------

    pub fn jobs(&self) -> &JobQueue {
        &self.0.jobs
    }

    pub fn queue_job(&self, job: Job) -> bool {
        self.0.jobs.queue_job(job)
    }

    pub fn queue_post_flush(&self, job: Job) -> bool {
        self.0.jobs.queue_post_flush(job)
    }

    /// Drain the job queue, pre jobs first.
    pub fn flush_jobs(&self) -> Result<usize> {
        self.0.jobs.flush(self.0.config.recursion_limit)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Drop store registries and cached wrappers whose object is gone.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let registries = self.0.store.borrow_mut().sweep();
        let wrappers = self.0.proxies.borrow_mut().sweep();
        let survivors = self.0.store.borrow().len() + self.0.proxies.borrow().len();
        self.0
            .sweep_at
            .set(self.0.config.sweep_threshold.max(survivors * 2));
        tracing::debug!(registries, wrappers, survivors, "swept engine");
        registries + wrappers
    }

    pub(crate) fn maybe_sweep(&self) {
        let size = self.0.store.borrow().len() + self.0.proxies.borrow().len();
        if size >= self.0.sweep_at.get() {
            self.sweep();
        }
    }

    /// Number of objects with a key registry.
    pub fn observed_count(&self) -> usize {
        self.0.store.borrow().len()
    }

    /// Number of live computations subscribed to `(target, key)`.
    pub fn subscriber_count(&self, target: &Object, key: &TrackKey) -> usize {
        self.0
            .store
            .borrow()
            .registry(target.id())
            .and_then(|registry| registry.get(key))
            .map_or(0, Dep::live_count)
    }

    pub(crate) fn warn_readonly(&self, op: &'static str, key: &Value) {
        if self.0.config.warn_on_readonly {
            tracing::warn!(op, key = %key, "write refused: target is readonly");
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("observed", &self.observed_count())
            .field("depth", &self.0.stack.depth())
            .field("pending_jobs", &self.0.jobs.pending())
            .finish()
    }
}
