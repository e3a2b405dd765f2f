//! Reactive Primitives
//!
//! This module implements the core reactive system: effects, refs, computed
//! values and watchers, plus the [`Engine`] that ties them together.
//!
//! # Concepts
//!
//! ## Effects
//!
//! An [`Effect`] is a computation whose reads are tracked. When something it
//! read changes, it re-runs, or its scheduler is told. Every other primitive
//! here is built from effects.
//!
//! ## Refs
//!
//! A [`Ref`] is a single observable slot. Reading it inside a computation
//! subscribes the computation; writing a different value notifies it.
//!
//! ## Computed values
//!
//! A [`Computed`] caches the result of a getter and recomputes lazily, on
//! the first read after one of its dependencies changed.
//!
//! ## Watchers
//!
//! [`Engine::watch`] calls a callback with the new and old value of a source
//! whenever it changes, either synchronously or from the job queue.
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic: while a computation runs it sits on
//! the engine's active stack, and every tracked read registers it with the
//! subscriber set for what was read. Before each run the computation leaves
//! all the sets it joined last time.

mod computed;
mod context;
mod effect;
mod reference;
mod runtime;
mod subscriber;
mod watch;

pub use computed::{CacheState, Computed};
pub use context::{ActiveStack, ContextGuard, PauseGuard};
pub use effect::{Effect, EffectOptions, Scheduler, WeakEffect};
pub use reference::{is_ref, unref, Ref};
pub use runtime::Engine;
pub use subscriber::{Dep, SubscriberId};
pub use watch::{Flush, WatchHandle, WatchOptions, WatchSource};
