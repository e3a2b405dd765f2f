//! Weave Core
//!
//! This crate provides the core runtime for the Weave reactive state engine.
//! It implements:
//!
//! - Observation wrappers over structured values (records, lists, maps,
//!   sets) in deep, shallow and readonly flavours
//! - Dependency tracking from reads to the computations that made them
//! - Effects, refs, computed values and watchers
//! - A deduplicating job queue for deferred work
//!
//! Everything hangs off an [`Engine`]. There is no global state: two engines
//! never observe each other.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: raw values and objects, which know nothing about tracking
//! - `proxy`: the wrappers that turn reads into tracks and writes into
//!   triggers
//! - `reactive`: the engine, effects, refs, computed values and watchers
//! - `graph`: the observation store and the job queue
//! - `config`: engine tuning knobs
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use weave_core::{Engine, Object};
//!
//! let engine = Engine::new();
//! let state = engine.reactive(Object::record([("count", 0)]));
//!
//! let seen = Rc::new(Cell::new(0.0));
//! let _effect = engine.effect({
//!     let state = state.clone();
//!     let seen = seen.clone();
//!     move || seen.set(state.get("count").as_number().unwrap_or(0.0))
//! });
//!
//! state.set("count", 5);
//! assert_eq!(seen.get(), 5.0);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod proxy;
pub mod reactive;
pub mod value;

pub use config::EngineConfig;
pub use error::{ReactiveError, Result};
pub use graph::{Job, TrackKey, TriggerOp};
pub use proxy::{is_reactive, is_readonly, proxy_refs, to_raw, Mode, Reactive, RefProxy};
pub use reactive::{
    is_ref, unref, Computed, Effect, EffectOptions, Engine, Flush, Ref, WatchHandle, WatchOptions,
};
pub use value::{Object, ShapeKind, Value};
