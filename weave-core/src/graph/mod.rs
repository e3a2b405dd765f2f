//! Dependency Graph
//!
//! This module holds the two pieces of shared bookkeeping behind the
//! reactive system.
//!
//! # Overview
//!
//! - The [`ObservationStore`] records, for every observed object, which
//!   computations read which of its keys. `track` writes to it and
//!   `trigger` reads from it.
//! - The [`JobQueue`] is the host-side queue that schedulers (and deferred
//!   watchers) hand work to. Jobs are deduplicated by id and drained in two
//!   phases, pre then post.
//!
//! Edges are stored in both directions: the store maps keys to subscriber
//! sets, and every computation keeps the list of sets it belongs to so
//! that it can leave all of them before re-running.

mod scheduler;
mod store;

pub use scheduler::{Job, JobQueue};
pub use store::{KeyRegistry, ObservationStore, TrackKey, TriggerOp};
