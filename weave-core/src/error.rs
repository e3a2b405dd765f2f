//! Error types for the Weave engine.
//!
//! Most engine operations cannot fail: reads and writes through wrappers
//! either succeed or are defined no-ops (a readonly write logs a warning and
//! reports success). The variants here cover the few places where a caller
//! asked for something that has no meaning.

use thiserror::Error;

use crate::reactive::SubscriberId;
use crate::value::ShapeKind;

/// Errors surfaced by the engine.
#[derive(Error, Debug)]
pub enum ReactiveError {
    /// A shape-specific operation was called on a value of another shape,
    /// e.g. `push` on a map wrapper.
    #[error("`{op}` requires a {expected} but the value is a {found}")]
    ShapeMismatch {
        op: &'static str,
        expected: &'static str,
        found: ShapeKind,
    },

    /// A job kept re-queueing itself during one flush.
    #[error("job {job:?} re-ran more than {limit} times in one flush")]
    RecursionLimitExceeded { job: SubscriberId, limit: usize },

    /// Converting a value to JSON failed (cyclic graph).
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;
