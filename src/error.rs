//! Error types for the preemption core.
//!
//! The four core components (measure store, relationship store, selection
//! engine, coordinator) are total on their declared inputs: unknown keys
//! are resolved by no-op, not by returning `Err` (see the crate-level
//! docs). `PreemptionError` exists for the minority of calls — resource
//! vector construction and introspection helpers — where a genuine
//! precondition can be violated and silently absorbing it would corrupt
//! an invariant instead of just skipping some work.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreemptionError {
    #[error("resource vector has {got} dimensions, expected {expected}")]
    InvalidResourceVector { expected: usize, got: usize },

    #[error("no usage snapshot for queue {0:?}")]
    UnknownPartition(String),
}
