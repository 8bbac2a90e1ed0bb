//! Error types for the status store.

use thiserror::Error;

/// Result type alias for status store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record names a target that was not registered at startup.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("status store lock poisoned")]
    Poisoned,
}
