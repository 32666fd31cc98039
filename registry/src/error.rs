use displaydoc::Display;
use thiserror::Error;

/// Errors raised by the node registry's storage and query layers.
#[derive(Debug, Display, Error)]
pub enum RegistryError {
    /// registry storage error: {0}
    Storage(#[from] sqlx::Error),
    /// failed to serialize registry payload: {0}
    Serialize(#[from] serde_json::Error),
    /// targeted query for node {0} timed out
    QueryTimeout(String),
}

/// Convenience alias for results returned by this crate.
pub type RegistryResult<T> = Result<T, RegistryError>;
