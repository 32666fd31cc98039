use displaydoc::Display;
use thiserror::Error;

/// Errors produced by directory HTTP calls and contact envelope handling.
#[derive(Debug, Display, Error)]
pub enum NetworkError {
    /// directory call to {0} timed out
    Timeout(String),
    /// connection to the directory was refused
    ConnectionRefused,
    /// directory returned an error: {0}
    DirectoryError(String),
    /// malformed directory response: {0}
    MalformedResponse(String),
    /// failed to decrypt contact envelope: {0}
    ContactDecrypt(String),
    /// http transport error: {0}
    Transport(#[from] reqwest::Error),
}

/// Convenience alias for results returned by this crate.
pub type NetworkResult<T> = Result<T, NetworkError>;
