use displaydoc::Display;
use thiserror::Error;

/// Errors shared by the identifier types in this crate.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// invalid station id: {0}
    InvalidStationId(String),
}
