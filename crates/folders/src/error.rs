//! Folder Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A folder error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for folder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The key does not decode to an absolute path.
    #[display("invalid folder key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// A caller-supplied name is not a single, plain path component.
    #[display("invalid name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// The background directory walk could not be completed.
    #[display("folder walk failed")]
    Walk,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Walk)
    }
}
