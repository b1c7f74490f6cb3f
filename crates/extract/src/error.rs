//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! None of these escape [`Extractor::extract`](crate::Extractor::extract),
//! which downgrades every failure to [`MediaKind::Unknown`](crate::models::MediaKind).
//! They are surfaced by the individual strategies so that each can be tested
//! (and logged) on its own.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be opened or read.
    #[display("I/O error")]
    Io,
    /// The image decoder rejected the file.
    #[display("undecodable image")]
    Decode,
    /// No video probe is available on this system.
    #[display("video probe unavailable")]
    ProbeUnavailable,
    /// The video probe ran, but could not make sense of the file.
    #[display("video probe failed: {_0}")]
    Probe(#[error(not(source))] String),
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// Details about the parsing failure.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A file either decodes or it doesn't; a changed file gets a new
        // mtime and is picked up by the next sync anyway.
        matches!(self, Self::Io)
    }
}
