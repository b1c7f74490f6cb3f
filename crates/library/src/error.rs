//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use mediadex_folders::FolderKey;
use std::path::{Path, PathBuf};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Files below a folder could not be listed; the sync pass was abandoned
    /// before the catalog was touched.
    #[display("could not enumerate folder {_0}")]
    Enumerate(#[error(not(source))] FolderKey),
    /// The key does not name a folder inside a configured root.
    #[display("invalid folder key: {_0}")]
    InvalidFolderKey(#[error(not(source))] String),
    #[display("invalid name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    #[display("already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    #[display("not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Configured roots (and the synthetic root above them) can't be renamed
    /// or deleted, and nothing can be created next to them.
    #[display("folder is protected: {_0}")]
    ProtectedFolder(#[error(not(source))] FolderKey),
    #[display("a sweep is already in progress")]
    SweepInProgress,
    #[display("catalog error")]
    Catalog,
    #[display("folder tree error")]
    Folders,
    /// Blocking work panicked or was cancelled.
    #[display("background task failed")]
    Task,
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Enumerate(_) | Self::SweepInProgress | Self::Catalog | Self::Io(_))
    }
}

/// Raise an I/O error as the most specific kind for the path involved.
#[track_caller]
pub(crate) fn io_error(err: std::io::Error, path: &Path) -> Error {
    let kind = match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
        _ => ErrorKind::Io(path.to_path_buf()),
    };
    exn::Exn::from(err).raise(kind)
}
