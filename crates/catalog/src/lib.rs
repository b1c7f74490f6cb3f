//! SQLite catalog of indexed media files.
//!
//! The catalog is a cache of what was last extracted from each file below the
//! configured roots. It is not the source of truth: the files are. Entries are
//! keyed by [`identity`], derived from the file's path, so a rename is a delete
//! plus an insert.

mod db;
mod entry;
pub mod error;
mod filter;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::entry::{Entry, identity};
pub use crate::filter::EntryFilter;
pub use crate::repo::Repository;
