//! Virtual folder hierarchy over an arbitrary set of configured roots.
//!
//! The roots don't need to share a common ancestor; they are grafted onto a
//! synthetic root and every directory below them is addressed by an opaque
//! [`FolderKey`] that decodes back into its absolute path.

pub mod error;
mod key;
mod name;
mod resolver;
mod tree;

pub use crate::key::FolderKey;
pub use crate::name::validate_name;
pub use crate::resolver::FolderResolver;
pub use crate::tree::{FolderNode, FolderTree, normalize};
