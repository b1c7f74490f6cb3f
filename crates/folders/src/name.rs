//! Name validation for caller-supplied folder and file names.
//!
//! Folder creation and renames take a bare name from the outside world, which
//! is then joined onto a path inside a configured root. Anything other than a
//! single plain component could escape that root.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Validates that `name` is a single, plain path component.
///
/// Rejects empty names, `.` and `..`, anything containing a path separator,
/// and names with null bytes.
///
/// # Examples
///
/// ```
/// use mediadex_folders::validate_name;
/// assert!(validate_name("renders").is_ok());
/// assert!(validate_name("2024-06 batch").is_ok());
/// assert!(validate_name("../escape").is_err());
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<&str> {
    // Null bytes pass through Path::components() on Unix but cause
    // truncation in C-based syscalls.
    if name.contains('\0') {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        // Path::components() silently drops trailing separators and `.`
        // segments, so compare against the original input as well.
        (Some(Component::Normal(component)), None) if component == name => Ok(name),
        _ => exn::bail!(ErrorKind::InvalidName(name.to_string())),
    }
}
