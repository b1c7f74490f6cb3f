use mediadex_extract::models::{Dimensions, Extraction, MediaDuration, MediaKind};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Stable identifier of a cataloged file: lower-case hex BLAKE3 of the raw
/// bytes of its absolute path.
///
/// Identity follows the path, not the content. Moving or renaming a file gives
/// it a new identity.
pub fn identity(path: impl AsRef<Path>) -> String {
    blake3::hash(path.as_ref().as_os_str().as_encoded_bytes()).to_hex().to_string()
}

/// A single file below one of the configured roots, as last indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub identity: String,
    pub path: PathBuf,
    /// Modification time of the file when it was indexed.
    pub mtime: UtcDateTime,
    pub kind: MediaKind,
    pub has_workflow: bool,
    pub favorite: bool,
    pub dimensions: Option<Dimensions>,
    pub duration: Option<MediaDuration>,
    pub indexed_at: UtcDateTime,
}
impl Entry {
    pub fn new(path: impl Into<PathBuf>, mtime: UtcDateTime, extraction: &Extraction) -> Self {
        let path = path.into();
        Self {
            identity: identity(&path),
            path,
            mtime,
            kind: extraction.kind,
            has_workflow: extraction.has_workflow,
            favorite: false,
            dimensions: extraction.dimensions,
            duration: extraction.duration,
            indexed_at: UtcDateTime::now(),
        }
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    /// The same entry under a different path (and therefore identity).
    pub fn moved_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self.identity = identity(&self.path);
        self
    }

    /// An entry is stale once the file on disk has a different modification
    /// time; its metadata must not be trusted until it is extracted again.
    pub fn is_stale(&self, current_mtime: UtcDateTime) -> bool {
        self.mtime != current_mtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_identity_is_deterministic_hex() {
        let a = identity("/media/output/ComfyUI_00001_.png");
        assert_eq!(a, identity(PathBuf::from("/media/output/ComfyUI_00001_.png")));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, identity("/media/output/ComfyUI_00002_.png"));
    }

    #[test]
    fn test_moved_to_changes_identity() {
        let mtime = UtcDateTime::now();
        let entry = Entry::new("/a/one.png", mtime, &Extraction::unknown()).with_favorite(true);
        let moved = entry.clone().moved_to("/a/two.png");
        assert_eq!(moved.identity, identity("/a/two.png"));
        assert_ne!(moved.identity, entry.identity);
        assert!(moved.favorite);
        assert_eq!(moved.mtime, entry.mtime);
    }

    #[test]
    fn test_is_stale() {
        let mtime = UtcDateTime::now();
        let entry = Entry::new("/a/one.png", mtime, &Extraction::unknown());
        assert!(!entry.is_stale(mtime));
        assert!(entry.is_stale(mtime + Duration::nanoseconds(1)));
        assert!(entry.is_stale(mtime - Duration::seconds(60)));
    }
}
