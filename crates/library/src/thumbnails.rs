//! Bookkeeping for generated thumbnails.
//!
//! Rendering happens elsewhere. This only decides which entries need a
//! thumbnail and removes the ones nothing refers to anymore.

use crate::error::{Result, io_error};
use mediadex_catalog::Entry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::fs;

const EXTENSION: &str = "webp";

#[derive(Debug, Clone)]
pub struct Thumbnails {
    dir: PathBuf,
}

impl Thumbnails {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the thumbnail of the entry with this identity lives.
    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{identity}.{EXTENSION}"))
    }

    /// Whether `entry` is renderable media without an up-to-date thumbnail.
    pub async fn needs_thumbnail(&self, entry: &Entry) -> bool {
        if !entry.kind.is_visual() {
            return false;
        }
        let modified = fs::metadata(self.path_for(&entry.identity))
            .await
            .and_then(|meta| meta.modified());
        match modified {
            Ok(modified) => UtcDateTime::from(modified) < entry.mtime,
            Err(_) => true,
        }
    }

    /// The subset of `entries` that need a thumbnail rendered.
    pub async fn pending(&self, entries: Vec<Entry>) -> Vec<Entry> {
        let mut pending = Vec::new();
        for entry in entries {
            if self.needs_thumbnail(&entry).await {
                pending.push(entry);
            }
        }
        pending
    }

    /// Delete thumbnails whose identity isn't among `entries`. Returns how
    /// many were deleted.
    pub async fn prune_orphans(&self, entries: &[Entry]) -> Result<usize> {
        let known: HashSet<&str> = entries.iter().map(|e| e.identity.as_str()).collect();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error(e, &self.dir)),
        };
        let mut pruned = 0;
        while let Some(file) = dir.next_entry().await.map_err(|e| io_error(e, &self.dir))? {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if known.contains(stem) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => pruned += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(io_error(e, &path)),
            }
        }
        tracing::debug!(pruned, "Pruned orphaned thumbnails");
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use mediadex_extract::models::{Extraction, MediaKind};
    use std::time::{Duration, SystemTime};

    fn entry(path: &str, kind: MediaKind, mtime: SystemTime) -> Entry {
        let extraction = Extraction {
            kind,
            ..Extraction::default()
        };
        Entry::new(path, UtcDateTime::from(mtime), &extraction)
    }

    #[tokio::test]
    async fn test_needs_thumbnail() {
        let temp = tempfile::tempdir().unwrap();
        let thumbs = Thumbnails::new(temp.path());
        let now = SystemTime::now();
        let image = entry("/m/a.png", MediaKind::Image, now);
        let unknown = entry("/m/a.txt", MediaKind::Unknown, now);

        assert!(thumbs.needs_thumbnail(&image).await);
        assert!(!thumbs.needs_thumbnail(&unknown).await);

        let thumb = thumbs.path_for(&image.identity);
        assert_eq!(thumb.extension().unwrap(), "webp");
        std::fs::write(&thumb, b"x").unwrap();
        filetime::set_file_mtime(&thumb, FileTime::from_system_time(now + Duration::from_secs(1))).unwrap();
        assert!(!thumbs.needs_thumbnail(&image).await);

        // Rendered before the file last changed.
        filetime::set_file_mtime(&thumb, FileTime::from_system_time(now - Duration::from_secs(60))).unwrap();
        assert!(thumbs.needs_thumbnail(&image).await);
        assert_eq!(thumbs.pending(vec![image, unknown]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_prune_orphans() {
        let temp = tempfile::tempdir().unwrap();
        let thumbs = Thumbnails::new(temp.path());
        let kept = entry("/m/kept.png", MediaKind::Image, SystemTime::now());
        std::fs::write(thumbs.path_for(&kept.identity), b"x").unwrap();
        std::fs::write(thumbs.path_for(&mediadex_catalog::identity("/m/gone.png")), b"x").unwrap();
        std::fs::write(temp.path().join("README"), b"not a thumbnail").unwrap();

        assert_eq!(thumbs.prune_orphans(std::slice::from_ref(&kept)).await.unwrap(), 1);
        assert!(thumbs.path_for(&kept.identity).exists());
        assert!(temp.path().join("README").exists());

        let missing = Thumbnails::new(temp.path().join("missing"));
        assert_eq!(missing.prune_orphans(&[]).await.unwrap(), 0);
    }
}
