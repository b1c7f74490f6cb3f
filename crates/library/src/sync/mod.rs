//! Reconciling the catalog with the filesystem.
//!
//! A pass enumerates every file below a folder, diffs that against the
//! catalog entries in the same scope, drops entries whose file is gone and
//! extracts new and modified files on a pool of workers.

mod pass;
mod pool;

use crate::Library;
use crate::error::{ErrorKind, Result};
use crate::sync::pass::Exclusions;
use crate::sync::pool::Outcome;
use exn::ResultExt;
use mediadex_catalog::EntryFilter;
use mediadex_folders::FolderKey;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

/// A file that could not be indexed during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub folder: FolderKey,
    /// Files found on disk.
    pub discovered: usize,
    pub added: usize,
    /// Existing entries that were extracted again.
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Indexed, but the file could not be fully decoded.
    pub degraded: usize,
    pub errors: Vec<SyncError>,
}
impl SyncReport {
    fn new(folder: FolderKey) -> Self {
        Self {
            folder,
            discovered: 0,
            added: 0,
            updated: 0,
            removed: 0,
            unchanged: 0,
            degraded: 0,
            errors: Vec::new(),
        }
    }
}

impl Library {
    /// Bring the catalog in line with the files at or below `key`.
    ///
    /// The root key covers every configured root. With `force_full`, every
    /// file is extracted again, not only new and modified ones. The folder
    /// tree is not refreshed.
    ///
    /// Per-file failures end up in the report. Failing to list the files at
    /// all aborts the pass before the catalog is touched.
    #[instrument(skip(self, key), fields(folder = %key))]
    pub async fn sync(&self, key: &FolderKey, force_full: bool) -> Result<SyncReport> {
        let (dirs, filter) = match key.is_root() {
            true => (self.roots.clone(), EntryFilter::all()),
            false => {
                let path = self.folder_path(key)?;
                (vec![path.clone()], EntryFilter::under(path))
            },
        };
        tracing::info!("Starting sync");

        let exclusions = Exclusions {
            dirs: self.excluded.clone(),
            database: self.database.clone(),
        };
        let observed = tokio::task::spawn_blocking(move || pass::enumerate(&dirs, &exclusions))
            .await
            .or_raise(|| ErrorKind::Enumerate(key.clone()))?
            .or_raise(|| ErrorKind::Enumerate(key.clone()))?;
        let cataloged = self.catalog.list(&filter).await.or_raise(|| ErrorKind::Catalog)?;

        let mut report = SyncReport::new(key.clone());
        report.discovered = observed.len();
        let diff = pass::diff(observed, cataloged, force_full);
        report.unchanged = diff.unchanged;
        tracing::info!(
            discovered = report.discovered,
            new = diff.added(),
            changed = diff.changed(),
            removed = diff.removed.len(),
            unchanged = diff.unchanged,
            "Computed sync diff"
        );

        for (identity, path) in diff.removed {
            match self.catalog.remove(&identity).await {
                Ok(_) => report.removed += 1,
                Err(e) => report.errors.push(SyncError {
                    path,
                    message: e.to_string(),
                }),
            }
        }

        let outcomes = pool::run(diff.tasks, self.workers, Arc::clone(&self.extractor), self.catalog.clone()).await;
        for outcome in outcomes {
            match outcome {
                Outcome::Indexed { existing, degraded } => {
                    match existing {
                        true => report.updated += 1,
                        false => report.added += 1,
                    }
                    if degraded {
                        report.degraded += 1;
                    }
                },
                Outcome::Failed { path, message } => report.errors.push(SyncError { path, message }),
            }
        }

        tracing::info!(
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            degraded = report.degraded,
            errors = report.errors.len(),
            "Finished sync"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::testing::*;
    use filetime::FileTime;
    use mediadex_catalog::{EntryFilter, identity};
    use mediadex_extract::models::MediaKind;
    use mediadex_extract::{Extractor, VideoInfo, VideoProbe};
    use mediadex_folders::FolderKey;
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use time::UtcDateTime;

    #[derive(Debug)]
    struct PanickingProbe;
    impl VideoProbe for PanickingProbe {
        fn probe(&self, _: &Path) -> mediadex_extract::error::Result<VideoInfo> {
            panic!("demuxer bug");
        }
    }

    fn mtime(path: &Path) -> UtcDateTime {
        UtcDateTime::from(std::fs::metadata(path).unwrap().modified().unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_every_file_gets_one_entry() {
        let fx = fixture(true).await;
        let files = [
            fx.root.join("still.png"),
            fx.root.join("nested/deeper/other.png"),
            fx.root.join("notes.txt"),
        ];
        write_png(&files[0], 800, 600);
        write_png(&files[1], 2, 2);
        write(&files[2], b"hello");

        let report = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!(report.folder, FolderKey::root());
        assert_eq!((report.discovered, report.added, report.updated, report.removed), (3, 3, 0, 0));
        assert!(report.errors.is_empty());

        let entries = fx.library.list(&EntryFilter::all()).await.unwrap();
        assert_eq!(entries.len(), 3);
        for file in &files {
            let entry = fx.library.get(identity(file)).await.unwrap().unwrap();
            assert_eq!(&entry.path, file);
            assert_eq!(entry.mtime, mtime(file));
        }
        let still = fx.library.get(identity(&files[0])).await.unwrap().unwrap();
        assert_eq!(still.kind, MediaKind::Image);
        assert_eq!(still.dimensions.unwrap().to_string(), "800x600");
        assert!(!still.has_workflow);
        let notes = fx.library.get(identity(&files[2])).await.unwrap().unwrap();
        assert_eq!(notes.kind, MediaKind::Unknown);
        assert_eq!(notes.dimensions, None);
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let fx = fixture(true).await;
        write_png(&fx.root.join("a.png"), 2, 2);
        fx.library.sync(&FolderKey::root(), false).await.unwrap();
        let report = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!((report.added, report.updated, report.removed, report.unchanged), (0, 0, 0, 1));

        let forced = fx.library.sync(&FolderKey::root(), true).await.unwrap();
        assert_eq!((forced.updated, forced.unchanged), (1, 0));
    }

    #[tokio::test]
    async fn test_removed_files_leave_no_entry() {
        let fx = fixture(true).await;
        let doomed = fx.root.join("sub/doomed.png");
        write_png(&doomed, 2, 2);
        write_png(&fx.root.join("kept.png"), 2, 2);
        fx.library.sync(&FolderKey::root(), false).await.unwrap();

        std::fs::remove_file(&doomed).unwrap();
        let report = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(fx.library.get(identity(&doomed)).await.unwrap().is_none());
        assert_eq!(fx.library.list(&EntryFilter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_external_rename_is_picked_up() {
        let fx = fixture(true).await;
        let (before, after) = (fx.root.join("p1.png"), fx.root.join("p2.png"));
        write_png(&before, 2, 2);
        fx.library.sync(&FolderKey::root(), false).await.unwrap();

        std::fs::rename(&before, &after).unwrap();
        fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert!(fx.library.get(identity(&before)).await.unwrap().is_none());
        assert_eq!(fx.library.get(identity(&after)).await.unwrap().unwrap().path, after);
    }

    #[tokio::test]
    async fn test_modified_file_keeps_favorite() {
        let fx = fixture(true).await;
        let path = fx.root.join("fav.png");
        write_png(&path, 2, 2);
        fx.library.sync(&FolderKey::root(), false).await.unwrap();
        fx.library.set_favorite(identity(&path), true).await.unwrap();

        write_png(&path, 16, 8);
        let later = SystemTime::now() + Duration::from_secs(5);
        filetime::set_file_mtime(&path, FileTime::from_system_time(later)).unwrap();
        let report = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!(report.updated, 1);

        let entry = fx.library.get(identity(&path)).await.unwrap().unwrap();
        assert!(entry.favorite);
        assert_eq!(entry.dimensions.unwrap().to_string(), "16x8");
        assert_eq!(entry.mtime, mtime(&path));
    }

    #[tokio::test]
    async fn test_subtree_sync_leaves_siblings_alone() {
        let fx = fixture(true).await;
        write(&fx.root.join("a/one.txt"), b"1");
        write(&fx.root.join("b/two.txt"), b"2");
        fx.library.sync(&FolderKey::root(), false).await.unwrap();

        std::fs::remove_file(fx.root.join("b/two.txt")).unwrap();
        write(&fx.root.join("a/three.txt"), b"3");
        let report = fx.library.sync(&FolderKey::from_path(fx.root.join("a")), false).await.unwrap();
        assert_eq!((report.discovered, report.added, report.removed), (2, 1, 0));
        // Outside the synced subtree, so still there.
        assert!(fx.library.get(identity(fx.root.join("b/two.txt"))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_degraded() {
        let fx = fixture(true).await;
        write(&fx.root.join("broken.png"), b"not really a png");
        let report = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!((report.added, report.degraded), (1, 1));
        let entry = fx.library.get(identity(fx.root.join("broken.png"))).await.unwrap().unwrap();
        assert_eq!(entry.kind, MediaKind::Unknown);
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_fatal() {
        let fx = fixture(true).await;
        write(&fx.root.join("a/one.txt"), b"1");
        fx.library.sync(&FolderKey::root(), false).await.unwrap();

        let gone = FolderKey::from_path(fx.root.join("vanished"));
        let err = fx.library.sync(&gone, false).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Enumerate(key) if *key == gone));
        // Nothing was removed.
        assert_eq!(fx.library.list(&EntryFilter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_key_outside_roots_is_rejected() {
        let fx = fixture(true).await;
        let err = fx.library.sync(&FolderKey::from_path("/etc"), false).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFolderKey(_)));
    }

    #[tokio::test]
    async fn test_panicking_extraction_is_still_cataloged() {
        let extractor = Extractor::new(8.0).with_probe(PanickingProbe);
        let fx = fixture_with(extractor, false, |_| {}).await;
        let clip = fx.root.join("clip.mp4");
        write(&clip, b"not really a video");

        let first = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!((first.added, first.degraded), (1, 1));
        assert!(first.errors.is_empty());
        let entry = fx.library.get(identity(&clip)).await.unwrap().unwrap();
        assert_eq!(entry.kind, MediaKind::Unknown);
        assert_eq!(entry.mtime, mtime(&clip));

        // Unchanged on disk, so not extracted (and not panicking) again.
        let second = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!((second.added, second.updated, second.unchanged), (0, 0, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_workers_on_disk_catalog() {
        let fx = fixture_with(Extractor::new(8.0), true, |config| config.workers = 8).await;
        let files: Vec<_> = (0..300)
            .map(|i| match i % 10 {
                0 => fx.root.join(format!("batch-{}/img-{i:03}.png", i % 7)),
                _ => fx.root.join(format!("batch-{}/note-{i:03}.txt", i % 7)),
            })
            .collect();
        for file in &files {
            match file.extension().and_then(|e| e.to_str()) {
                Some("png") => write_png(file, 4, 4),
                _ => write(file, file.to_string_lossy().as_bytes()),
            }
        }

        let report = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!((report.discovered, report.added), (300, 300));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(fx.library.catalog().count(&EntryFilter::all()).await.unwrap(), 300);
        for file in &files {
            let entry = fx.library.get(identity(file)).await.unwrap().unwrap();
            assert_eq!(&entry.path, file);
            assert_eq!(entry.mtime, mtime(file));
            if entry.kind == MediaKind::Image {
                assert_eq!(entry.dimensions.unwrap().to_string(), "4x4");
            }
        }
        let images = fx.library.list(&EntryFilter::all().of_kind(MediaKind::Image)).await.unwrap();
        assert_eq!(images.len(), 30);

        let again = fx.library.sync(&FolderKey::root(), false).await.unwrap();
        assert_eq!((again.added, again.updated, again.unchanged), (0, 0, 300));
    }
}
