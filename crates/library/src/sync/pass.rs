//! One sync pass: what is on disk, against what the catalog remembers.

use mediadex_catalog::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use walkdir::WalkDir;

/// A file that needs extracting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Task {
    pub(crate) path: PathBuf,
    pub(crate) mtime: UtcDateTime,
    /// Carried over from the entry being replaced.
    pub(crate) favorite: bool,
    /// Whether an entry for the file already existed.
    pub(crate) existing: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Diff {
    pub(crate) tasks: Vec<Task>,
    /// Identities of entries whose file is gone.
    pub(crate) removed: Vec<(String, PathBuf)>,
    pub(crate) unchanged: usize,
}
impl Diff {
    pub(crate) fn added(&self) -> usize {
        self.tasks.iter().filter(|t| !t.existing).count()
    }

    pub(crate) fn changed(&self) -> usize {
        self.tasks.iter().filter(|t| t.existing).count()
    }
}

/// Files to leave out of a pass: everything below a cache region, plus the
/// catalog database and its `-wal`/`-shm` companions.
#[derive(Debug, Clone)]
pub(crate) struct Exclusions {
    pub(crate) dirs: Vec<PathBuf>,
    pub(crate) database: PathBuf,
}
impl Exclusions {
    fn skip_dir(&self, path: &Path) -> bool {
        self.dirs.iter().any(|x| x == path)
    }

    fn skip_file(&self, path: &Path) -> bool {
        let (Some(parent), Some(name)) = (self.database.parent(), self.database.file_name()) else {
            return false;
        };
        if path.parent() != Some(parent) {
            return false;
        }
        let name = name.as_encoded_bytes();
        path.file_name()
            .map(|f| f.as_encoded_bytes().starts_with(name))
            .unwrap_or(false)
    }
}

/// Every regular file below `dirs`, with its modification time. Blocking.
///
/// Any error (an unreadable directory, a file that can't be stat'ed) fails the
/// whole enumeration: an incomplete listing would make the diff remove
/// entries for files that still exist.
pub(crate) fn enumerate(dirs: &[PathBuf], exclusions: &Exclusions) -> std::io::Result<HashMap<PathBuf, UtcDateTime>> {
    let mut found = HashMap::new();
    for dir in dirs {
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && exclusions.skip_dir(e.path())));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || exclusions.skip_file(entry.path()) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            found.insert(entry.into_path(), UtcDateTime::from(modified));
        }
    }
    Ok(found)
}

/// Compare what is on disk against the catalog.
///
/// New files and files whose mtime moved are queued for extraction; with
/// `force_full`, so is every other file. Entries without a file are removed.
pub(crate) fn diff(mut observed: HashMap<PathBuf, UtcDateTime>, cataloged: Vec<Entry>, force_full: bool) -> Diff {
    let mut diff = Diff::default();
    for entry in cataloged {
        match observed.remove(&entry.path) {
            None => diff.removed.push((entry.identity, entry.path)),
            Some(mtime) if force_full || entry.is_stale(mtime) => diff.tasks.push(Task {
                path: entry.path,
                mtime,
                favorite: entry.favorite,
                existing: true,
            }),
            Some(_) => diff.unchanged += 1,
        }
    }
    diff.tasks.extend(observed.into_iter().map(|(path, mtime)| Task {
        path,
        mtime,
        favorite: false,
        existing: false,
    }));
    // Deterministic order for logs and tests; workers don't care.
    diff.tasks.sort_by(|a, b| a.path.cmp(&b.path));
    diff
}
