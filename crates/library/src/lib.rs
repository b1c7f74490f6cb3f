//! The media library: a catalog kept in step with the folders it describes.
//!
//! [`Library`] ties the folder resolver, the catalog and the extractor
//! together. Sync passes live in [`sync`], folder and file mutations in
//! `manage`, cache-region upkeep in [`janitor`] and thumbnail bookkeeping in
//! [`thumbnails`].

pub mod error;
pub mod janitor;
mod manage;
pub mod sync;
pub mod thumbnails;

use crate::error::{ErrorKind, Result};
use crate::janitor::Janitor;
use crate::thumbnails::Thumbnails;
use exn::ResultExt;
use mediadex_catalog::{Database, Entry, EntryFilter, Repository};
use mediadex_config::Config;
use mediadex_extract::{Extractor, Ffprobe};
use mediadex_folders::{FolderKey, FolderResolver, FolderTree, normalize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub use crate::manage::DeleteOutcome;
pub use crate::sync::{SyncError, SyncReport};

#[derive(Debug, Clone)]
pub struct Library {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    database: PathBuf,
    workers: usize,
    soft_delete: bool,
    trash: PathBuf,
    resolver: Arc<FolderResolver>,
    catalog: Repository,
    extractor: Arc<Extractor>,
    janitor: Janitor,
    thumbnails: Thumbnails,
}

impl Library {
    /// Build a library from validated configuration.
    ///
    /// Videos are probed with the configured `ffprobe`, or one found on the
    /// `PATH`; without either they are cataloged without dimensions or
    /// duration.
    pub fn new(config: &Config, db: &Database) -> Self {
        let probe = match &config.ffprobe {
            Some(binary) => Some(Ffprobe::new(binary)),
            None => Ffprobe::discover()
                .inspect_err(|e| tracing::warn!(error = %e, "No ffprobe available; videos will be cataloged without metadata"))
                .ok(),
        };
        let mut extractor = Extractor::new(config.animated_fps);
        if let Some(probe) = probe {
            extractor = extractor.with_probe(probe);
        }
        Self::with_extractor(config, db, extractor)
    }

    /// Like [`new`](Self::new), with a caller-supplied extractor.
    pub fn with_extractor(config: &Config, db: &Database, extractor: Extractor) -> Self {
        let excluded = config.excluded_dirs();
        // Identities and keys are built from path bytes; spell every root the
        // way a walk below it spells its parents.
        let roots: Vec<PathBuf> = config.roots.iter().map(|r| normalize(r)).collect();
        Self {
            roots: roots.clone(),
            excluded: excluded.clone(),
            database: config.database.clone(),
            workers: config.workers.max(1),
            soft_delete: config.soft_delete,
            trash: config.cache.trash.clone(),
            resolver: Arc::new(FolderResolver::new(roots).with_excluded(excluded)),
            catalog: Repository::from(db),
            extractor: Arc::new(extractor),
            janitor: Janitor::new([config.cache.trash.clone(), config.cache.staging.clone()]),
            thumbnails: Thumbnails::new(&config.cache.thumbnails),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn catalog(&self) -> &Repository {
        &self.catalog
    }

    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }

    pub fn thumbnails(&self) -> &Thumbnails {
        &self.thumbnails
    }

    pub async fn resolve(&self, force_refresh: bool) -> Result<Arc<FolderTree>> {
        self.resolver.resolve(force_refresh).await.or_raise(|| ErrorKind::Folders)
    }

    pub async fn invalidate(&self) {
        self.resolver.invalidate().await;
    }

    pub async fn get(&self, identity: impl AsRef<str>) -> Result<Option<Entry>> {
        self.catalog.get(identity).await.or_raise(|| ErrorKind::Catalog)
    }

    pub async fn list(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        self.catalog.list(filter).await.or_raise(|| ErrorKind::Catalog)
    }

    /// Entries at or below a folder of the tree.
    pub async fn list_folder(&self, key: &FolderKey, filter: EntryFilter) -> Result<Vec<Entry>> {
        let filter = match key.is_root() {
            true => EntryFilter { scope: None, ..filter },
            false => EntryFilter {
                scope: Some(self.folder_path(key)?),
                ..filter
            },
        };
        self.list(&filter).await
    }

    /// Returns whether there was an entry to update.
    pub async fn set_favorite(&self, identity: impl AsRef<str>, favorite: bool) -> Result<bool> {
        self.catalog.set_favorite(identity, favorite).await.or_raise(|| ErrorKind::Catalog)
    }

    /// Remove thumbnails of files that are no longer cataloged.
    pub async fn prune_thumbnails(&self) -> Result<usize> {
        let entries = self.list(&EntryFilter::all()).await?;
        self.thumbnails.prune_orphans(&entries).await
    }

    /// Cataloged entries whose thumbnail is missing or out of date.
    pub async fn pending_thumbnails(&self) -> Result<Vec<Entry>> {
        let entries = self.list(&EntryFilter::all()).await?;
        Ok(self.thumbnails.pending(entries).await)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|x| path.starts_with(x))
    }

    /// The configured root that `path` lives in, if any.
    fn root_of(&self, path: &Path) -> Option<&Path> {
        self.roots.iter().map(PathBuf::as_path).find(|root| path.starts_with(root))
    }

    /// Whether `path` is (a file or folder) inside a configured root, and
    /// neither inside a cache region nor reached through `..`.
    fn is_managed(&self, path: &Path) -> bool {
        path.is_absolute()
            && !path.components().any(|c| matches!(c, Component::ParentDir))
            && self.root_of(path).is_some()
            && !self.is_excluded(path)
    }

    /// Decode a (non-root) folder key into the directory it names.
    fn folder_path(&self, key: &FolderKey) -> Result<PathBuf> {
        let path = key.to_path().or_raise(|| ErrorKind::InvalidFolderKey(key.to_string()))?;
        if !self.is_managed(&path) {
            exn::bail!(ErrorKind::InvalidFolderKey(key.to_string()));
        }
        Ok(path)
    }
}
