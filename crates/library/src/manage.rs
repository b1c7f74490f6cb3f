//! Folder and file mutations.
//!
//! Every mutation changes the filesystem first and the catalog second. If the
//! process dies in between, the next sync reconciles the catalog.

use crate::Library;
use crate::error::{ErrorKind, Result, io_error};
use exn::{OptionExt, ResultExt};
use mediadex_catalog::{Entry, identity};
use mediadex_folders::{FolderKey, validate_name};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::fs;
use tracing::instrument;

/// Where a deleted folder or file went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Moved into the trash region, at this path.
    Trashed(PathBuf),
    /// Removed for good.
    Removed,
}

/// Nothing may live at `path`, not even a dangling symlink.
async fn ensure_vacant(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(_) => exn::bail!(ErrorKind::AlreadyExists(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(e, path)),
    }
}

fn checked_name(name: &str) -> Result<&str> {
    validate_name(name).or_raise(|| ErrorKind::InvalidName(name.to_string()))
}

/// A free path for `name` inside `trash`: the name itself, then the name
/// suffixed with the current Unix timestamp, then with a counter as well.
async fn trash_destination(trash: &Path, name: &str) -> Result<PathBuf> {
    let plain = trash.join(name);
    if ensure_vacant(&plain).await.is_ok() {
        return Ok(plain);
    }
    let stamped = format!("{name}-{}", UtcDateTime::now().unix_timestamp());
    let mut candidate = trash.join(&stamped);
    let mut counter = 1u32;
    while let Err(e) = ensure_vacant(&candidate).await {
        if !matches!(&*e, ErrorKind::AlreadyExists(_)) {
            return Err(e);
        }
        candidate = trash.join(format!("{stamped}-{counter}"));
        counter += 1;
    }
    Ok(candidate)
}

impl Library {
    /// Path of the existing directory below a root that `key` names.
    async fn existing_folder(&self, key: &FolderKey) -> Result<PathBuf> {
        let path = self.folder_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(path),
            Ok(_) => exn::bail!(ErrorKind::NotFound(path)),
            Err(e) => Err(io_error(e, &path)),
        }
    }

    /// Configured roots and the synthetic root can't be renamed or deleted.
    fn ensure_unprotected(&self, key: &FolderKey) -> Result<()> {
        if key.is_root() {
            exn::bail!(ErrorKind::ProtectedFolder(key.clone()));
        }
        let path = self.folder_path(key)?;
        if self.roots.iter().any(|root| *root == path) {
            exn::bail!(ErrorKind::ProtectedFolder(key.clone()));
        }
        Ok(())
    }

    async fn existing_file(&self, path: &Path) -> Result<()> {
        if !self.is_managed(path) {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        match fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Err(e) => Err(io_error(e, path)),
        }
    }

    async fn move_to_trash(&self, path: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.trash).await.map_err(|e| io_error(e, &self.trash))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_raise(|| ErrorKind::NotFound(path.to_path_buf()))?;
        let destination = trash_destination(&self.trash, &name).await?;
        // Trash must be on the same filesystem as the roots.
        fs::rename(path, &destination).await.map_err(|e| io_error(e, path))?;
        Ok(destination)
    }

    async fn refresh_tree(&self) -> Result<()> {
        self.resolve(true).await.map(|_| ())
    }

    /// Create the folder `name` inside `parent`.
    #[instrument(skip(self, parent), fields(parent = %parent))]
    pub async fn create_folder(&self, parent: &FolderKey, name: &str) -> Result<FolderKey> {
        let name = checked_name(name)?;
        if parent.is_root() {
            // That would be a new configured root.
            exn::bail!(ErrorKind::ProtectedFolder(parent.clone()));
        }
        let parent = self.existing_folder(parent).await?;
        let target = parent.join(name);
        ensure_vacant(&target).await?;
        fs::create_dir(&target).await.map_err(|e| io_error(e, &target))?;
        tracing::info!(path = %target.display(), "Created folder");
        self.refresh_tree().await?;
        Ok(FolderKey::from_path(target))
    }

    /// Rename a folder in place, moving its catalog entries along.
    #[instrument(skip(self, key), fields(folder = %key))]
    pub async fn rename_folder(&self, key: &FolderKey, new_name: &str) -> Result<FolderKey> {
        let new_name = checked_name(new_name)?;
        self.ensure_unprotected(key)?;
        let source = self.existing_folder(key).await?;
        let target = source.with_file_name(new_name);
        if target == source {
            return Ok(key.clone());
        }
        ensure_vacant(&target).await?;
        fs::rename(&source, &target).await.map_err(|e| io_error(e, &source))?;
        self.refresh_tree().await?;
        let moved = self.catalog.rename_prefix(&source, &target).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::info!(from = %source.display(), to = %target.display(), entries = moved, "Renamed folder");
        Ok(FolderKey::from_path(target))
    }

    /// Delete a folder and everything in it: into the trash when soft delete
    /// is enabled, for good otherwise. Its catalog entries are removed.
    #[instrument(skip(self, key), fields(folder = %key))]
    pub async fn delete_folder(&self, key: &FolderKey) -> Result<DeleteOutcome> {
        self.ensure_unprotected(key)?;
        let path = self.existing_folder(key).await?;
        let outcome = match self.soft_delete {
            true => DeleteOutcome::Trashed(self.move_to_trash(&path).await?),
            false => {
                fs::remove_dir_all(&path).await.map_err(|e| io_error(e, &path))?;
                DeleteOutcome::Removed
            },
        };
        self.refresh_tree().await?;
        let removed = self.catalog.remove_under(&path).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::info!(path = %path.display(), entries = removed, outcome = ?outcome, "Deleted folder");
        Ok(outcome)
    }

    /// Rename a single file in its folder. Returns the moved catalog entry,
    /// if the file had been cataloged.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn rename_file(&self, path: &Path, new_name: &str) -> Result<Option<Entry>> {
        let new_name = checked_name(new_name)?;
        self.existing_file(path).await?;
        let target = path.with_file_name(new_name);
        if target == path {
            return self.get(identity(path)).await;
        }
        ensure_vacant(&target).await?;
        fs::rename(path, &target).await.map_err(|e| io_error(e, path))?;
        self.catalog.rename_identity(path, &target).await.or_raise(|| ErrorKind::Catalog)
    }

    /// Delete a single file, into the trash when soft delete is enabled.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn delete_file(&self, path: &Path) -> Result<DeleteOutcome> {
        self.existing_file(path).await?;
        let outcome = match self.soft_delete {
            true => DeleteOutcome::Trashed(self.move_to_trash(path).await?),
            false => {
                fs::remove_file(path).await.map_err(|e| io_error(e, path))?;
                DeleteOutcome::Removed
            },
        };
        self.catalog.remove(identity(path)).await.or_raise(|| ErrorKind::Catalog)?;
        Ok(outcome)
    }
}
