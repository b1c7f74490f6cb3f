use crate::FolderTree;
use crate::tree::normalize;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Owner of the process-wide folder tree cache.
///
/// The tree is rebuilt lazily: [`resolve`](Self::resolve) serves the cached
/// tree until it is asked to refresh (or has nothing cached yet). There is no
/// filesystem watch; anything that creates, renames or deletes folders must
/// call `resolve(true)` (or [`invalidate`](Self::invalidate)) afterwards.
#[derive(Debug)]
pub struct FolderResolver {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    cache: RwLock<Option<Arc<FolderTree>>>,
    // Rebuilds are serialized separately so readers are never blocked by a
    // directory walk, only by the final swap.
    rebuild: Mutex<()>,
}

impl FolderResolver {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().map(|r| normalize(&r)).collect(),
            excluded: Vec::new(),
            cache: RwLock::new(None),
            rebuild: Mutex::new(()),
        }
    }

    /// Directories that are never part of the tree, even when they live
    /// inside a configured root (trash, thumbnails, etc).
    pub fn with_excluded(mut self, excluded: impl IntoIterator<Item = PathBuf>) -> Self {
        self.excluded = excluded.into_iter().collect();
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Return the folder tree, walking the filesystem only when forced to or
    /// when nothing is cached yet.
    #[instrument(skip(self))]
    pub async fn resolve(&self, force_refresh: bool) -> Result<Arc<FolderTree>> {
        if !force_refresh && let Some(tree) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(tree));
        }
        let _guard = self.rebuild.lock().await;
        // Somebody else may have finished a rebuild while we were waiting.
        if !force_refresh && let Some(tree) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(tree));
        }
        let roots = self.roots.clone();
        let excluded = self.excluded.clone();
        let tree = tokio::task::spawn_blocking(move || FolderTree::build(&roots, &excluded))
            .await
            .or_raise(|| ErrorKind::Walk)?;
        tracing::debug!(folders = tree.len(), "Rebuilt folder tree");
        let tree = Arc::new(tree);
        *self.cache.write().await = Some(Arc::clone(&tree));
        Ok(tree)
    }

    /// Drop the cached tree; the next [`resolve`](Self::resolve) rebuilds it.
    pub async fn invalidate(&self) {
        let _guard = self.rebuild.lock().await;
        self.cache.write().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FolderKey;
    use std::fs;

    #[tokio::test]
    async fn test_resolve_is_cached() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        let resolver = FolderResolver::new([temp.path().to_path_buf()]);
        let first = resolver.resolve(false).await.unwrap();
        let second = resolver.resolve(false).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn test_cached_tree_ignores_filesystem_until_refreshed() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = FolderResolver::new([temp.path().to_path_buf()]);
        let before = resolver.resolve(false).await.unwrap();
        fs::create_dir(temp.path().join("new")).unwrap();
        let new_key = FolderKey::from_path(temp.path().join("new"));

        let cached = resolver.resolve(false).await.unwrap();
        assert!(!cached.contains(&new_key));
        assert!(Arc::ptr_eq(&before, &cached));

        let refreshed = resolver.resolve(true).await.unwrap();
        assert!(refreshed.contains(&new_key));
        // And the refreshed tree replaces the cache.
        assert!(Arc::ptr_eq(&refreshed, &resolver.resolve(false).await.unwrap()));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = FolderResolver::new([temp.path().to_path_buf()]);
        let before = resolver.resolve(false).await.unwrap();
        fs::create_dir(temp.path().join("after")).unwrap();
        resolver.invalidate().await;
        let after = resolver.resolve(false).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.contains(&FolderKey::from_path(temp.path().join("after"))));
    }
}
