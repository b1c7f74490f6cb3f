use crate::FolderKey;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A single entry of the virtual folder tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub key: FolderKey,
    /// Display name: the final path component (or the full path for a
    /// configured root that has none, such as `/`).
    pub name: String,
    /// Resolved absolute path; only the synthetic root has none.
    pub path: Option<PathBuf>,
    /// `None` only for the synthetic root.
    pub parent: Option<FolderKey>,
    /// Child keys, ordered by display name.
    pub children: Vec<FolderKey>,
}

/// Logical tree of every directory below the configured roots.
///
/// Each configured root is a direct child of a synthetic root node, and every
/// subdirectory (to unbounded depth) is a descendant of its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTree {
    nodes: BTreeMap<FolderKey, FolderNode>,
}

impl FolderTree {
    /// Walk every root and build the tree. Blocking.
    ///
    /// Roots that don't exist and directories that can't be read are skipped
    /// with a warning; nothing here is fatal. Directories listed in `excluded`
    /// (cache regions living inside a root) are not descended into.
    pub(crate) fn build(roots: &[PathBuf], excluded: &[PathBuf]) -> Self {
        let mut nodes = BTreeMap::new();
        let root = FolderKey::root();
        nodes.insert(root.clone(), FolderNode {
            key: root.clone(),
            name: String::from("root"),
            path: None,
            parent: None,
            children: Vec::new(),
        });

        for configured in roots.iter().map(|r| normalize(r)) {
            let configured = &configured;
            if !configured.is_dir() {
                tracing::warn!(root = %configured.display(), "Configured root does not exist; skipping");
                continue;
            }
            let key = FolderKey::from_path(configured);
            if nodes.contains_key(&key) {
                tracing::warn!(root = %configured.display(), "Configured root is already part of the tree; skipping");
                continue;
            }
            nodes.insert(key.clone(), FolderNode {
                key,
                name: display_name(configured),
                path: Some(configured.clone()),
                parent: Some(root.clone()),
                children: Vec::new(),
            });

            let walker = WalkDir::new(configured)
                .min_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.file_type().is_dir() && !excluded.iter().any(|x| x == e.path()));
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(path = ?e.path(), error = %e, "Skipping unreadable directory");
                        continue;
                    },
                };
                let key = FolderKey::from_path(entry.path());
                // Nested roots: the directory was already added, either as a
                // root itself or while walking its enclosing root.
                if nodes.contains_key(&key) {
                    continue;
                }
                // Depth >= 1, so there is always a parent.
                let parent = entry.path().parent().map(FolderKey::from_path);
                nodes.insert(key.clone(), FolderNode {
                    key,
                    name: display_name(entry.path()),
                    path: Some(entry.path().to_path_buf()),
                    parent,
                    children: Vec::new(),
                });
            }
        }

        let mut links: Vec<(FolderKey, FolderKey, String)> = nodes
            .values()
            .filter_map(|n| n.parent.clone().map(|p| (p, n.key.clone(), n.name.clone())))
            .collect();
        links.sort_by(|(_, a_key, a_name), (_, b_key, b_name)| a_name.cmp(b_name).then_with(|| a_key.cmp(b_key)));
        for (parent, child, _) in links {
            if let Some(node) = nodes.get_mut(&parent) {
                node.children.push(child);
            }
        }
        Self { nodes }
    }

    pub fn root(&self) -> &FolderNode {
        // The root node is inserted unconditionally by `build`.
        &self.nodes[&FolderKey::root()]
    }

    pub fn get(&self, key: &FolderKey) -> Option<&FolderNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &FolderKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Direct children of `key`, in display order. Empty for unknown keys.
    pub fn children(&self, key: &FolderKey) -> impl Iterator<Item = &FolderNode> {
        self.nodes
            .get(key)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|k| self.nodes.get(k))
    }

    /// Number of nodes, including the synthetic root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // There's always a root.
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &FolderNode> {
        self.nodes.values()
    }
}

/// `path` without trailing separators, doubled separators or `.` components.
///
/// Keys are built from raw path bytes, so a root has to be spelled the way a
/// walk spells the parents of what it finds below it.
pub fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(OsStr::to_string_lossy)
        .map(|n| n.into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
