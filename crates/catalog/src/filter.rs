use mediadex_extract::models::MediaKind;
use std::path::{Path, PathBuf};

/// Narrows a catalog listing. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Only entries at or below this path. Matching is by whole path
    /// components: `/a/b` covers `/a/b/x.png` but not `/a/bc/x.png`.
    pub scope: Option<PathBuf>,
    pub favorites_only: bool,
    pub kind: Option<MediaKind>,
}
impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn under(scope: impl Into<PathBuf>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..Self::default()
        }
    }

    pub fn favorites(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn of_kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// The two forms a scope is matched in: the exact path, and the prefix that
/// every descendant starts with.
pub(crate) fn scope_patterns(scope: &Path) -> Option<(String, String)> {
    let exact = scope.to_str()?.to_string();
    let prefix = match exact.ends_with(std::path::MAIN_SEPARATOR) {
        true => exact.clone(),
        false => format!("{exact}{}", std::path::MAIN_SEPARATOR),
    };
    Some((exact, prefix))
}
