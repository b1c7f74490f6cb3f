use crate::models::{Dimensions, MediaDuration, MediaKind};

/// Everything the catalog keeps about a file's contents.
///
/// Only the *presence* of an embedded workflow is recorded; the payload itself
/// is read on demand by whoever serves the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub kind: MediaKind,
    pub dimensions: Option<Dimensions>,
    pub duration: Option<MediaDuration>,
    pub has_workflow: bool,
    /// Set when a recognised file could not be fully decoded. Undecodable
    /// rasters are downgraded to [`MediaKind::Unknown`]; unprobeable videos
    /// keep their kind but lose dimensions and duration.
    pub degraded: bool,
}
impl Extraction {
    /// Result for a file whose extension isn't handled at all.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Result for a recognised file that failed to decode.
    pub fn degraded(has_workflow: bool) -> Self {
        Self {
            has_workflow,
            degraded: true,
            ..Self::default()
        }
    }
}
