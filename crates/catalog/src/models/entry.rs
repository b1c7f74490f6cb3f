use crate::Entry;
use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use mediadex_extract::models::{Dimensions, MediaDuration, MediaKind};
use std::path::PathBuf;
use time::UtcDateTime;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub(crate) identity: String,
    pub(crate) path: String,
    pub(crate) mtime: i64,
    pub(crate) kind: String,
    pub(crate) has_workflow: bool,
    pub(crate) favorite: bool,
    pub(crate) width: Option<i64>,
    pub(crate) height: Option<i64>,
    pub(crate) duration: Option<i64>,
    pub(crate) indexed_at: i64,
}
impl TryFrom<&Entry> for EntryRow {
    type Error = Error;
    fn try_from(entry: &Entry) -> Result<Self, Self::Error> {
        Ok(Self {
            identity: entry.identity.clone(),
            path: entry.path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string(),
            mtime: i64::try_from(entry.mtime.unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData("mtime"))?,
            kind: entry.kind.as_str().to_string(),
            has_workflow: entry.has_workflow,
            favorite: entry.favorite,
            width: entry.dimensions.map(|d| i64::from(d.width)),
            height: entry.dimensions.map(|d| i64::from(d.height)),
            duration: entry
                .duration
                .map(|d| i64::try_from(d.as_secs()))
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("duration"))?,
            indexed_at: entry.indexed_at.unix_timestamp(),
        })
    }
}
impl TryFrom<EntryRow> for Entry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let dimensions = match (row.width, row.height) {
            (Some(width), Some(height)) => Some(Dimensions::new(
                u32::try_from(width).or_raise(|| ErrorKind::InvalidData("width"))?,
                u32::try_from(height).or_raise(|| ErrorKind::InvalidData("height"))?,
            )),
            _ => None,
        };
        let duration = row
            .duration
            .map(u64::try_from)
            .transpose()
            .or_raise(|| ErrorKind::InvalidData("duration"))?
            .map(MediaDuration::from_secs);
        Ok(Self {
            identity: row.identity,
            path: PathBuf::from(row.path),
            mtime: UtcDateTime::from_unix_timestamp_nanos(i128::from(row.mtime))
                .or_raise(|| ErrorKind::InvalidData("mtime"))?,
            kind: row.kind.parse::<MediaKind>().or_raise(|| ErrorKind::InvalidData("kind"))?,
            has_workflow: row.has_workflow,
            favorite: row.favorite,
            dimensions,
            duration,
            indexed_at: UtcDateTime::from_unix_timestamp(row.indexed_at)
                .or_raise(|| ErrorKind::InvalidData("indexing date"))?,
        })
    }
}
