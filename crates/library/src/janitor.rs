//! Age-based expiry of the cache regions.
//!
//! Trash and zip staging fill up with entries nobody will look at again. A
//! sweep deletes every top-level entry of a region whose modification time is
//! older than the cutoff. The catalog is never touched: nothing in a cache
//! region is cataloged.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::instrument;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// An entry that could not be inspected or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepError {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub errors: Vec<SweepError>,
}

#[derive(Debug, Clone)]
pub struct Janitor {
    regions: Arc<[PathBuf]>,
    running: Arc<Mutex<()>>,
}

impl Janitor {
    pub fn new(regions: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            regions: regions.into_iter().collect(),
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn regions(&self) -> &[PathBuf] {
        &self.regions
    }

    /// Delete region entries last modified more than `max_age_days` ago.
    ///
    /// Only one sweep runs at a time; a concurrent call fails with
    /// [`ErrorKind::SweepInProgress`] instead of waiting.
    #[instrument(skip(self))]
    pub async fn sweep(&self, max_age_days: u64) -> Result<SweepReport> {
        let Ok(_guard) = self.running.try_lock() else {
            exn::bail!(ErrorKind::SweepInProgress);
        };
        let max_age = Duration::from_secs(max_age_days.saturating_mul(SECONDS_PER_DAY));
        let cutoff = SystemTime::now().checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
        let regions = Arc::clone(&self.regions);
        let report = tokio::task::spawn_blocking(move || {
            let mut report = SweepReport::default();
            for region in regions.iter() {
                sweep_region(region, cutoff, &mut report);
            }
            report
        })
        .await
        .or_raise(|| ErrorKind::Task)?;
        tracing::info!(deleted = report.deleted, errors = report.errors.len(), "Swept cache regions");
        Ok(report)
    }

    /// Sweep every `interval` until the returned handle is aborted. The first
    /// sweep happens straight away.
    pub fn spawn_periodic(&self, interval: Duration, max_age_days: u64) -> JoinHandle<()> {
        let janitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match janitor.sweep(max_age_days).await {
                    Ok(_) => {},
                    Err(e) if matches!(&*e, ErrorKind::SweepInProgress) => {
                        tracing::debug!("Previous sweep still running; skipping");
                    },
                    Err(e) => tracing::warn!(error = %e, "Periodic sweep failed"),
                }
            }
        })
    }
}

fn sweep_region(region: &Path, cutoff: SystemTime, report: &mut SweepReport) {
    let entries = match std::fs::read_dir(region) {
        Ok(entries) => entries,
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            tracing::debug!(region = %region.display(), "Cache region does not exist; skipping");
            return;
        },
        Err(e) => {
            report.errors.push(SweepError {
                path: region.to_path_buf(),
                message: e.to_string(),
            });
            return;
        },
    };
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                report.errors.push(SweepError {
                    path: region.to_path_buf(),
                    message: e.to_string(),
                });
                continue;
            },
        };
        match expire(&path, cutoff) {
            Ok(true) => {
                tracing::debug!(path = %path.display(), "Expired cache entry");
                report.deleted += 1;
            },
            Ok(false) => {},
            // Deleted by somebody else in the meantime.
            Err(e) if e.kind() == IoErrorKind::NotFound => {},
            Err(e) => report.errors.push(SweepError {
                path,
                message: e.to_string(),
            }),
        }
    }
}

/// Delete `path` if it was last modified before `cutoff`. Symlinks are
/// removed, never followed.
fn expire(path: &Path, cutoff: SystemTime) -> std::io::Result<bool> {
    let metadata = std::fs::symlink_metadata(path)?;
    if metadata.modified()? >= cutoff {
        return Ok(false);
    }
    match metadata.is_dir() {
        true => std::fs::remove_dir_all(path)?,
        false => std::fs::remove_file(path)?,
    }
    Ok(true)
}
