//! Fixed-size pool of extraction workers fed from a bounded queue.

use crate::sync::pass::Task;
use async_channel as chan;
use mediadex_catalog::{Entry, Repository};
use mediadex_extract::Extractor;
use mediadex_extract::models::Extraction;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// What happened to one queued file.
#[derive(Debug)]
pub(crate) enum Outcome {
    Indexed { existing: bool, degraded: bool },
    Failed { path: PathBuf, message: String },
}

/// Extract and upsert every task using `workers` concurrent workers, and
/// wait for the queue to drain. Order of completion is unspecified.
pub(crate) async fn run(tasks: Vec<Task>, workers: usize, extractor: Arc<Extractor>, catalog: Repository) -> Vec<Outcome> {
    if tasks.is_empty() {
        return Vec::new();
    }
    let (tx, rx) = chan::bounded(tasks.len());
    for task in tasks {
        // The queue holds the whole pass, so this never waits.
        if let Err(e) = tx.send(task).await {
            tracing::error!(path = %e.0.path.display(), "Sync queue closed early");
        }
    }
    // Workers stop once the queue is empty and closed.
    tx.close();

    let mut set = JoinSet::new();
    for _ in 0..workers.min(rx.len()).max(1) {
        let (rx, extractor, catalog) = (rx.clone(), Arc::clone(&extractor), catalog.clone());
        set.spawn(async move {
            let mut outcomes = Vec::new();
            while let Ok(task) = rx.recv().await {
                outcomes.push(process(task, &extractor, &catalog).await);
            }
            outcomes
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(batch) => outcomes.extend(batch),
            // Extractor panics are caught per task; this is the worker itself.
            Err(e) => tracing::error!(error = %e, "Sync worker failed"),
        }
    }
    outcomes
}

async fn process(task: Task, extractor: &Arc<Extractor>, catalog: &Repository) -> Outcome {
    let extraction = {
        let extractor = Arc::clone(extractor);
        let target = task.path.clone();
        match tokio::task::spawn_blocking(move || extractor.extract(&target)).await {
            Ok(extraction) => extraction,
            // Still cataloged, so the same file isn't retried until it changes.
            Err(e) => {
                tracing::error!(path = %task.path.display(), error = %e, "Extraction aborted; cataloging as unknown");
                Extraction::degraded(false)
            },
        }
    };
    let path = task.path.clone();
    let entry = Entry::new(task.path, task.mtime, &extraction).with_favorite(task.favorite);
    match catalog.upsert(&entry).await {
        Ok(()) => Outcome::Indexed {
            existing: task.existing,
            degraded: extraction.degraded,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to store catalog entry");
            Outcome::Failed {
                path,
                message: e.to_string(),
            }
        },
    }
}
