//! Per-item fetch → transform → write, with failure isolation.
//!
//! Every error a single item can hit is converted into [`Outcome::Failed`]
//! inside [`FetchWorker::process`]; nothing an item does can stop the worker
//! loop or affect other workers.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::channel::QueueReceiver;
use super::fetch::Fetcher;
use super::shard::PathSharder;
use super::transform::ImageTransform;
use crate::error::{ItemError, ItemResult};
use crate::types::{Outcome, RunSummary, WorkItem};

/// Callback invoked once per finished item.
pub type OutcomeObserver = Arc<dyn Fn(&WorkItem, &Outcome) + Send + Sync>;

/// Read-only state shared by every worker in a run.
pub struct WorkerContext {
    pub sharder: PathSharder,
    pub transform: ImageTransform,
    pub fetcher: Arc<dyn Fetcher>,
    pub overwrite_existing: bool,
    pub atomic_writes: bool,
}

/// One member of the worker pool.
pub struct FetchWorker {
    id: usize,
    ctx: Arc<WorkerContext>,
}

impl FetchWorker {
    pub fn new(id: usize, ctx: Arc<WorkerContext>) -> Self {
        Self { id, ctx }
    }

    /// Pull items until the queue is closed and drained.
    pub async fn run(
        self,
        queue: QueueReceiver,
        counters: Arc<OutcomeCounters>,
        observer: Option<OutcomeObserver>,
    ) {
        tracing::trace!(worker = self.id, "Worker started");
        while let Some(item) = queue.recv().await {
            let outcome = self.process(&item).await;
            counters.record(&outcome);
            if let Some(observer) = &observer {
                observer(&item, &outcome);
            }
        }
        tracing::trace!(worker = self.id, "Queue closed and drained, worker exiting");
    }

    /// Handle one item. Never returns an error: failures become `Outcome::Failed`.
    pub async fn process(&self, item: &WorkItem) -> Outcome {
        match self.try_process(item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    worker = self.id,
                    stage = e.stage(),
                    "error {} ({}): {}",
                    item.identifier,
                    item.source_url,
                    e
                );
                Outcome::Failed(e)
            }
        }
    }

    async fn try_process(&self, item: &WorkItem) -> ItemResult<Outcome> {
        let path = self.ctx.sharder.resolve(&item.identifier).await?;

        if !self.ctx.overwrite_existing && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("skipping {}, already exists", path.display());
            return Ok(Outcome::Skipped { path });
        }

        let start = std::time::Instant::now();
        let raw = self.ctx.fetcher.fetch(&item.source_url).await?;
        let fetch_time = start.elapsed();

        let transform = self.ctx.transform.clone();
        let url = item.source_url.clone();
        let encoded = tokio::task::spawn_blocking(move || transform.transform(&raw, &url))
            .await
            .map_err(|e| ItemError::Decode {
                url: item.source_url.clone(),
                message: format!("Task join error: {e}"),
            })??;

        let bytes = encoded.len() as u64;
        let atomic = self.ctx.atomic_writes;
        let dest = path.clone();
        tokio::task::spawn_blocking(move || write_output(&dest, &encoded, atomic))
            .await
            .map_err(|e| ItemError::Write {
                path: path.clone(),
                source: io::Error::other(e),
            })??;
        tracing::debug!(
            "saving {} to {} (fetch {:?}, total {:?})",
            item.source_url,
            path.display(),
            fetch_time,
            start.elapsed()
        );

        Ok(Outcome::Written { path, bytes })
    }
}

/// Write `bytes` to `path`. Blocking; run it off the async workers.
///
/// In atomic mode the bytes go to a uniquely named `.<name>.XXXXXX.part` file
/// in the same directory, which is renamed over `path`. The temporary file is
/// removed if any step fails.
fn write_output(path: &Path, bytes: &[u8], atomic: bool) -> ItemResult<()> {
    let write_err = |source: io::Error| ItemError::Write {
        path: path.to_path_buf(),
        source,
    };

    if !atomic {
        return std::fs::write(path, bytes).map_err(write_err);
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut prefix = OsString::from(".");
    prefix.push(path.file_name().unwrap_or_default());
    prefix.push(".");

    let mut part = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(write_err)?;
    part.write_all(bytes).map_err(write_err)?;
    part.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Outcome tallies shared by the pool.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    written: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    bytes_written: AtomicU64,
}

impl OutcomeCounters {
    pub fn record(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Written { bytes, .. } => {
                self.written.fetch_add(1, Ordering::Relaxed);
                self.bytes_written.fetch_add(*bytes, Ordering::Relaxed);
            }
            Outcome::Skipped { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn summary(&self, peak_queue_depth: usize, elapsed: Duration) -> RunSummary {
        RunSummary {
            written: self.written.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            peak_queue_depth,
            elapsed,
        }
    }
}
