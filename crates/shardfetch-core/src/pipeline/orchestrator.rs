//! Pipeline orchestration: one manifest producer, a bounded queue, and a fixed
//! pool of fetch workers.
//!
//! ```text
//! Manifest ──▶ ManifestProducer ──▶ [bounded queue] ──▶ N × FetchWorker ──▶ <root>/<shard>/<id>.jpg
//! ```
//!
//! The producer runs on a blocking thread and closes the queue when it returns.
//! Workers exit once the queue is closed and drained, so a momentarily empty
//! queue never ends a run early.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use super::channel::work_queue;
use super::fetch::{Fetcher, HttpFetcher};
use super::manifest::{Manifest, ManifestProducer};
use super::shard::PathSharder;
use super::transform::ImageTransform;
use super::worker::{FetchWorker, OutcomeCounters, OutcomeObserver, WorkerContext};
use crate::config::Config;
use crate::error::{Result, ShardfetchError};
use crate::types::RunSummary;

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, not yet running
    Idle,
    /// Producer and workers are active
    Running,
    /// Producer has finished and closed the queue; workers are draining it
    Draining,
    /// Every worker has exited
    Terminated,
}

/// Owns the run-wide configuration and spawns producer and workers.
pub struct Pipeline {
    config: Config,
    ctx: Arc<WorkerContext>,
    state: watch::Sender<PipelineState>,
}

impl Pipeline {
    /// Create a pipeline that fetches over HTTP and writes under `output_root`.
    pub fn new(config: Config, output_root: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::from_config(&config)?;
        Self::with_fetcher(config, output_root, Arc::new(fetcher))
    }

    /// Create a pipeline with a custom fetcher.
    pub fn with_fetcher(
        config: Config,
        output_root: impl Into<PathBuf>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let ctx = WorkerContext {
            sharder: PathSharder::new(output_root, &config.output)?,
            transform: ImageTransform::from_config(&config.transform)?,
            fetcher,
            overwrite_existing: config.output.overwrite_existing,
            atomic_writes: config.output.atomic_writes,
        };
        let (state, _) = watch::channel(PipelineState::Idle);
        Ok(Self {
            config,
            ctx: Arc::new(ctx),
            state,
        })
    }

    /// Get a reference to the run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Run over the manifest file at `input`.
    pub async fn run_path(&self, input: &Path) -> Result<RunSummary> {
        let manifest = Manifest::open(input)?;
        self.run(manifest).await
    }

    /// Run over an already opened manifest.
    pub async fn run<R>(&self, manifest: Manifest<R>) -> Result<RunSummary>
    where
        R: Read + Send + 'static,
    {
        self.run_with_observer(manifest, None).await
    }

    /// Run, invoking `observer` once for every item a worker finishes.
    ///
    /// Item failures never fail the run. The run fails only if the manifest is
    /// structurally broken or a task panics; in both cases workers still drain
    /// whatever was already enqueued before this returns.
    pub async fn run_with_observer<R>(
        &self,
        manifest: Manifest<R>,
        observer: Option<OutcomeObserver>,
    ) -> Result<RunSummary>
    where
        R: Read + Send + 'static,
    {
        let start = Instant::now();
        let worker_count = self.config.pipeline.worker_count;
        let (sender, receiver) = work_queue(self.config.pipeline.queue_capacity);
        let monitor = sender.monitor();
        let counters = Arc::new(OutcomeCounters::default());

        tracing::info!(
            "Starting {} workers (queue capacity {}, output {:?})",
            worker_count,
            self.config.pipeline.queue_capacity,
            self.ctx.sharder.root()
        );
        self.state.send_replace(PipelineState::Running);

        let producer =
            tokio::task::spawn_blocking(move || ManifestProducer::new(manifest).produce(sender));

        let workers: Vec<_> = (0..worker_count)
            .map(|id| {
                let worker = FetchWorker::new(id, self.ctx.clone());
                tokio::spawn(worker.run(receiver.clone(), counters.clone(), observer.clone()))
            })
            .collect();
        drop(receiver);

        let produced = producer.await;
        self.state.send_replace(PipelineState::Draining);
        match &produced {
            Ok(Ok(count)) => tracing::debug!("Producer enqueued {} items", count),
            Ok(Err(e)) => tracing::error!("Producer stopped: {}", e),
            Err(e) => tracing::error!("Producer task failed: {}", e),
        }

        let mut worker_failure = None;
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
                worker_failure.get_or_insert(e);
            }
        }
        self.state.send_replace(PipelineState::Terminated);

        let summary = counters.summary(monitor.peak_depth(), start.elapsed());
        tracing::info!(
            "Run finished: {} written, {} skipped, {} failed in {:.1?}",
            summary.written,
            summary.skipped,
            summary.failed,
            summary.elapsed
        );

        produced??;
        if let Some(e) = worker_failure {
            return Err(ShardfetchError::Join(e));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShardMode;
    use crate::error::ManifestError;
    use crate::pipeline::testing::{png_bytes, StaticFetcher};
    use crate::types::{Outcome, WorkItem};
    use image::GenericImageView;
    use std::sync::Mutex;
    use std::time::Duration;

    fn config(shard_count: u64, min_dimension: i64) -> Config {
        let mut config = Config::default();
        config.output.shard_count = shard_count;
        config.transform.min_dimension = min_dimension;
        config.pipeline.worker_count = 3;
        config.pipeline.queue_capacity = 4;
        config
    }

    fn manifest(csv: String) -> Manifest<std::io::Cursor<Vec<u8>>> {
        Manifest::from_reader(std::io::Cursor::new(csv.into_bytes())).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_row_lands_in_expected_shard() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            StaticFetcher::new().with("http://example.test/a.jpg", png_bytes(300, 200)),
        );
        let pipeline = Pipeline::with_fetcher(config(16, 100), dir.path(), fetcher).unwrap();

        let summary = pipeline
            .run(manifest(
                "ImageID,OriginalURL\nff00,http://example.test/a.jpg\n".to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(summary.written, 1);
        // 0xff00 = 65280 is a multiple of 15 (sub_dirs - 1)
        let path = dir.path().join("0").join("ff00.jpg");
        let image = image::open(&path).unwrap();
        assert_eq!(image.dimensions(), (150, 100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failing_item_does_not_affect_valid_item() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            Arc::new(StaticFetcher::new().with("http://ok.test/a.jpg", png_bytes(200, 200)));
        let pipeline = Pipeline::with_fetcher(config(16, 100), dir.path(), fetcher).unwrap();

        let summary = pipeline
            .run(manifest(
                "ImageID,OriginalURL\n\
                 ff01,http://unreachable.test/b.jpg\n\
                 ff00,http://ok.test/a.jpg\n"
                    .to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(summary.written, 1);
        assert_eq!(summary.failed, 1);
        assert!(dir.path().join("0").join("ff00.jpg").exists());
        assert!(!dir.path().join("1").join("ff01.jpg").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_second_run_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("ImageID,OriginalURL\n");
        let mut fetcher = StaticFetcher::new();
        for n in 0..20u32 {
            let url = format!("http://example.test/{n}.jpg");
            csv.push_str(&format!("{:04x},{url}\n", n + 0x100));
            fetcher = fetcher.with(&url, png_bytes(64, 48));
        }
        let fetcher = Arc::new(fetcher);
        let pipeline =
            Pipeline::with_fetcher(config(8, 32), dir.path(), fetcher.clone()).unwrap();

        let first = pipeline.run(manifest(csv.clone())).await.unwrap();
        assert_eq!(first.written, 20);
        assert_eq!(fetcher.calls(), 20);

        let second = pipeline.run(manifest(csv)).await.unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 20);
        assert_eq!(fetcher.calls(), 20, "second run must not touch the network");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_item_processed_once_and_queue_stays_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("ImageID,OriginalURL\n");
        for n in 0..60u32 {
            // None of these URLs resolve; only delivery is under test
            csv.push_str(&format!("{n:x},http://example.test/{n}.jpg\n"));
        }
        let fetcher = Arc::new(StaticFetcher::new().with_delay(Duration::from_millis(5)));
        let mut config = config(16, 100);
        config.pipeline.queue_capacity = 2;
        config.pipeline.worker_count = 2;
        let pipeline = Pipeline::with_fetcher(config, dir.path(), fetcher.clone()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer: OutcomeObserver = {
            let seen = seen.clone();
            Arc::new(move |item: &WorkItem, outcome: &Outcome| {
                assert!(outcome.is_failed());
                seen.lock().unwrap().push(item.identifier.clone());
            })
        };

        let summary = pipeline
            .run_with_observer(manifest(csv), Some(observer))
            .await
            .unwrap();

        assert_eq!(summary.failed, 60);
        assert!(summary.peak_queue_depth <= 2);
        assert!(summary.peak_queue_depth >= 1);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        let mut expected: Vec<String> = (0..60u32).map(|n| format!("{n:x}")).collect();
        expected.sort();
        assert_eq!(seen, expected);
        assert_eq!(fetcher.calls(), 60);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_malformed_manifest_fails_run_after_draining() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            StaticFetcher::new().with("http://example.test/a.jpg", png_bytes(120, 120)),
        );
        let pipeline = Pipeline::with_fetcher(config(16, 100), dir.path(), fetcher).unwrap();
        let mut states = pipeline.subscribe();
        assert_eq!(*states.borrow_and_update(), PipelineState::Idle);

        let err = pipeline
            .run(manifest(
                "ImageID,OriginalURL\nff00,http://example.test/a.jpg\nff01\n".to_string(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShardfetchError::Manifest(ManifestError::Format { line: 3, .. })
        ));
        assert_eq!(pipeline.state(), PipelineState::Terminated);
        assert!(states.has_changed().unwrap());
        // The row read before the broken one was still handled
        assert!(dir.path().join("0").join("ff00.jpg").exists());
    }

    #[tokio::test]
    async fn test_run_path_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::with_fetcher(
            config(16, 100),
            dir.path(),
            Arc::new(StaticFetcher::new()),
        )
        .unwrap();

        let err = pipeline
            .run_path(&dir.path().join("missing.csv"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShardfetchError::Manifest(ManifestError::Open { .. })
        ));
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.output.shard_count = 1;
        let result = Pipeline::with_fetcher(config, "/tmp/out", Arc::new(StaticFetcher::new()));
        assert!(matches!(result, Err(ShardfetchError::Config(_))));

        let mut config = Config::default();
        config.output.shard_mode = ShardMode::Exact;
        config.output.shard_count = 1;
        let result = Pipeline::with_fetcher(config, "/tmp/out", Arc::new(StaticFetcher::new()));
        assert!(result.is_ok());
    }
}
