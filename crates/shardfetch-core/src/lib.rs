//! shardfetch core - bulk image download library.
//!
//! Reads `(ImageID, OriginalURL)` rows from a CSV manifest, fetches each image,
//! resizes it so its smaller side matches a target, and writes it as JPEG into a
//! sharded directory tree. Per-item failures are logged and counted but never
//! stop the run.
//!
//! # Architecture
//!
//! ```text
//! CSV → ManifestProducer → bounded queue → N × FetchWorker → <root>/<shard>/<id>.jpg
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use shardfetch_core::{Config, Pipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> shardfetch_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = Pipeline::new(config, "./images")?;
//!
//!     let summary = pipeline.run_path(Path::new("manifest.csv")).await?;
//!     println!("{} written, {} failed", summary.written, summary.failed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, ItemError, ManifestError, Result, ShardfetchError};
pub use pipeline::{Fetcher, HttpFetcher, Manifest, Pipeline, PipelineState};
pub use report::{FailureRecord, ReportWriter};
pub use types::{Outcome, RunSummary, WorkItem};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
