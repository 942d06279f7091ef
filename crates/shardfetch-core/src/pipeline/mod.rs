//! Download pipeline components.
//!
//! This module contains every stage between the manifest and the output tree:
//! - **manifest**: CSV manifest reading and the queue producer
//! - **channel**: Bounded work queue for backpressure
//! - **shard**: Identifier → sharded output path
//! - **fetch**: Remote byte fetching behind the `Fetcher` trait
//! - **transform**: Decode, resize, and JPEG re-encode
//! - **worker**: Per-item processing with failure isolation
//! - **orchestrator**: Wires producer, queue, and worker pool together

pub mod channel;
pub mod fetch;
pub mod manifest;
pub mod orchestrator;
pub mod shard;
pub mod transform;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use channel::{work_queue, QueueMonitor, QueueReceiver, QueueSender};
pub use fetch::{Fetcher, HttpFetcher};
pub use manifest::{Manifest, ManifestProducer};
pub use orchestrator::{Pipeline, PipelineState};
pub use shard::{OutputPath, PathSharder};
pub use transform::{ImageTransform, TransformPolicy};
pub use worker::{FetchWorker, OutcomeCounters, OutcomeObserver, WorkerContext};
