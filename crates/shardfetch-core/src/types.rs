//! Core data types passed between pipeline stages.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ItemError;

/// One `(identifier, url)` pair read from the manifest.
///
/// Consumed exactly once by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Hex-encoded image identifier
    pub identifier: String,
    /// Remote location of the source image
    pub source_url: String,
}

impl WorkItem {
    pub fn new(identifier: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source_url: source_url.into(),
        }
    }
}

/// What happened to a single work item.
#[derive(Debug)]
pub enum Outcome {
    /// The image was fetched, transformed, and written
    Written { path: PathBuf, bytes: u64 },
    /// The destination already existed and overwriting is disabled
    Skipped { path: PathBuf },
    /// Some stage failed; the item is abandoned
    Failed(ItemError),
}

impl Outcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Aggregate counters for a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_written: u64,
    /// Highest number of undelivered items observed in the queue
    pub peak_queue_depth: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Total items the workers handled.
    pub fn total(&self) -> u64 {
        self.written + self.skipped + self.failed
    }

    /// Items handled per second over the whole run.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total() as f64 / secs
        } else {
            0.0
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
