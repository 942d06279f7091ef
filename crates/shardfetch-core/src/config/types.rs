//! Sub-configuration structs with defaults matching the classic downloader flags.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::pipeline::transform::TransformPolicy;

/// Queue and worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max work items buffered between the manifest reader and the workers
    pub queue_capacity: usize,

    /// Number of parallel download workers
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            worker_count: 5,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (fractional values allowed)
    pub timeout_secs: f64,

    /// Override for the User-Agent header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 2.0,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    /// Per-request timeout as a `Duration`.
    ///
    /// Only meaningful after validation (positive and finite).
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum response body size in megabytes
    pub max_download_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_download_mb: 100,
        }
    }
}

impl LimitsConfig {
    /// Maximum response body size in bytes.
    pub fn max_download_bytes(&self) -> u64 {
        self.max_download_mb.saturating_mul(1024 * 1024)
    }
}

/// Resize and encode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Smallest output dimension after an aspect-ratio preserving scale.
    /// `-1` keeps images at full size.
    pub min_dimension: i64,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            min_dimension: 256,
            jpeg_quality: 75,
        }
    }
}

impl TransformConfig {
    /// Resolve the resize policy from `min_dimension`.
    ///
    /// Returns `None` for values that are neither the `-1` sentinel nor a
    /// positive dimension that fits in `u32`.
    pub fn policy(&self) -> Option<TransformPolicy> {
        match self.min_dimension {
            -1 => Some(TransformPolicy::NoScale),
            n if n > 0 => u32::try_from(n).ok().map(TransformPolicy::MinDimension),
            _ => None,
        }
    }
}

/// How identifiers are bucketed into shard directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardMode {
    /// `value mod (shard_count - 1)`, the layout produced by the classic downloader
    #[default]
    Legacy,
    /// `value mod shard_count`
    Exact,
}

impl ShardMode {
    /// Number of buckets actually used for a given `shard_count`.
    pub fn modulus(self, shard_count: u64) -> u64 {
        match self {
            Self::Legacy => shard_count.saturating_sub(1),
            Self::Exact => shard_count,
        }
    }
}

/// Output tree settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of shard directories to split downloads over
    pub shard_count: u64,

    /// Re-fetch and overwrite files that already exist
    pub overwrite_existing: bool,

    /// Write to a temporary file and rename into place
    pub atomic_writes: bool,

    /// Shard bucketing scheme
    pub shard_mode: ShardMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            shard_count: 1000,
            overwrite_existing: false,
            atomic_writes: false,
            shard_mode: ShardMode::Legacy,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
