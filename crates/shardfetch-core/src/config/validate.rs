//! Configuration validation with range checks.

use std::time::Duration;

use crate::error::ConfigError;

use super::{Config, ShardMode};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.queue_capacity must be > 0".into(),
            ));
        }
        if self.pipeline.worker_count == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.worker_count must be > 0".into(),
            ));
        }
        let timeout_ok = Duration::try_from_secs_f64(self.http.timeout_secs).is_ok();
        if !timeout_ok || self.http.timeout_secs <= 0.0 {
            return Err(ConfigError::ValidationError(
                "http.timeout_secs must be a positive number".into(),
            ));
        }
        if self.limits.max_download_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_download_mb must be > 0".into(),
            ));
        }
        if self.transform.policy().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "transform.min_dimension must be -1 or a positive pixel count (got {})",
                self.transform.min_dimension
            )));
        }
        if !(1..=100).contains(&self.transform.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "transform.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        let min_shards = match self.output.shard_mode {
            ShardMode::Legacy => 2,
            ShardMode::Exact => 1,
        };
        if self.output.shard_count < min_shards {
            return Err(ConfigError::ValidationError(format!(
                "output.shard_count must be >= {min_shards} in {:?} mode",
                self.output.shard_mode
            )));
        }
        Ok(())
    }
}
