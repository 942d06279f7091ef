//! Command-line surface.
//!
//! The positional `INPUT OUTPUT` pair and the classic flags (`--timeout`,
//! `--queue-size`, `--consumers`, `--min-dim`, `--sub-dirs`, `--force`) keep
//! their original names. Flags left unset fall back to the config file.

pub mod progress;
pub mod run;

use clap::Parser;
use shardfetch_core::config::ShardMode;
use shardfetch_core::Config;
use std::path::PathBuf;

/// shardfetch - download, resize, and shard images listed in a CSV manifest.
#[derive(Parser, Debug)]
#[command(name = "shardfetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Image download timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Maximum image URL queue size
    #[arg(long, value_name = "N")]
    pub queue_size: Option<usize>,

    /// Number of download workers
    #[arg(long, value_name = "N")]
    pub consumers: Option<usize>,

    /// Smallest dimension for the aspect ratio preserving scale (-1 for no scale)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub min_dim: Option<i64>,

    /// Number of directories to split downloads over
    #[arg(long, value_name = "N")]
    pub sub_dirs: Option<u64>,

    /// Force download and overwrite local files
    #[arg(long)]
    pub force: bool,

    /// Write each image to a temporary file and rename it into place
    #[arg(long)]
    pub atomic: bool,

    /// Shard by `id mod sub-dirs` instead of the classic `id mod (sub-dirs - 1)`
    #[arg(long)]
    pub exact_shards: bool,

    /// JPEG quality for saved images (1-100)
    #[arg(long, value_name = "N")]
    pub jpeg_quality: Option<u8>,

    /// Write failed items to this file as JSON Lines
    #[arg(long, value_name = "PATH")]
    pub failures: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", env = "SHARDFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Enable verbose (debug) logging, including one line per item
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log warnings and errors, and hide the progress display
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,

    /// CSV manifest with `ImageID` and `OriginalURL` columns
    #[arg(required_unless_present = "print_config")]
    pub input: Option<PathBuf>,

    /// Save directory
    #[arg(required_unless_present = "print_config")]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Layer explicitly passed flags over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = timeout;
        }
        if let Some(queue_size) = self.queue_size {
            config.pipeline.queue_capacity = queue_size;
        }
        if let Some(consumers) = self.consumers {
            config.pipeline.worker_count = consumers;
        }
        if let Some(min_dim) = self.min_dim {
            config.transform.min_dimension = min_dim;
        }
        if let Some(sub_dirs) = self.sub_dirs {
            config.output.shard_count = sub_dirs;
        }
        if let Some(quality) = self.jpeg_quality {
            config.transform.jpeg_quality = quality;
        }
        if self.force {
            config.output.overwrite_existing = true;
        }
        if self.atomic {
            config.output.atomic_writes = true;
        }
        if self.exact_shards {
            config.output.shard_mode = ShardMode::Exact;
        }
    }
}
