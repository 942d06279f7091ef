//! Error types for the shardfetch download pipeline.
//!
//! Errors are split by blast radius: [`ItemError`] covers everything that can go
//! wrong with a single work item and is never fatal to the run, while
//! [`ManifestError`] and [`ConfigError`] stop the run before or during startup.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for shardfetch operations.
#[derive(Error, Debug)]
pub enum ShardfetchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The manifest could not be read or is structurally broken
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    Client(String),

    /// A producer or worker task panicked or was cancelled
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Fatal manifest errors. The producer cannot recover from these.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be opened
    #[error("Cannot open manifest {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A required column or field is missing, or the CSV is malformed
    #[error("Malformed manifest at line {line}: {message}")]
    Format { line: u64, message: String },
}

/// Per-item errors, organized by stage.
///
/// These are caught at the worker boundary and turned into a failed outcome for
/// the item alone.
#[derive(Error, Debug)]
pub enum ItemError {
    /// Identifier is not a valid hexadecimal string
    #[error("Malformed identifier {identifier:?}: not a hexadecimal string")]
    MalformedIdentifier { identifier: String },

    /// The shard directory could not be created
    #[error("Cannot create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Timeout, connection failure, non-success status, or body read failure
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The fetched bytes are not a decodable image
    #[error("Decode error for {url}: {message}")]
    Decode { url: String, message: String },

    /// The resized image could not be encoded as JPEG
    #[error("Encode error for {url}: {message}")]
    Encode { url: String, message: String },

    /// The encoded image could not be written to disk
    #[error("Write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ItemError {
    /// Short name of the stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MalformedIdentifier { .. } => "identifier",
            Self::DirectoryCreate { .. } => "mkdir",
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::Write { .. } => "write",
        }
    }
}

/// Convenience type alias for shardfetch results.
pub type Result<T> = std::result::Result<T, ShardfetchError>;

/// Convenience type alias for per-item results.
pub type ItemResult<T> = std::result::Result<T, ItemError>;
