//! Deterministic identifier → output path mapping.
//!
//! Layout: `<root>/<shard_id>/<identifier>.jpg`, where `shard_id` is the
//! identifier read as a base-16 integer modulo the shard mode's bucket count.

use std::path::{Path, PathBuf};

use crate::config::{OutputConfig, ShardMode};
use crate::error::{ConfigError, ItemError, ItemResult};

/// A resolved destination for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    pub shard_id: u64,
    pub file_path: PathBuf,
}

/// Maps identifiers to sharded output paths.
#[derive(Debug, Clone)]
pub struct PathSharder {
    root: PathBuf,
    modulus: u64,
}

impl PathSharder {
    /// Create a sharder for `root` using the configured shard count and mode.
    pub fn new(root: impl Into<PathBuf>, output: &OutputConfig) -> Result<Self, ConfigError> {
        Self::with_mode(root, output.shard_count, output.shard_mode)
    }

    pub fn with_mode(
        root: impl Into<PathBuf>,
        shard_count: u64,
        mode: ShardMode,
    ) -> Result<Self, ConfigError> {
        let modulus = mode.modulus(shard_count);
        if modulus == 0 {
            return Err(ConfigError::ValidationError(format!(
                "shard_count {shard_count} leaves no buckets in {mode:?} mode"
            )));
        }
        Ok(Self {
            root: root.into(),
            modulus,
        })
    }

    /// Output root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of distinct shard directories this sharder can produce.
    pub fn bucket_count(&self) -> u64 {
        self.modulus
    }

    /// Compute the destination without touching the filesystem.
    pub fn locate(&self, identifier: &str) -> ItemResult<OutputPath> {
        let shard_id =
            hex_mod(identifier, self.modulus).ok_or_else(|| ItemError::MalformedIdentifier {
                identifier: identifier.to_string(),
            })?;
        let file_path = self
            .root
            .join(shard_id.to_string())
            .join(format!("{identifier}.jpg"));
        Ok(OutputPath {
            shard_id,
            file_path,
        })
    }

    /// Compute the destination and make sure its shard directory exists.
    pub async fn resolve(&self, identifier: &str) -> ItemResult<PathBuf> {
        let OutputPath { file_path, .. } = self.locate(identifier)?;
        if let Some(dir) = file_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ItemError::DirectoryCreate {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        Ok(file_path)
    }
}

/// `int(identifier, 16) % modulus`, folded digit by digit so identifiers of any
/// length are accepted.
///
/// Returns `None` for an empty string, a non-hex character, or a zero modulus.
pub fn hex_mod(identifier: &str, modulus: u64) -> Option<u64> {
    if identifier.is_empty() || modulus == 0 {
        return None;
    }
    let modulus = u128::from(modulus);
    let mut rem: u128 = 0;
    for c in identifier.chars() {
        let digit = c.to_digit(16)?;
        rem = (rem * 16 + u128::from(digit)) % modulus;
    }
    u64::try_from(rem).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_mod_matches_integer_arithmetic() {
        for id in ["0", "ff00", "000002b66c9c498e", "DEADBEEF", "7fffffffffffffff"] {
            let value = u64::from_str_radix(id, 16).unwrap();
            for m in [1u64, 2, 15, 999, 1000] {
                assert_eq!(hex_mod(id, m), Some(value % m), "{id} mod {m}");
            }
        }
    }

    #[test]
    fn test_hex_mod_wide_identifier() {
        // 2^128 is 16^32; 16^32 mod 15 == 1 because 16 ≡ 1 (mod 15)
        let id = format!("1{}", "0".repeat(32));
        assert_eq!(hex_mod(&id, 15), Some(1));
    }

    #[test]
    fn test_hex_mod_rejects_non_hex() {
        assert_eq!(hex_mod("", 10), None);
        assert_eq!(hex_mod("xyz", 10), None);
        assert_eq!(hex_mod("12 34", 10), None);
        assert_eq!(hex_mod("../etc", 10), None);
        assert_eq!(hex_mod("ff", 0), None);
    }

    #[test]
    fn test_locate_legacy_layout() {
        let sharder = PathSharder::with_mode("/out", 16, ShardMode::Legacy).unwrap();
        // 0xff00 = 65280 = 15 * 4352
        let out = sharder.locate("ff00").unwrap();
        assert_eq!(out.shard_id, 0);
        assert_eq!(out.file_path, PathBuf::from("/out/0/ff00.jpg"));

        let out = sharder.locate("ff0e").unwrap();
        assert_eq!(out.shard_id, 14);
    }

    #[test]
    fn test_locate_exact_layout() {
        let sharder = PathSharder::with_mode("/out", 16, ShardMode::Exact).unwrap();
        let out = sharder.locate("ff0e").unwrap();
        assert_eq!(out.shard_id, 14);
        let out = sharder.locate("ff0f").unwrap();
        assert_eq!(out.shard_id, 15);
    }

    #[test]
    fn test_legacy_shards_stay_below_count_minus_one() {
        let sharder = PathSharder::with_mode("/out", 7, ShardMode::Legacy).unwrap();
        assert_eq!(sharder.bucket_count(), 6);
        for n in 0u64..500 {
            let id = format!("{n:x}");
            let shard = sharder.locate(&id).unwrap().shard_id;
            assert!(shard <= 5, "{id} landed in shard {shard}");
            assert_eq!(sharder.locate(&id).unwrap().shard_id, shard);
        }
    }

    #[test]
    fn test_zero_buckets_rejected() {
        assert!(PathSharder::with_mode("/out", 1, ShardMode::Legacy).is_err());
        assert!(PathSharder::with_mode("/out", 0, ShardMode::Exact).is_err());
        assert!(PathSharder::with_mode("/out", 1, ShardMode::Exact).is_ok());
    }

    #[tokio::test]
    async fn test_resolve_creates_directory_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let sharder = PathSharder::with_mode(dir.path(), 16, ShardMode::Legacy).unwrap();

        let first = sharder.resolve("ff0e").await.unwrap();
        assert!(dir.path().join("14").is_dir());
        let second = sharder.resolve("ff0e").await.unwrap();
        assert_eq!(first, second);
        assert!(!first.exists());
    }

    #[tokio::test]
    async fn test_resolve_reports_malformed_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let sharder = PathSharder::with_mode(dir.path(), 16, ShardMode::Legacy).unwrap();
        let err = sharder.resolve("not-hex").await.unwrap_err();
        assert!(matches!(err, ItemError::MalformedIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_resolve_reports_directory_create_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the shard directory should go
        std::fs::write(dir.path().join("14"), b"in the way").unwrap();
        let sharder = PathSharder::with_mode(dir.path(), 16, ShardMode::Legacy).unwrap();
        let err = sharder.resolve("ff0e").await.unwrap_err();
        assert!(matches!(err, ItemError::DirectoryCreate { .. }));
    }
}
