//! Archive limits applied while reading EPUB containers: entry count,
//! entry size, decompression ratio and entry path sanity.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::error::SecurityError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLimits {
    /// Largest tolerated uncompressed/compressed ratio for one entry.
    pub max_compression_ratio: u64,
    /// Largest number of entries in one container.
    pub max_entries: u64,
    /// Largest decompressed size of one entry, in bytes.
    pub max_entry_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_compression_ratio: 100,
            max_entries: 10_000,
            max_entry_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ArchiveLimits {
    pub fn check_entry_count(&self, count: u64) -> Result<(), SecurityError> {
        if count > self.max_entries {
            return Err(SecurityError::TooManyEntries {
                count,
                limit: self.max_entries,
            });
        }
        Ok(())
    }

    /// Validate one entry before it is decompressed.
    pub fn check_entry(
        &self,
        name: &str,
        compressed: u64,
        uncompressed: u64,
    ) -> Result<(), SecurityError> {
        check_entry_path(name)?;

        if uncompressed > self.max_entry_bytes {
            return Err(SecurityError::OversizedEntry {
                name: name.to_string(),
                size_mb: uncompressed / (1024 * 1024),
                limit_mb: self.max_entry_bytes / (1024 * 1024),
            });
        }

        // Stored entries report equal sizes; an empty compressed payload
        // that inflates to something is never legitimate.
        let ratio = match compressed {
            0 if uncompressed > 0 => u64::MAX,
            0 => 0,
            c => uncompressed / c,
        };
        if ratio > self.max_compression_ratio {
            return Err(SecurityError::ZipBomb {
                name: name.to_string(),
                ratio,
                limit: self.max_compression_ratio,
            });
        }
        Ok(())
    }
}

/// Reject absolute paths, drive prefixes and `..` components.
pub fn check_entry_path(entry: &str) -> Result<(), SecurityError> {
    let unsafe_path = || SecurityError::PathTraversal {
        path: entry.to_string(),
    };

    if entry.starts_with('/') || entry.starts_with('\\') {
        return Err(unsafe_path());
    }
    if entry.as_bytes().get(1) == Some(&b':') {
        return Err(unsafe_path());
    }
    if Path::new(entry)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(unsafe_path());
    }
    Ok(())
}
