//! Configuration structures for ZyronDB.

use crate::error::{Result, ZyronError};
use crate::page::PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for the database engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for data files.
    pub data_dir: PathBuf,
    /// Page size in bytes. Must equal `PAGE_SIZE`.
    pub page_size: usize,
    /// Buffer pool size in number of pages (0 = sized from system memory).
    pub buffer_pool_pages: usize,
    /// Catalog file holding the packed index metadata records, relative to
    /// `data_dir`.
    pub catalog_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            page_size: PAGE_SIZE,
            buffer_pool_pages: 8192, // 128 MB with 16 KB pages
            catalog_file: PathBuf::from("catalog.idx"),
        }
    }
}

impl StorageConfig {
    /// Checks that the configuration matches what the engine was built for.
    pub fn validate(&self) -> Result<()> {
        if self.page_size != PAGE_SIZE {
            return Err(ZyronError::ConfigError(format!(
                "page_size {} unsupported, pages are {} bytes",
                self.page_size, PAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Returns the full path of the catalog file.
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }
}

/// What index construction does when the worst-case key of an index is larger
/// than the biggest fixed-capacity key variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OversizedKeyPolicy {
    /// Fail with `CapacityOverflow`.
    #[default]
    Reject,
    /// Build the largest variant anyway. Keys whose encoding exceeds it are
    /// rejected one by one at insert time.
    ClampToLargest,
}

/// Configuration applied when an index is constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Handling of keys that do not fit the largest variant.
    pub oversized_keys: OversizedKeyPolicy,
    /// Maximum entries per leaf node (None = derived from page size).
    pub leaf_max_size: Option<usize>,
    /// Maximum children per internal node (None = derived from page size).
    pub internal_max_size: Option<usize>,
}

impl IndexConfig {
    /// Smallest fanout that still lets a node split into two non-empty halves.
    pub const MIN_FANOUT: usize = 3;

    /// Checks the fanout overrides.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("leaf_max_size", self.leaf_max_size),
            ("internal_max_size", self.internal_max_size),
        ] {
            if let Some(v) = value {
                if v < Self::MIN_FANOUT {
                    return Err(ZyronError::ConfigError(format!(
                        "{} must be at least {}, got {}",
                        name,
                        Self::MIN_FANOUT,
                        v
                    )));
                }
            }
        }
        Ok(())
    }
}
