//! Polymorphic index interface.

use crate::schema::Schema;
use crate::tuple::{Row, RowId};
use std::sync::Arc;
use zyron_buffer::EvictedPage;
use zyron_common::Result;

/// An index mapping key rows to the row ids they identify.
///
/// Callers hold indexes as `Box<dyn Index>` without knowing the concrete key
/// capacity. Key rows are laid out according to [`Index::key_schema`], one
/// field per key column in key order.
pub trait Index: Send + Sync {
    /// Identifier of the index in the catalog.
    fn index_id(&self) -> u32;

    /// Fixed key capacity in bytes.
    fn key_capacity(&self) -> usize;

    /// Schema the key rows must follow.
    fn key_schema(&self) -> &Arc<Schema>;

    /// Inserts a key. Fails with `DuplicateKey` if it is already present.
    fn insert_entry(&self, key: &Row, row_id: RowId) -> Result<()>;

    /// Removes a key. Returns false if it was not present.
    fn remove_entry(&self, key: &Row) -> Result<bool>;

    /// Point lookup.
    fn scan_key(&self, key: &Row) -> Result<Option<RowId>>;

    /// Returns the row ids of all keys in `[low, high]` in key order.
    /// A missing bound is unbounded on that side.
    fn range_scan(&self, low: Option<&Row>, high: Option<&Row>) -> Result<Vec<RowId>>;

    /// Number of keys stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the index into the buffer pool.
    ///
    /// Returns the dirty pages the pool evicted to make room. The caller owns
    /// them and must persist them.
    fn flush(&self) -> Result<Vec<EvictedPage>>;
}
