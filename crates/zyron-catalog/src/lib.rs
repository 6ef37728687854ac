//! Index catalog for ZyronDB.
//!
//! This crate provides:
//! - `IndexMetadata`, the durable description of an index, and the catalog
//!   record format it is stored in
//! - `IndexInfo`, the runtime handle that derives an index's key schema and
//!   builds a B+ tree of matching key capacity
//! - `MemHeap`, the arena an `IndexInfo` keeps its objects in
//! - `save_catalog` / `load_catalog` for the catalog file under the data
//!   directory

mod capacity;
mod catalog_file;
mod heap;
mod index_info;
mod metadata;
mod table;

pub use capacity::{KeyCapacity, worst_case_key_size};
pub use catalog_file::{load_catalog, save_catalog};
pub use heap::{HeapHandle, MemHeap};
pub use index_info::IndexInfo;
pub use metadata::{
    INDEX_METADATA_MAGIC, IndexMetadata, read_index_records, write_index_records,
};
pub use table::TableInfo;
