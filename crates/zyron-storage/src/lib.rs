//! Record model and indexes for ZyronDB.
//!
//! This crate provides:
//! - Column and schema definitions shared between tables and index keys
//! - Row, field and row id representation
//! - Fixed-capacity keys with byte-wise ordering
//! - The `Index` trait and its B+ tree implementation

mod btree;
mod index;
mod schema;
mod tuple;

pub use btree::{
    BPlusTreeIndex, GenericComparator, GenericKey, KEY_HEADER_SIZE, KEY_ROW_ID_SLOT_WIDTH,
    KEY_SIZE_FIELD_WIDTH, MAX_KEY_SIZE, max_encoded_key_len, key_slot_width,
};
pub use index::Index;
pub use schema::{Column, Schema};
pub use tuple::{Field, Row, RowId};
