//! B+Tree indexes over fixed-capacity keys.
//!
//! Key rows are encoded into [`GenericKey<N>`], a zero-padded `N`-byte
//! buffer ordered byte by byte through [`GenericComparator<N>`]. The tree
//! itself, [`BPlusTreeIndex<N>`], keeps its nodes in memory and writes page
//! images of them into the shared buffer pool on flush:
//!
//! ```text
//! PageId(index_id, 0)      header: magic, key size, root, node count, len, fanout
//! PageId(index_id, i + 1)  node i (leaf or internal)
//! ```
//!
//! Fanout defaults to what fits a 16 KB page:
//!
//! | N   | leaf entries | internal children |
//! |-----|--------------|-------------------|
//! | 4   | 1364         | 2046              |
//! | 32  | 409          | 455               |
//! | 256 | 62           | 63                |

pub mod constants;
pub mod index;
pub mod key;
mod node;

pub use constants::{KEY_HEADER_SIZE, KEY_ROW_ID_SLOT_WIDTH, KEY_SIZE_FIELD_WIDTH, MAX_KEY_SIZE};
pub use index::BPlusTreeIndex;
pub use key::{GenericComparator, GenericKey, max_encoded_key_len, key_slot_width};
