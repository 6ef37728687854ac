//! B+Tree key layout and node page constants.

use crate::tuple::RowId;
use zyron_common::page::PAGE_SIZE;

/// Width of the field count stored in every key.
pub const KEY_SIZE_FIELD_WIDTH: usize = 8;

/// Width of the row id slot reserved at the start of every key.
pub const KEY_ROW_ID_SLOT_WIDTH: usize = RowId::SIZE;

/// Bytes every key spends before its first field.
pub const KEY_HEADER_SIZE: usize = KEY_ROW_ID_SLOT_WIDTH + KEY_SIZE_FIELD_WIDTH;

/// Largest fixed key capacity.
pub const MAX_KEY_SIZE: usize = 256;

/// Width of a length prefix in front of variable-width key fields.
pub(crate) const KEY_LENGTH_PREFIX_WIDTH: usize = 4;

/// Magic number at the start of an index header page ("BPTI").
pub(crate) const META_MAGIC: u32 = 0x4250_5449;

/// Index header page: magic, key size, reserved, root, node count, len,
/// leaf fanout, internal fanout.
pub(crate) const META_HEADER_SIZE: usize = 4 + 2 + 2 + 4 + 4 + 8 + 4 + 4;

/// Node page header: type, reserved, count, next leaf, key size, reserved.
pub(crate) const NODE_HEADER_SIZE: usize = 16;

pub(crate) const NODE_TYPE_LEAF: u8 = 1;
pub(crate) const NODE_TYPE_INTERNAL: u8 = 2;

/// Stored in the next-leaf slot of the last leaf.
pub(crate) const NO_NEXT_LEAF: u32 = u32::MAX;

/// Child pointer width in internal pages.
pub(crate) const CHILD_SIZE: usize = 4;

/// Maximum entries of a leaf page holding `key_size`-byte keys.
/// (16384 - 16) / (key_size + 8)
pub const fn leaf_capacity(key_size: usize) -> usize {
    (PAGE_SIZE - NODE_HEADER_SIZE) / (key_size + RowId::SIZE)
}

/// Maximum children of an internal page holding `key_size`-byte keys.
/// One more child than keys: (16384 - 16 - 4) / (key_size + 4) + 1
pub const fn internal_capacity(key_size: usize) -> usize {
    (PAGE_SIZE - NODE_HEADER_SIZE - CHILD_SIZE) / (key_size + CHILD_SIZE) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_capacities_fit_page() {
        for key_size in [4, 8, 16, 32, 64, 128, 256] {
            let leaf = leaf_capacity(key_size);
            assert!(NODE_HEADER_SIZE + leaf * (key_size + RowId::SIZE) <= PAGE_SIZE);

            let children = internal_capacity(key_size);
            let used = NODE_HEADER_SIZE + children * CHILD_SIZE + (children - 1) * key_size;
            assert!(used <= PAGE_SIZE);
        }
    }

    #[test]
    fn test_capacity_values() {
        // (16384 - 16) / 12
        assert_eq!(leaf_capacity(4), 1364);
        // (16384 - 16) / 264
        assert_eq!(leaf_capacity(256), 62);
        // (16384 - 20) / 260 + 1
        assert_eq!(internal_capacity(256), 63);
    }
}
