//! Fixed key capacity selection.

use std::sync::Arc;
use tracing::warn;
use zyron_buffer::BufferPool;
use zyron_common::{IndexConfig, OversizedKeyPolicy, Result, ZyronError};
use zyron_storage::{BPlusTreeIndex, Index, KEY_SIZE_FIELD_WIDTH, RowId, Schema};

/// Width of the length prefix charged to every column that is not a 4-byte
/// numeric.
const VARLEN_PREFIX_WIDTH: usize = 4;

/// Key capacities an index can be built with, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCapacity {
    Bytes4,
    Bytes8,
    Bytes16,
    Bytes32,
    Bytes64,
    Bytes128,
    Bytes256,
}

impl KeyCapacity {
    /// The ladder in ascending order.
    pub const ALL: [KeyCapacity; 7] = [
        KeyCapacity::Bytes4,
        KeyCapacity::Bytes8,
        KeyCapacity::Bytes16,
        KeyCapacity::Bytes32,
        KeyCapacity::Bytes64,
        KeyCapacity::Bytes128,
        KeyCapacity::Bytes256,
    ];

    pub const LARGEST: KeyCapacity = KeyCapacity::Bytes256;

    pub const fn bytes(self) -> usize {
        match self {
            KeyCapacity::Bytes4 => 4,
            KeyCapacity::Bytes8 => 8,
            KeyCapacity::Bytes16 => 16,
            KeyCapacity::Bytes32 => 32,
            KeyCapacity::Bytes64 => 64,
            KeyCapacity::Bytes128 => 128,
            KeyCapacity::Bytes256 => 256,
        }
    }

    /// Smallest capacity holding `key_size` bytes.
    pub fn smallest_fitting(key_size: usize) -> Option<KeyCapacity> {
        Self::ALL.into_iter().find(|c| c.bytes() >= key_size)
    }

    /// Capacity for a worst-case key of `key_size` bytes under `policy`.
    pub fn select(key_size: usize, policy: OversizedKeyPolicy) -> Result<KeyCapacity> {
        if let Some(capacity) = Self::smallest_fitting(key_size) {
            return Ok(capacity);
        }
        match policy {
            OversizedKeyPolicy::Reject => Err(ZyronError::CapacityOverflow {
                size: key_size,
                max: Self::LARGEST.bytes(),
            }),
            OversizedKeyPolicy::ClampToLargest => {
                warn!(
                    key_size,
                    capacity = Self::LARGEST.bytes(),
                    "worst-case key exceeds the largest key capacity, clamping"
                );
                Ok(Self::LARGEST)
            }
        }
    }

    /// Builds a B+ tree with this key capacity.
    pub fn build(
        self,
        index_id: u32,
        key_schema: Arc<Schema>,
        pool: Arc<BufferPool>,
        config: &IndexConfig,
    ) -> Result<Box<dyn Index>> {
        match self {
            KeyCapacity::Bytes4 => build::<4>(index_id, key_schema, pool, config),
            KeyCapacity::Bytes8 => build::<8>(index_id, key_schema, pool, config),
            KeyCapacity::Bytes16 => build::<16>(index_id, key_schema, pool, config),
            KeyCapacity::Bytes32 => build::<32>(index_id, key_schema, pool, config),
            KeyCapacity::Bytes64 => build::<64>(index_id, key_schema, pool, config),
            KeyCapacity::Bytes128 => build::<128>(index_id, key_schema, pool, config),
            KeyCapacity::Bytes256 => build::<256>(index_id, key_schema, pool, config),
        }
    }
}

impl std::fmt::Display for KeyCapacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.bytes())
    }
}

fn build<const N: usize>(
    index_id: u32,
    key_schema: Arc<Schema>,
    pool: Arc<BufferPool>,
    config: &IndexConfig,
) -> Result<Box<dyn Index>> {
    Ok(Box::new(BPlusTreeIndex::<N>::new(
        index_id, key_schema, pool, config,
    )?))
}

/// Upper bound on the encoded size of any key under `key_schema`:
/// row id slot, field count, null bitmap, then 4 bytes per INT32/FLOAT32
/// column and `4 + length` bytes per other column.
pub fn worst_case_key_size(key_schema: &Schema) -> usize {
    let n = key_schema.column_count();
    let columns: usize = key_schema
        .columns()
        .iter()
        .map(|column| {
            if column.type_id().is_four_byte_numeric() {
                4
            } else {
                VARLEN_PREFIX_WIDTH + column.length() as usize
            }
        })
        .sum();
    RowId::SIZE + KEY_SIZE_FIELD_WIDTH + n.div_ceil(8) + columns
}
