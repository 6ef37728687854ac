//! Durable index descriptions and the catalog record format.
//!
//! One record, all integers little-endian, no padding:
//!
//! ```text
//! +----------------------+ 0
//! | magic: u32           | 344528
//! | index_id: u32        | 4
//! | name_len: u32        | 8
//! | name: [u8; name_len] | UTF-8
//! | table_id: u32        |
//! | key_count: u32       |
//! | key_map: [u32]       | key_count entries
//! +----------------------+
//! ```
//!
//! A catalog file is a sequence of records laid end to end.

use crate::heap::{HeapHandle, MemHeap};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;
use zyron_common::{Result, ZyronError};

/// Marks the start of every index metadata record.
pub const INDEX_METADATA_MAGIC: u32 = 344528;

/// Immutable description of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    index_id: u32,
    index_name: String,
    table_id: u32,
    /// Table column positions making up the key, in key order.
    key_map: Vec<u32>,
}

impl IndexMetadata {
    /// Creates a new index description.
    pub fn new(
        index_id: u32,
        index_name: impl Into<String>,
        table_id: u32,
        key_map: Vec<u32>,
    ) -> Self {
        Self {
            index_id,
            index_name: index_name.into(),
            table_id,
            key_map,
        }
    }

    /// Builds the metadata inside `heap`.
    pub fn create(
        index_id: u32,
        index_name: impl Into<String>,
        table_id: u32,
        key_map: Vec<u32>,
        heap: &mut MemHeap,
    ) -> HeapHandle<IndexMetadata> {
        heap.alloc(Self::new(index_id, index_name, table_id, key_map))
    }

    /// Returns the catalog id of the index.
    pub fn index_id(&self) -> u32 {
        self.index_id
    }

    /// Returns the index name.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Returns the id of the indexed table.
    pub fn table_id(&self) -> u32 {
        self.table_id
    }

    /// Returns the table column positions of the key, in key order.
    pub fn key_map(&self) -> &[u32] {
        &self.key_map
    }

    /// Number of columns in the key.
    pub fn index_column_count(&self) -> usize {
        self.key_map.len()
    }

    /// Exact number of bytes `serialize_to` writes.
    pub fn serialized_size(&self) -> usize {
        4 + 4 + 4 + self.index_name.len() + 4 + 4 + 4 * self.key_map.len()
    }

    /// Appends the record to `buf` and returns the number of bytes written.
    pub fn serialize_to(&self, buf: &mut impl BufMut) -> usize {
        buf.put_u32_le(INDEX_METADATA_MAGIC);
        buf.put_u32_le(self.index_id);
        buf.put_u32_le(self.index_name.len() as u32);
        buf.put_slice(self.index_name.as_bytes());
        buf.put_u32_le(self.table_id);
        buf.put_u32_le(self.key_map.len() as u32);
        for &column in &self.key_map {
            buf.put_u32_le(column);
        }
        self.serialized_size()
    }

    /// Encodes the record into a buffer of exactly `serialized_size()` bytes
    /// taken from `heap`.
    pub fn serialize_into_heap(&self, heap: &mut MemHeap) -> HeapHandle<Box<[u8]>> {
        let handle = heap.allocate(self.serialized_size());
        let mut out = &mut heap[handle][..];
        self.serialize_to(&mut out);
        handle
    }

    /// Decodes one record from the front of `buf` into `heap`.
    ///
    /// Returns the handle and the number of bytes consumed. Nothing is
    /// allocated from `heap` when the record is corrupt.
    pub fn deserialize_from(
        buf: &[u8],
        heap: &mut MemHeap,
    ) -> Result<(HeapHandle<IndexMetadata>, usize)> {
        let (metadata, consumed) = Self::decode(buf)?;
        debug!(
            index_id = metadata.index_id,
            index_name = %metadata.index_name,
            table_id = metadata.table_id,
            key_columns = metadata.key_map.len(),
            "decoded index metadata"
        );
        Ok((heap.alloc(metadata), consumed))
    }

    fn decode(buf: &[u8]) -> Result<(IndexMetadata, usize)> {
        let mut input = buf;

        let magic = read_u32(&mut input, "magic")?;
        if magic != INDEX_METADATA_MAGIC {
            return Err(corrupt(format!(
                "bad magic {}, expected {}",
                magic, INDEX_METADATA_MAGIC
            )));
        }

        let index_id = read_u32(&mut input, "index id")?;
        let name_len = read_u32(&mut input, "name length")? as usize;
        if input.remaining() < name_len {
            return Err(truncated("index name"));
        }
        let index_name = std::str::from_utf8(&input[..name_len])
            .map_err(|e| corrupt(format!("index name is not UTF-8: {}", e)))?
            .to_string();
        input.advance(name_len);

        let table_id = read_u32(&mut input, "table id")?;
        let key_count = read_u32(&mut input, "key count")? as usize;
        if input.remaining() / 4 < key_count {
            return Err(truncated("key map"));
        }
        let key_map = (0..key_count).map(|_| input.get_u32_le()).collect();

        let consumed = buf.len() - input.remaining();
        Ok((
            IndexMetadata {
                index_id,
                index_name,
                table_id,
                key_map,
            },
            consumed,
        ))
    }
}

fn corrupt(reason: String) -> ZyronError {
    ZyronError::CorruptCatalog { reason }
}

fn truncated(field: &str) -> ZyronError {
    corrupt(format!("record truncated in {}", field))
}

fn read_u32(input: &mut &[u8], field: &str) -> Result<u32> {
    if input.remaining() < 4 {
        return Err(truncated(field));
    }
    Ok(input.get_u32_le())
}

/// Packs index records back to back.
pub fn write_index_records(records: &[&IndexMetadata]) -> Bytes {
    let total = records.iter().map(|m| m.serialized_size()).sum();
    let mut buf = BytesMut::with_capacity(total);
    for metadata in records {
        metadata.serialize_to(&mut buf);
    }
    buf.freeze()
}

/// Decodes every record in `buf`, stopping at the first corrupt one.
pub fn read_index_records(
    buf: &[u8],
    heap: &mut MemHeap,
) -> Result<Vec<HeapHandle<IndexMetadata>>> {
    let mut handles = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let (handle, consumed) = IndexMetadata::deserialize_from(&buf[offset..], heap)?;
        handles.push(handle);
        offset += consumed;
    }
    Ok(handles)
}
