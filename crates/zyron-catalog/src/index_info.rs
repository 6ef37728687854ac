//! Runtime index handles.

use crate::capacity::{KeyCapacity, worst_case_key_size};
use crate::heap::{HeapHandle, MemHeap};
use crate::metadata::IndexMetadata;
use crate::table::TableInfo;
use std::sync::Arc;
use tracing::debug;
use zyron_buffer::BufferPool;
use zyron_common::{IndexConfig, Result};
use zyron_storage::{Index, Row, Schema};

/// A built index together with the metadata it was built from.
///
/// The metadata and table are borrowed from the catalog that owns them. The
/// key schema and the index object live in a heap private to this handle and
/// are released together when it is dropped.
pub struct IndexInfo<'a> {
    metadata: &'a IndexMetadata,
    table_info: &'a TableInfo,
    heap: MemHeap,
    key_schema: HeapHandle<Arc<Schema>>,
    index: HeapHandle<Box<dyn Index>>,
    capacity: KeyCapacity,
    key_size: usize,
}

impl<'a> IndexInfo<'a> {
    /// Builds the index described by `metadata` over `table_info` with the
    /// default index configuration.
    pub fn init(
        metadata: &'a IndexMetadata,
        table_info: &'a TableInfo,
        pool: Arc<BufferPool>,
    ) -> Result<Self> {
        Self::init_with_config(metadata, table_info, pool, &IndexConfig::default())
    }

    /// Builds the index described by `metadata` over `table_info`.
    ///
    /// The key schema is the table schema projected onto the key map. Its
    /// worst-case key size picks the smallest key capacity that can hold it.
    /// Keys larger than every capacity are handled per
    /// `config.oversized_keys`.
    pub fn init_with_config(
        metadata: &'a IndexMetadata,
        table_info: &'a TableInfo,
        pool: Arc<BufferPool>,
        config: &IndexConfig,
    ) -> Result<Self> {
        config.validate()?;

        let key_schema = Arc::new(table_info.schema().project(metadata.key_map())?);
        let key_size = worst_case_key_size(&key_schema);
        let capacity = KeyCapacity::select(key_size, config.oversized_keys)?;
        let index = capacity.build(metadata.index_id(), Arc::clone(&key_schema), pool, config)?;

        debug!(
            index_id = metadata.index_id(),
            index_name = metadata.index_name(),
            table = table_info.table_name(),
            key_size,
            capacity = capacity.bytes(),
            "built index"
        );

        let mut heap = MemHeap::new();
        let key_schema = heap.alloc(key_schema);
        let index = heap.alloc(index);

        Ok(Self {
            metadata,
            table_info,
            heap,
            key_schema,
            index,
            capacity,
            key_size,
        })
    }

    /// Returns the index built for the metadata.
    pub fn index(&self) -> &dyn Index {
        self.heap[self.index].as_ref()
    }

    /// Returns the name of the index.
    pub fn index_name(&self) -> &str {
        self.metadata.index_name()
    }

    /// Returns the key schema, shared with the index.
    pub fn key_schema(&self) -> &Arc<Schema> {
        &self.heap[self.key_schema]
    }

    /// Returns the heap holding the key schema and the index.
    pub fn heap(&self) -> &MemHeap {
        &self.heap
    }

    /// Returns the metadata the index was built from.
    pub fn metadata(&self) -> &IndexMetadata {
        self.metadata
    }

    /// Returns the indexed table.
    pub fn table_info(&self) -> &TableInfo {
        self.table_info
    }

    /// Key capacity the index was built with.
    pub fn key_capacity(&self) -> KeyCapacity {
        self.capacity
    }

    /// Worst-case key size computed for the key schema.
    pub fn worst_case_key_size(&self) -> usize {
        self.key_size
    }

    /// Builds the key row of `row`, a row of the indexed table.
    ///
    /// Fails with `ColumnNotFound` if the row is too short for the key map.
    pub fn key_from_row(&self, row: &Row) -> Result<Row> {
        row.project(self.metadata.key_map())
    }

    /// Indexes a table row under the row id it carries.
    pub fn insert_row(&self, row: &Row) -> Result<()> {
        self.index().insert_entry(&self.key_from_row(row)?, row.row_id())
    }
}

impl std::fmt::Debug for IndexInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexInfo")
            .field("index_id", &self.metadata.index_id())
            .field("index_name", &self.metadata.index_name())
            .field("table", &self.table_info.table_name())
            .field("key_size", &self.key_size)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zyron_buffer::BufferPoolConfig;
    use zyron_common::{OversizedKeyPolicy, TypeId, ZyronError};
    use zyron_storage::{Column, Field, RowId};

    fn test_pool() -> Arc<BufferPool> {
        Arc::new(BufferPool::new(BufferPoolConfig { num_frames: 16 }))
    }

    fn abc_table() -> TableInfo {
        TableInfo::new(
            1,
            "abc",
            Schema::new(vec![
                Column::new("a", TypeId::Int32, 0),
                Column::with_length("b", TypeId::Varchar, 20, 1),
                Column::new("c", TypeId::Float32, 2),
            ]),
        )
    }

    fn users_table() -> TableInfo {
        TableInfo::new(
            2,
            "users",
            Schema::new(vec![
                Column::new("id", TypeId::Int32, 0),
                Column::with_length("name", TypeId::Varchar, 50, 1),
            ]),
        )
    }

    #[test]
    fn test_key_schema_projection() {
        let table = abc_table();
        let metadata = IndexMetadata::new(10, "idx_c_a", 1, vec![2, 0]);
        let info = IndexInfo::init(&metadata, &table, test_pool()).unwrap();

        let key_schema = info.key_schema();
        assert_eq!(key_schema.column_count(), 2);
        assert_eq!(key_schema.column(0).unwrap().name(), "c");
        assert_eq!(key_schema.column(1).unwrap().name(), "a");
        assert!(Arc::ptr_eq(
            key_schema.column(0).unwrap(),
            table.schema().column(2).unwrap()
        ));
        assert!(Arc::ptr_eq(
            key_schema.column(1).unwrap(),
            table.schema().column(0).unwrap()
        ));
        assert!(Arc::ptr_eq(key_schema, info.index().key_schema()));
    }

    #[test]
    fn test_end_to_end_varchar_key() {
        let table = users_table();
        let metadata = IndexMetadata::new(20, "idx_users_name", 2, vec![1]);
        let info = IndexInfo::init(&metadata, &table, test_pool()).unwrap();

        // 8 + 8 + 1 + (4 + 50)
        assert_eq!(info.worst_case_key_size(), 71);
        assert_eq!(info.key_capacity(), KeyCapacity::Bytes128);
        assert_eq!(info.index().key_capacity(), 128);
        assert_eq!(info.index().index_id(), 20);
        assert_eq!(info.index_name(), "idx_users_name");
        assert_eq!(info.table_info().table_id(), 2);
    }

    #[test]
    fn test_single_int_key() {
        let table = users_table();
        let metadata = IndexMetadata::new(21, "pk_users", 2, vec![0]);
        let info = IndexInfo::init(&metadata, &table, test_pool()).unwrap();

        // 8 + 8 + 1 + 4
        assert_eq!(info.worst_case_key_size(), 21);
        assert_eq!(info.key_capacity(), KeyCapacity::Bytes32);
    }

    #[test]
    fn test_empty_key_map() {
        let table = users_table();
        let metadata = IndexMetadata::new(22, "idx_empty", 2, vec![]);
        let info = IndexInfo::init(&metadata, &table, test_pool()).unwrap();

        assert_eq!(info.worst_case_key_size(), 16);
        assert_eq!(info.key_capacity(), KeyCapacity::Bytes16);
        assert_eq!(info.key_schema().column_count(), 0);
    }

    #[test]
    fn test_invalid_key_map() {
        let table = abc_table();
        let metadata = IndexMetadata::new(11, "idx_bad", 1, vec![0, 3]);
        let result = IndexInfo::init(&metadata, &table, test_pool());
        assert!(matches!(
            result,
            Err(ZyronError::InvalidKeyMap {
                position: 1,
                column: 3,
                column_count: 3
            })
        ));
    }

    #[test]
    fn test_oversized_key_policies() {
        let table = TableInfo::new(
            3,
            "docs",
            Schema::new(vec![Column::with_length("body", TypeId::Varchar, 300, 0)]),
        );
        let metadata = IndexMetadata::new(30, "idx_body", 3, vec![0]);

        let result = IndexInfo::init(&metadata, &table, test_pool());
        assert!(matches!(
            result,
            Err(ZyronError::CapacityOverflow { size: 321, max: 256 })
        ));

        let config = IndexConfig {
            oversized_keys: OversizedKeyPolicy::ClampToLargest,
            ..Default::default()
        };
        let info = IndexInfo::init_with_config(&metadata, &table, test_pool(), &config).unwrap();
        assert_eq!(info.key_capacity(), KeyCapacity::Bytes256);

        // Short values still fit, long ones are rejected per key
        let short = Row::with_row_id(RowId::new(0, 0), vec![Field::Char("hello".to_string())]);
        info.insert_row(&short).unwrap();
        let long = Row::with_row_id(RowId::new(0, 1), vec![Field::Char("x".repeat(300))]);
        assert!(matches!(
            info.insert_row(&long),
            Err(ZyronError::KeyTooLarge { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let table = users_table();
        let metadata = IndexMetadata::new(23, "pk_users", 2, vec![0]);
        let config = IndexConfig {
            leaf_max_size: Some(1),
            ..Default::default()
        };
        let result = IndexInfo::init_with_config(&metadata, &table, test_pool(), &config);
        assert!(matches!(result, Err(ZyronError::ConfigError(_))));
    }

    #[test]
    fn test_insert_and_lookup_through_handle() {
        let table = users_table();
        let metadata = IndexMetadata::new(24, "idx_users_name", 2, vec![1]);
        let info = IndexInfo::init(&metadata, &table, test_pool()).unwrap();

        for (i, name) in ["zoe", "adam", "mia"].iter().enumerate() {
            let row = Row::with_row_id(
                RowId::new(1, i as u32),
                vec![Field::Int32(i as i32), Field::Char(name.to_string())],
            );
            info.insert_row(&row).unwrap();
        }

        let lookup = Row::new(vec![Field::Char("mia".to_string())]);
        assert_eq!(info.index().scan_key(&lookup).unwrap(), Some(RowId::new(1, 2)));
        assert_eq!(info.index().len(), 3);
    }

    #[test]
    fn test_short_row_rejected() {
        let table = users_table();
        let metadata = IndexMetadata::new(25, "idx_users_name", 2, vec![1]);
        let info = IndexInfo::init(&metadata, &table, test_pool()).unwrap();

        let short = Row::with_row_id(RowId::new(0, 0), vec![Field::Int32(1)]);
        assert!(matches!(
            info.key_from_row(&short),
            Err(ZyronError::ColumnNotFound(_))
        ));
        assert!(matches!(
            info.insert_row(&short),
            Err(ZyronError::ColumnNotFound(_))
        ));
        assert!(info.index().is_empty());
    }

    #[test]
    fn test_drop_releases_heap() {
        let table = abc_table();
        let pool = test_pool();
        let metadata = IndexMetadata::new(12, "idx_a", 1, vec![0]);
        let column = Arc::clone(table.schema().column(0).unwrap());
        let baseline = Arc::strong_count(&column);

        let info = IndexInfo::init(&metadata, &table, Arc::clone(&pool)).unwrap();
        assert_eq!(info.heap().len(), 2);
        assert!(Arc::strong_count(&pool) > 1);
        assert_eq!(Arc::strong_count(&column), baseline + 1);

        drop(info);
        assert_eq!(Arc::strong_count(&pool), 1);
        assert_eq!(Arc::strong_count(&column), baseline);
    }
}
