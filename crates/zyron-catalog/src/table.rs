//! Table descriptors.

use std::sync::Arc;
use zyron_storage::Schema;

/// A table known to the catalog.
#[derive(Debug, Clone)]
pub struct TableInfo {
    table_id: u32,
    table_name: String,
    schema: Arc<Schema>,
}

impl TableInfo {
    /// Creates a table descriptor owning `schema`.
    pub fn new(table_id: u32, table_name: impl Into<String>, schema: Schema) -> Self {
        Self {
            table_id,
            table_name: table_name.into(),
            schema: Arc::new(schema),
        }
    }

    /// Returns the catalog id of the table.
    pub fn table_id(&self) -> u32 {
        self.table_id
    }

    /// Returns the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
