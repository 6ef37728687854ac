//! Column definitions and table/key schemas.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zyron_common::{Result, TypeId, ZyronError};

/// Definition of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    type_id: TypeId,
    /// Declared maximum length for strings, fixed width otherwise.
    length: u32,
    /// Position of the column in its table.
    table_index: u32,
    nullable: bool,
    unique: bool,
}

impl Column {
    /// Creates a fixed-width column. The length is the type's fixed size.
    ///
    /// String types should use [`Column::with_length`] instead; called with
    /// one they get a length of zero.
    pub fn new(name: impl Into<String>, type_id: TypeId, table_index: u32) -> Self {
        let length = type_id.fixed_size().unwrap_or(0) as u32;
        Self::with_length(name, type_id, length, table_index)
    }

    /// Creates a column with an explicit declared length (CHAR(n), VARCHAR(n)).
    pub fn with_length(
        name: impl Into<String>,
        type_id: TypeId,
        length: u32,
        table_index: u32,
    ) -> Self {
        Self {
            name: name.into(),
            type_id,
            length,
            table_index,
            nullable: true,
            unique: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the declared length in bytes.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn table_index(&self) -> u32 {
        self.table_index
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// An ordered set of shared column definitions.
///
/// Columns are held behind `Arc` so a key schema projected from a table
/// schema refers to the very same definitions rather than copies.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<Arc<Column>>,
}

impl Schema {
    /// Creates a schema owning fresh column definitions.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns: columns.into_iter().map(Arc::new).collect(),
        }
    }

    /// Creates a schema from existing shared definitions.
    pub fn from_shared(columns: Vec<Arc<Column>>) -> Self {
        Self { columns }
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column at `idx`.
    pub fn column(&self, idx: usize) -> Option<&Arc<Column>> {
        self.columns.get(idx)
    }

    /// Returns all columns in order.
    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    /// Returns the position of the column called `name`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| ZyronError::ColumnNotFound(name.to_string()))
    }

    /// Returns the schema made of the columns at `positions`, in that order.
    ///
    /// The projection is shallow: every column is the same `Arc` as in `self`.
    /// Fails with `InvalidKeyMap` on the first position outside the schema.
    pub fn project(&self, positions: &[u32]) -> Result<Schema> {
        let columns = positions
            .iter()
            .enumerate()
            .map(|(position, &column)| {
                self.columns
                    .get(column as usize)
                    .cloned()
                    .ok_or(ZyronError::InvalidKeyMap {
                        position,
                        column,
                        column_count: self.columns.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema { columns })
    }
}
