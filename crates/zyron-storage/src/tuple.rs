//! Row representation: row identifiers, field values and rows.

use serde::{Deserialize, Serialize};
use zyron_common::{Result, TypeId, ZyronError};

/// Unique identifier for a row within a table heap.
///
/// Combines the heap page number with a slot number to identify where a row
/// is stored. Index leaves map keys to RowIds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId {
    /// Heap page containing this row.
    pub page_num: u32,
    /// Slot number within the page.
    pub slot_id: u32,
}

impl RowId {
    /// Serialized width of a row id in bytes.
    pub const SIZE: usize = 8;

    /// Invalid row ID.
    pub const INVALID: RowId = RowId {
        page_num: u32::MAX,
        slot_id: u32::MAX,
    };

    /// Creates a new row ID.
    pub fn new(page_num: u32, slot_id: u32) -> Self {
        Self { page_num, slot_id }
    }

    /// Returns true if this is a valid row ID.
    pub fn is_valid(&self) -> bool {
        self.page_num != u32::MAX
    }

    /// Returns the row ID as a single u64 for compact storage.
    pub fn as_u64(&self) -> u64 {
        ((self.page_num as u64) << 32) | (self.slot_id as u64)
    }

    /// Creates a row ID from its u64 representation.
    pub fn from_u64(value: u64) -> Self {
        Self {
            page_num: (value >> 32) as u32,
            slot_id: value as u32,
        }
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_num, self.slot_id)
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Value of a CHAR or VARCHAR column.
    Char(String),
}

impl Field {
    /// Returns true if this is the NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// Returns true if this value can be stored in a column of `type_id`.
    /// NULL matches every type; nullability is checked separately.
    pub fn matches_type(&self, type_id: TypeId) -> bool {
        match self {
            Field::Null => true,
            Field::Boolean(_) => type_id == TypeId::Boolean,
            Field::Int32(_) => type_id == TypeId::Int32,
            Field::Int64(_) => type_id == TypeId::Int64,
            Field::Float32(_) => type_id == TypeId::Float32,
            Field::Float64(_) => type_id == TypeId::Float64,
            Field::Char(_) => type_id.is_string(),
        }
    }

    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Field::Null => "NULL",
            Field::Boolean(_) => "BOOLEAN",
            Field::Int32(_) => "INT32",
            Field::Int64(_) => "INT64",
            Field::Float32(_) => "FLOAT32",
            Field::Float64(_) => "FLOAT64",
            Field::Char(_) => "CHAR",
        }
    }
}

/// A row of field values.
///
/// Table rows carry the RowId they were read from; key rows built for index
/// lookups use `RowId::INVALID`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    row_id: RowId,
    fields: Vec<Field>,
}

impl Row {
    /// Creates a key row (no row id).
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            row_id: RowId::INVALID,
            fields,
        }
    }

    /// Creates a table row stored at `row_id`.
    pub fn with_row_id(row_id: RowId, fields: Vec<Field>) -> Self {
        Self { row_id, fields }
    }

    /// Returns the row id, `RowId::INVALID` for key rows.
    pub fn row_id(&self) -> RowId {
        self.row_id
    }

    /// Returns the field values in column order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Builds the key row for `key_map` out of this table row.
    ///
    /// Fails with `ColumnNotFound` if a position is past the end of the row.
    pub fn project(&self, key_map: &[u32]) -> Result<Row> {
        let fields = key_map
            .iter()
            .map(|&pos| {
                self.fields.get(pos as usize).cloned().ok_or_else(|| {
                    ZyronError::ColumnNotFound(format!(
                        "position {} of a {}-field row",
                        pos,
                        self.fields.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(fields))
    }
}
