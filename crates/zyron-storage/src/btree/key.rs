//! Fixed-capacity index keys.
//!
//! A key row is encoded into a zero-padded `N`-byte buffer:
//!
//! ```text
//! +----------------------+ 0
//! | row id slot [8]      | 8, reserved zero
//! | field count: u64 LE  | 16
//! +----------------------+
//! | field 0              |
//! | field 1              |
//! | ...                  |
//! +----------------------+
//! | zero padding         |
//! +----------------------+ N - ceil(n / 8)
//! | validity bitmap      | bit i set = field i holds a value
//! +----------------------+ N
//! ```
//!
//! Field encodings:
//! - INT32 / FLOAT32: 4 bytes
//! - INT64 / FLOAT64: 8 bytes
//! - BOOLEAN: 1 byte
//! - CHAR / VARCHAR: the string bytes, then their length as u32 BE
//!
//! Numbers are written big-endian with their sign handled so that comparing
//! two keys byte by byte orders them like the values they encode. Strings
//! compare lexicographically as long as they hold no NUL bytes. Fields come
//! first so earlier key columns always outrank later ones.
//!
//! A NULL is written as an all-zero slot: 4 bytes for strings, the fixed width
//! otherwise. That is the smallest encoding of its column, and the bitmap at
//! the tail orders the NULL before a value with the same bytes.

use super::constants::{KEY_HEADER_SIZE, KEY_LENGTH_PREFIX_WIDTH, KEY_ROW_ID_SLOT_WIDTH};
use crate::schema::{Column, Schema};
use crate::tuple::{Field, Row};
use bytes::BufMut;
use std::cmp::Ordering;
use zyron_common::{Result, ZyronError};

/// Largest number of bytes a value of `column` takes in a key.
pub fn key_slot_width(column: &Column) -> usize {
    match column.type_id().fixed_size() {
        Some(size) => size,
        None => column.length() as usize + KEY_LENGTH_PREFIX_WIDTH,
    }
}

/// Largest encoded length of a key under `schema`.
pub fn max_encoded_key_len(schema: &Schema) -> usize {
    let n = schema.column_count();
    let fields: usize = schema.columns().iter().map(|c| key_slot_width(c)).sum();
    KEY_HEADER_SIZE + n.div_ceil(8) + fields
}

/// Index key with a capacity of `N` bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    /// Encodes the key row `key` under the key schema `schema`.
    pub fn serialize_from_key(key: &Row, schema: &Schema) -> Result<Self> {
        let n = schema.column_count();
        if key.field_count() != n {
            return Err(ZyronError::TypeMismatch {
                expected: format!("{} key fields", n),
                actual: format!("{} key fields", key.field_count()),
            });
        }

        let bitmap_len = n.div_ceil(8);
        let mut size = KEY_HEADER_SIZE + bitmap_len;
        for (field, column) in key.fields().iter().zip(schema.columns()) {
            size += encoded_field_len(field, column)?;
        }
        if size > N {
            return Err(ZyronError::KeyTooLarge { size, max: N });
        }

        let mut data = [0u8; N];
        {
            let (body, bitmap) = data.split_at_mut(N - bitmap_len);
            let (header, mut out) = body.split_at_mut(KEY_HEADER_SIZE);
            let mut count = &mut header[KEY_ROW_ID_SLOT_WIDTH..];
            count.put_u64_le(n as u64);

            for (i, (field, column)) in key.fields().iter().zip(schema.columns()).enumerate() {
                if field.is_null() {
                    out.put_bytes(0, null_slot_width(column));
                    continue;
                }
                bitmap[i / 8] |= 1 << (i % 8);
                encode_field(&mut out, field);
            }
        }

        Ok(Self { data })
    }

    /// Rebuilds a key from its stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data: [u8; N] = bytes.try_into().map_err(|_| {
            ZyronError::BTreeCorrupted(format!("key of {} bytes, expected {}", bytes.len(), N))
        })?;
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.data
    }

    /// Number of fields recorded in the key header.
    pub fn field_count(&self) -> u64 {
        let mut count = [0u8; 8];
        count.copy_from_slice(&self.data[KEY_ROW_ID_SLOT_WIDTH..KEY_HEADER_SIZE]);
        u64::from_le_bytes(count)
    }

    /// Returns true if field `idx` is NULL according to the validity bitmap.
    ///
    /// Panics if `idx` is not below `field_count()`.
    pub fn is_null(&self, idx: usize) -> bool {
        let count = self.field_count() as usize;
        assert!(idx < count, "field {} of a {}-field key", idx, count);
        let bitmap = N - count.div_ceil(8);
        self.data[bitmap + idx / 8] & (1 << (idx % 8)) == 0
    }
}

impl<const N: usize> std::fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GenericKey<{}>(", N)?;
        for byte in &self.data[KEY_ROW_ID_SLOT_WIDTH..] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

fn type_mismatch(column: &Column, field: &Field) -> ZyronError {
    ZyronError::TypeMismatch {
        expected: column.type_id().to_string(),
        actual: field.type_name().to_string(),
    }
}

/// Checks `field` against `column` and returns its encoded length.
fn encoded_field_len(field: &Field, column: &Column) -> Result<usize> {
    if field.is_null() {
        if !column.is_nullable() {
            return Err(ZyronError::NullNotAllowed);
        }
        return Ok(null_slot_width(column));
    }
    if !field.matches_type(column.type_id()) {
        return Err(type_mismatch(column, field));
    }
    match field {
        Field::Char(s) => {
            let max = column.length() as usize;
            if s.len() > max {
                return Err(ZyronError::ValueTooLong {
                    column: column.name().to_string(),
                    len: s.len(),
                    max,
                });
            }
            Ok(s.len() + KEY_LENGTH_PREFIX_WIDTH)
        }
        _ => Ok(column.type_id().fixed_size().unwrap_or(0)),
    }
}

/// Width of the zeroed slot a NULL takes in `column`.
fn null_slot_width(column: &Column) -> usize {
    column
        .type_id()
        .fixed_size()
        .unwrap_or(KEY_LENGTH_PREFIX_WIDTH)
}

/// Writes a field already checked by `encoded_field_len`.
fn encode_field(out: &mut &mut [u8], field: &Field) {
    match field {
        Field::Null => {}
        Field::Boolean(v) => out.put_u8(*v as u8),
        Field::Int32(v) => out.put_u32((*v as u32) ^ 0x8000_0000),
        Field::Int64(v) => out.put_u64((*v as u64) ^ 0x8000_0000_0000_0000),
        Field::Float32(v) => out.put_u32(orderable_f32(*v)),
        Field::Float64(v) => out.put_u64(orderable_f64(*v)),
        Field::Char(s) => {
            out.put_slice(s.as_bytes());
            out.put_u32(s.len() as u32);
        }
    }
}

/// Maps an f32 to a u32 with the same ordering.
fn orderable_f32(v: f32) -> u32 {
    let bits = v.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000
    }
}

fn orderable_f64(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000_0000_0000
    }
}

/// Byte-wise ordering over the full `N` bytes of two keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericComparator<const N: usize>;

impl<const N: usize> GenericComparator<N> {
    pub const fn new() -> Self {
        Self
    }

    #[inline]
    pub fn compare(&self, lhs: &GenericKey<N>, rhs: &GenericKey<N>) -> Ordering {
        lhs.data.cmp(&rhs.data)
    }
}
