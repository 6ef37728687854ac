//! Type identifiers for ZyronDB column types.

use serde::{Deserialize, Serialize};

/// Identifier for the column types a table schema can declare.
///
/// Type IDs are stored in catalog metadata to identify the type of each
/// column and drive the width rules used when sizing index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeId {
    // Boolean
    Boolean = 1,

    // Integer types
    Int32 = 12,
    Int64 = 13,

    // Floating point types
    Float32 = 30,
    Float64 = 31,

    // String types
    Char = 50,
    Varchar = 51,
}

impl TypeId {
    /// Returns the fixed byte size for this type, or None for length-declared types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            TypeId::Boolean => Some(1),
            TypeId::Int32 | TypeId::Float32 => Some(4),
            TypeId::Int64 | TypeId::Float64 => Some(8),
            TypeId::Char | TypeId::Varchar => None,
        }
    }

    /// Returns true if this type has a fixed byte size.
    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Returns true for the 4-byte numerics that are stored in keys without a
    /// length prefix.
    pub fn is_four_byte_numeric(&self) -> bool {
        matches!(self, TypeId::Int32 | TypeId::Float32)
    }

    /// Returns true if this type is a numeric type.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeId::Int32 | TypeId::Int64 | TypeId::Float32 | TypeId::Float64
        )
    }

    /// Returns true if this type is a string type.
    pub fn is_string(&self) -> bool {
        matches!(self, TypeId::Char | TypeId::Varchar)
    }
}

impl TryFrom<u8> for TypeId {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            1 => Ok(TypeId::Boolean),
            12 => Ok(TypeId::Int32),
            13 => Ok(TypeId::Int64),
            30 => Ok(TypeId::Float32),
            31 => Ok(TypeId::Float64),
            50 => Ok(TypeId::Char),
            51 => Ok(TypeId::Varchar),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeId::Boolean => "BOOLEAN",
            TypeId::Int32 => "INT32",
            TypeId::Int64 => "INT64",
            TypeId::Float32 => "FLOAT32",
            TypeId::Float64 => "FLOAT64",
            TypeId::Char => "CHAR",
            TypeId::Varchar => "VARCHAR",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [TypeId; 7] = [
        TypeId::Boolean,
        TypeId::Int32,
        TypeId::Int64,
        TypeId::Float32,
        TypeId::Float64,
        TypeId::Char,
        TypeId::Varchar,
    ];

    #[test]
    fn test_fixed_size() {
        assert_eq!(TypeId::Boolean.fixed_size(), Some(1));
        assert_eq!(TypeId::Int32.fixed_size(), Some(4));
        assert_eq!(TypeId::Float32.fixed_size(), Some(4));
        assert_eq!(TypeId::Int64.fixed_size(), Some(8));
        assert_eq!(TypeId::Float64.fixed_size(), Some(8));
        assert_eq!(TypeId::Char.fixed_size(), None);
        assert_eq!(TypeId::Varchar.fixed_size(), None);
    }

    #[test]
    fn test_four_byte_numeric() {
        assert!(TypeId::Int32.is_four_byte_numeric());
        assert!(TypeId::Float32.is_four_byte_numeric());

        // Other fixed types still carry a length prefix in keys
        assert!(!TypeId::Int64.is_four_byte_numeric());
        assert!(!TypeId::Float64.is_four_byte_numeric());
        assert!(!TypeId::Boolean.is_four_byte_numeric());
        assert!(!TypeId::Varchar.is_four_byte_numeric());
    }

    #[test]
    fn test_categories() {
        assert!(TypeId::Int64.is_numeric());
        assert!(!TypeId::Boolean.is_numeric());
        assert!(TypeId::Char.is_string());
        assert!(!TypeId::Int32.is_string());
        assert!(TypeId::Int32.is_fixed_size());
        assert!(!TypeId::Varchar.is_fixed_size());
    }

    #[test]
    fn test_repr_roundtrip() {
        for type_id in ALL_TYPES {
            assert_eq!(TypeId::try_from(type_id as u8), Ok(type_id));
        }
        assert_eq!(TypeId::try_from(0), Err(0));
        assert_eq!(TypeId::try_from(200), Err(200));
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeId::Int32.to_string(), "INT32");
        assert_eq!(TypeId::Float32.to_string(), "FLOAT32");
        assert_eq!(TypeId::Varchar.to_string(), "VARCHAR");
        for type_id in ALL_TYPES {
            assert!(!type_id.to_string().is_empty());
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let original = TypeId::Varchar;
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: TypeId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }
}
