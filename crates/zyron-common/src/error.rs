//! Error types for ZyronDB.

use thiserror::Error;

/// Result type alias using ZyronError.
pub type Result<T> = std::result::Result<T, ZyronError>;

/// Errors that can occur in ZyronDB operations.
#[derive(Debug, Error)]
pub enum ZyronError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Buffer pool errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: u64 },

    #[error("Buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    // B+ tree errors
    #[error("Duplicate key")]
    DuplicateKey,

    #[error("Key too large: {size} bytes (max {max})")]
    KeyTooLarge { size: usize, max: usize },

    #[error("B+ tree corrupted: {0}")]
    BTreeCorrupted(String),

    // Catalog errors
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Catalog corrupted: {reason}")]
    CorruptCatalog { reason: String },

    #[error(
        "Invalid key map: entry {position} references column {column}, table has {column_count} columns"
    )]
    InvalidKeyMap {
        position: usize,
        column: u32,
        column_count: usize,
    },

    #[error("Key capacity overflow: worst-case key is {size} bytes (largest variant {max})")]
    CapacityOverflow { size: usize, max: usize },

    // Type errors
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Null value not allowed")]
    NullNotAllowed,

    #[error("Value too long for column {column}: {len} bytes (max {max})")]
    ValueTooLong {
        column: String,
        len: usize,
        max: usize,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let zyron_err: ZyronError = io_err.into();
        assert!(matches!(zyron_err, ZyronError::Io(_)));
        assert!(zyron_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_buffer_pool_errors_display() {
        let err = ZyronError::PageNotFound { page_id: 42 };
        assert_eq!(err.to_string(), "Page not found: 42");

        let err = ZyronError::BufferPoolFull;
        assert_eq!(err.to_string(), "Buffer pool full, unable to allocate frame");
    }

    #[test]
    fn test_btree_errors_display() {
        let err = ZyronError::KeyTooLarge { size: 300, max: 256 };
        assert_eq!(err.to_string(), "Key too large: 300 bytes (max 256)");

        let err = ZyronError::DuplicateKey;
        assert_eq!(err.to_string(), "Duplicate key");

        let err = ZyronError::BTreeCorrupted("dangling child".to_string());
        assert_eq!(err.to_string(), "B+ tree corrupted: dangling child");
    }

    #[test]
    fn test_catalog_errors_display() {
        let err = ZyronError::ColumnNotFound("email".to_string());
        assert_eq!(err.to_string(), "Column not found: email");

        let err = ZyronError::CorruptCatalog {
            reason: "bad magic".to_string(),
        };
        assert_eq!(err.to_string(), "Catalog corrupted: bad magic");

        let err = ZyronError::InvalidKeyMap {
            position: 1,
            column: 7,
            column_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid key map: entry 1 references column 7, table has 3 columns"
        );

        let err = ZyronError::CapacityOverflow { size: 300, max: 256 };
        assert_eq!(
            err.to_string(),
            "Key capacity overflow: worst-case key is 300 bytes (largest variant 256)"
        );
    }

    #[test]
    fn test_type_errors_display() {
        let err = ZyronError::TypeMismatch {
            expected: "INT32".to_string(),
            actual: "VARCHAR".to_string(),
        };
        assert_eq!(err.to_string(), "Type mismatch: expected INT32, got VARCHAR");

        let err = ZyronError::NullNotAllowed;
        assert_eq!(err.to_string(), "Null value not allowed");

        let err = ZyronError::ValueTooLong {
            column: "name".to_string(),
            len: 60,
            max: 50,
        };
        assert_eq!(
            err.to_string(),
            "Value too long for column name: 60 bytes (max 50)"
        );
    }

    #[test]
    fn test_config_and_internal_display() {
        let err = ZyronError::ConfigError("leaf_max_size too small".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: leaf_max_size too small"
        );

        let err = ZyronError::Internal("assertion failed".to_string());
        assert_eq!(err.to_string(), "Internal error: assertion failed");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ZyronError>();
    }
}
