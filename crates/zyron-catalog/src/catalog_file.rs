//! The catalog file: every index record of the database, packed back to back.

use crate::heap::{HeapHandle, MemHeap};
use crate::metadata::{IndexMetadata, read_index_records, write_index_records};
use std::fs;
use std::io::ErrorKind;
use tracing::debug;
use zyron_common::{Result, StorageConfig};

/// Writes `records` to the catalog file, replacing its previous contents.
///
/// The records go to a temporary file next to the catalog first, which is
/// then renamed over it. Creates `data_dir` if needed.
pub fn save_catalog(config: &StorageConfig, records: &[&IndexMetadata]) -> Result<()> {
    config.validate()?;
    fs::create_dir_all(&config.data_dir)?;

    let path = config.catalog_path();
    let tmp = path.with_extension("tmp");
    let bytes = write_index_records(records);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, &path)?;

    debug!(
        path = %path.display(),
        records = records.len(),
        bytes = bytes.len(),
        "saved catalog"
    );
    Ok(())
}

/// Reads every record of the catalog file into `heap`.
///
/// A missing catalog file is an empty catalog. Fails with `CorruptCatalog`
/// on the first record that does not decode.
pub fn load_catalog(
    config: &StorageConfig,
    heap: &mut MemHeap,
) -> Result<Vec<HeapHandle<IndexMetadata>>> {
    config.validate()?;
    let path = config.catalog_path();
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no catalog file, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let handles = read_index_records(&bytes, heap)?;
    debug!(
        path = %path.display(),
        records = handles.len(),
        "loaded catalog"
    );
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use zyron_common::ZyronError;

    fn config_in(dir: PathBuf) -> StorageConfig {
        StorageConfig {
            data_dir: dir,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path().join("db"));
        let a = IndexMetadata::new(1, "pk_users", 1, vec![0]);
        let b = IndexMetadata::new(2, "idx_users_name", 1, vec![1, 0]);

        save_catalog(&config, &[&a, &b]).unwrap();
        assert!(config.catalog_path().exists());
        assert!(!config.catalog_path().with_extension("tmp").exists());

        let mut heap = MemHeap::new();
        let handles = load_catalog(&config, &mut heap).unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(heap[handles[0]], a);
        assert_eq!(heap[handles[1]], b);
    }

    #[test]
    fn test_save_replaces_previous_catalog() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path().to_path_buf());
        let a = IndexMetadata::new(1, "pk_users", 1, vec![0]);
        let b = IndexMetadata::new(2, "idx_users_name", 1, vec![1]);

        save_catalog(&config, &[&a, &b]).unwrap();
        save_catalog(&config, &[&b]).unwrap();

        let mut heap = MemHeap::new();
        let handles = load_catalog(&config, &mut heap).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(heap[handles[0]], b);
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path().join("never-created"));
        let mut heap = MemHeap::new();
        assert!(load_catalog(&config, &mut heap).unwrap().is_empty());
        assert!(heap.is_empty());
    }

    #[test]
    fn test_corrupt_catalog_file() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path().to_path_buf());
        fs::write(config.catalog_path(), [1u8, 2, 3, 4, 5]).unwrap();

        let mut heap = MemHeap::new();
        assert!(matches!(
            load_catalog(&config, &mut heap),
            Err(ZyronError::CorruptCatalog { .. })
        ));
    }

    #[test]
    fn test_io_errors_surface() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        // data_dir below a regular file cannot be created
        let config = config_in(blocker.join("db"));
        let a = IndexMetadata::new(1, "pk_users", 1, vec![0]);
        assert!(matches!(
            save_catalog(&config, &[&a]),
            Err(ZyronError::Io(_))
        ));
    }

    #[test]
    fn test_page_size_checked() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            page_size: 512,
            ..config_in(dir.path().to_path_buf())
        };
        let mut heap = MemHeap::new();
        assert!(matches!(
            load_catalog(&config, &mut heap),
            Err(ZyronError::ConfigError(_))
        ));
    }
}
