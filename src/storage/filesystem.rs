use crate::storage::{StorageBackend, StorageError, StorageResult};
use std::path::{Path, PathBuf};

/// Filesystem-based storage backend
///
/// Output locations are directories below a configurable root path.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root_path: PathBuf,
}

impl FilesystemStorage {
    /// Create a new filesystem storage backend with the given root path
    pub fn new<P: AsRef<Path>>(root_path: P) -> StorageResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        if !root_path.exists() {
            std::fs::create_dir_all(&root_path).map_err(|e| {
                StorageError::Config(format!(
                    "Failed to create storage root directory '{}': {}",
                    root_path.display(),
                    e
                ))
            })?;
        }

        Ok(Self { root_path })
    }
}

impl StorageBackend for FilesystemStorage {
    fn base_path(&self) -> &Path {
        &self.root_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filesystem_storage_creation() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("output");
        let storage = FilesystemStorage::new(&root).expect("Failed to create storage");

        assert!(root.exists());
        assert_eq!(storage.base_path(), root.as_path());
    }

    #[test]
    fn test_ensure_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FilesystemStorage::new(temp_dir.path()).expect("Failed to create storage");

        let dir_path = storage
            .ensure_dir_str("session/results")
            .expect("Failed to ensure dir");
        assert!(dir_path.is_dir());
        assert!(dir_path.starts_with(storage.base_path()));
        assert!(dir_path.ends_with("session/results"));
    }

    #[test]
    fn test_directory_url() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FilesystemStorage::new(temp_dir.path()).expect("Failed to create storage");

        let url = storage.directory_url("app-1").expect("Failed to build URL");
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/app-1/"));
        assert!(url.to_file_path().unwrap().is_dir());
    }
}
