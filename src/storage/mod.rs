use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod filesystem;

pub use filesystem::FilesystemStorage;

/// Error type for storage operations
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Path(String),
    Config(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "IO error: {}", e),
            StorageError::Path(e) => write!(f, "Path error: {}", e),
            StorageError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend handing out output locations to hosted applications
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Get the base path for this storage backend
    fn base_path(&self) -> &Path;

    /// Create a subpath relative to the storage root
    fn subpath_str(&self, path: &str) -> PathBuf {
        self.base_path().join(path)
    }

    /// Ensure a directory exists under the storage root, creating it if necessary
    fn ensure_dir_str(&self, path: &str) -> StorageResult<PathBuf> {
        let full_path = self.subpath_str(path);
        std::fs::create_dir_all(&full_path)?;
        Ok(full_path)
    }

    /// `file://` URL of a directory under the storage root, created on demand
    fn directory_url(&self, path: &str) -> StorageResult<url::Url> {
        let dir = std::fs::canonicalize(self.ensure_dir_str(path)?)?;
        url::Url::from_directory_path(&dir)
            .map_err(|_| StorageError::Path(format!("not an absolute path: {}", dir.display())))
    }
}

/// Configuration for storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub options: std::collections::HashMap<String, serde_json::Value>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut options = std::collections::HashMap::new();
        options.insert(
            "path".to_string(),
            serde_json::Value::String("./tmp/output".to_string()),
        );

        Self {
            backend: default_backend(),
            options,
        }
    }
}

fn default_backend() -> String {
    "filesystem".to_string()
}

/// Create a storage backend from configuration
pub fn create_storage_backend(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    match config.backend.as_str() {
        "filesystem" => {
            let path = config
                .options
                .get("path")
                .and_then(|v| v.as_str())
                .unwrap_or("./tmp/output");

            let storage = FilesystemStorage::new(path)?;
            Ok(Arc::new(storage))
        }
        _ => Err(StorageError::Config(format!(
            "Unknown storage backend: {}",
            config.backend
        ))),
    }
}
