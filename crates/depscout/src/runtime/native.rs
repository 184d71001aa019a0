//! Native Runtime Implementation
//!
//! Wraps `std::fs` behind the `Runtime` trait. Blocking calls run on tokio's
//! blocking pool so directory-tree fan-out does not stall the executor.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Native filesystem Runtime implementation using `std::fs`.
///
/// # Example
///
/// ```rust,no_run
/// use depscout::runtime::{NativeRuntime, Runtime};
/// use std::path::Path;
///
/// # async fn example() -> depscout::runtime::RuntimeResult<()> {
/// let runtime = NativeRuntime::new();
/// let content = runtime.read_file(Path::new("index.js")).await?;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NativeRuntime;

impl NativeRuntime {
    /// Create a new NativeRuntime instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for NativeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn io_error(path: &Path, action: &str, e: std::io::Error) -> RuntimeError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(format!("Failed to {} {}: {}", action, path.display(), e))
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();

        task::spawn_blocking(move || std::fs::read(&path).map_err(|e| io_error(&path, "read", e)))
            .await
            .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let path = path.to_path_buf();

        task::spawn_blocking(move || {
            let metadata =
                std::fs::metadata(&path).map_err(|e| io_error(&path, "get metadata for", e))?;

            Ok(FileMetadata {
                size: metadata.len(),
                is_dir: metadata.is_dir(),
                is_file: metadata.is_file(),
            })
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let path = path.to_path_buf();

        task::spawn_blocking(move || {
            let entries = std::fs::read_dir(&path).map_err(|e| io_error(&path, "read directory", e))?;

            let mut result = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| {
                    RuntimeError::Io(format!("Failed to read directory entry: {}", e))
                })?;

                if let Some(name) = entry.file_name().to_str() {
                    result.push(name.to_string());
                }
            }

            Ok(result)
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    async fn canonicalize(&self, path: &Path) -> RuntimeResult<PathBuf> {
        let path = path.to_path_buf();

        task::spawn_blocking(move || {
            std::fs::canonicalize(&path).map_err(|e| io_error(&path, "canonicalize", e))
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("index.js");
        fs::write(&file_path, b"require('a');").unwrap();

        let runtime = NativeRuntime::new();
        let content = runtime.read_file(&file_path).await.unwrap();
        assert_eq!(content, b"require('a');");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let runtime = NativeRuntime::new();

        let err = runtime
            .read_file(&temp_dir.path().join("missing.js"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, b"test content").unwrap();

        let runtime = NativeRuntime::new();
        let metadata = runtime.metadata(&file_path).await.unwrap();

        assert!(metadata.is_file);
        assert!(!metadata.is_dir);
        assert_eq!(metadata.size, 12);
        assert!(runtime.is_dir(temp_dir.path()).await);
    }

    #[tokio::test]
    async fn test_read_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.js"), b"").unwrap();
        fs::write(temp_dir.path().join("b.js"), b"").unwrap();

        let runtime = NativeRuntime::new();
        let mut entries = runtime.read_dir(temp_dir.path()).await.unwrap();
        entries.sort();

        assert_eq!(entries, vec!["a.js", "b.js"]);
    }

    #[tokio::test]
    async fn test_canonicalize_collapses_dot_segments() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("lib")).unwrap();
        fs::write(temp_dir.path().join("a.js"), b"").unwrap();

        let runtime = NativeRuntime::new();
        let direct = runtime.canonicalize(&temp_dir.path().join("a.js")).await.unwrap();
        let dotted = runtime
            .canonicalize(&temp_dir.path().join("lib/../a.js"))
            .await
            .unwrap();
        assert_eq!(direct, dotted);
    }
}
