//! Filesystem abstraction for the analysis engine.
//!
//! Everything the resolver, walker and installed-tree reader know about the
//! disk goes through the `Runtime` trait. The engine ships `NativeRuntime`
//! for real filesystems; tests can substitute their own implementation.

pub mod native;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use native::NativeRuntime;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::FileNotFound(_))
    }
}

/// File metadata
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Whether this is a file
    pub is_file: bool,
}

/// Platform runtime trait
///
/// Read-only view of a filesystem. Nothing in the engine writes through it,
/// which keeps resolution and tree reading free of side effects.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file from the filesystem
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Get file metadata
    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Read a directory (entry names only)
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// Canonical form of an existing path, used as the walker's visited key
    async fn canonicalize(&self, path: &Path) -> RuntimeResult<PathBuf>;

    /// Whether `path` is an existing regular file
    async fn is_file(&self, path: &Path) -> bool {
        match self.metadata(path).await {
            Ok(metadata) => metadata.is_file,
            Err(_) => false,
        }
    }

    /// Whether `path` is an existing directory
    async fn is_dir(&self, path: &Path) -> bool {
        match self.metadata(path).await {
            Ok(metadata) => metadata.is_dir,
            Err(_) => false,
        }
    }
}
