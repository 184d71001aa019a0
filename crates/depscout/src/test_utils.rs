//! Test utilities for depscout.
//!
//! `TestRuntime` wraps `std::fs` without the blocking-pool hop of
//! `NativeRuntime`, and `create_test_project` lays out fixture trees
//! (sources, `package.json` files, fake `node_modules`) on disk.

use crate::runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Simple test runtime that wraps std::fs for native tests.
///
/// Real files in a temporary directory are used instead of mocks so that
/// canonicalization and ancestor searches behave as in production.
#[derive(Debug, Default)]
pub struct TestRuntime;

impl TestRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn to_runtime_error(path: &Path, e: std::io::Error) -> RuntimeError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(e.to_string())
    }
}

#[async_trait]
impl Runtime for TestRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| to_runtime_error(path, e))
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let metadata = std::fs::metadata(path).map_err(|e| to_runtime_error(path, e))?;
        Ok(FileMetadata {
            size: metadata.len(),
            is_file: metadata.is_file(),
            is_dir: metadata.is_dir(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let entries: Vec<String> = std::fs::read_dir(path)
            .map_err(|e| to_runtime_error(path, e))?
            .filter_map(|entry| {
                entry
                    .ok()
                    .and_then(|e| e.file_name().to_str().map(String::from))
            })
            .collect();
        Ok(entries)
    }

    async fn canonicalize(&self, path: &Path) -> RuntimeResult<PathBuf> {
        std::fs::canonicalize(path).map_err(|e| to_runtime_error(path, e))
    }
}

/// Create a test project with the given files under `root`.
///
/// Parent directories are created as needed. Returns `root` for chaining.
pub fn create_test_project(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    for (path, content) in files {
        let file_path = root.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("Failed to create parent directory for {path}: {e}"));
        }
        std::fs::write(&file_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file {path}: {e}"));
    }

    root.to_path_buf()
}

/// Install a fake package into `<root>/node_modules/<name>`.
///
/// Writes a `package.json` with the given version and dependencies plus an
/// `index.js` entry so the resolver can find it.
pub fn install_fake_package(root: &Path, name: &str, version: &str, dependencies: &[(&str, &str)]) {
    let deps: serde_json::Map<String, serde_json::Value> = dependencies
        .iter()
        .map(|(dep, range)| (dep.to_string(), serde_json::Value::String(range.to_string())))
        .collect();
    let manifest = serde_json::json!({
        "name": name,
        "version": version,
        "main": "index.js",
        "dependencies": deps,
    });

    let manifest_path = format!("node_modules/{name}/package.json");
    let entry_path = format!("node_modules/{name}/index.js");
    let manifest = manifest.to_string();
    create_test_project(
        root,
        &[
            (manifest_path.as_str(), manifest.as_str()),
            (entry_path.as_str(), "module.exports = {};\n"),
        ],
    );
}

/// Whether a `node` binary is available; worker tests skip without one.
pub fn node_available() -> bool {
    std::process::Command::new("node")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
