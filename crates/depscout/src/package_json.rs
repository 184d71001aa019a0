//! package.json parsing.
//!
//! Only the fields the engine consumes are modeled: the entry point, the
//! three dependency declarations and `scripts`. Everything else in the file
//! is ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ENTRY_FALLBACKS, MAX_FILE_SIZE};
use crate::error::{AnalyzeError, Result};
use crate::resolver::extensions::resolve_file;
use crate::runtime::Runtime;

/// File name of the package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// `bundleDependencies` is either a list of names or `true` for "all of them".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BundleDependencies {
    All(bool),
    List(Vec<String>),
}

impl Default for BundleDependencies {
    fn default() -> Self {
        BundleDependencies::List(Vec::new())
    }
}

/// Parsed package.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Declared entry point, relative to the package directory
    pub main: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "bundleDependencies", alias = "bundledDependencies")]
    pub bundle_dependencies: BundleDependencies,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    /// File this manifest was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

impl PackageManifest {
    /// Parse manifest text. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut manifest: PackageManifest =
            serde_json::from_str(content).map_err(|e| AnalyzeError::ManifestParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        manifest.path = path.to_path_buf();
        Ok(manifest)
    }

    /// Load a manifest through the runtime.
    ///
    /// Files larger than [`MAX_FILE_SIZE`] and non-UTF-8 content are rejected
    /// as `ManifestParse`; a missing file surfaces as a runtime error.
    pub async fn from_path(runtime: &dyn Runtime, path: &Path) -> Result<Self> {
        let metadata = runtime.metadata(path).await?;
        if metadata.size > MAX_FILE_SIZE {
            return Err(AnalyzeError::ManifestParse {
                path: path.to_path_buf(),
                reason: format!(
                    "file exceeds maximum size of {}MB",
                    MAX_FILE_SIZE / 1024 / 1024
                ),
            });
        }

        let bytes = runtime.read_file(path).await?;
        let content = String::from_utf8(bytes).map_err(|e| AnalyzeError::ManifestParse {
            path: path.to_path_buf(),
            reason: format!("invalid UTF-8: {e}"),
        })?;

        Self::parse(&content, path)
    }

    /// Load `<dir>/package.json` if present.
    pub async fn find_in_dir(runtime: &dyn Runtime, dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !runtime.exists(&path) {
            return Ok(None);
        }
        Self::from_path(runtime, &path).await.map(Some)
    }

    /// Names listed in `bundleDependencies`; `true` bundles every dependency.
    pub fn bundled(&self) -> Vec<&str> {
        match &self.bundle_dependencies {
            BundleDependencies::All(true) => {
                self.dependencies.keys().map(String::as_str).collect()
            }
            BundleDependencies::All(false) => Vec::new(),
            BundleDependencies::List(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Resolve the package's entry module inside `dir`.
    ///
    /// A declared `main` is resolved like a relative specifier. Without one
    /// (or when it does not exist) the conventional entry files are probed in
    /// order and the first existing one wins.
    pub async fn resolve_entry(
        &self,
        runtime: &dyn Runtime,
        dir: &Path,
        extensions: &[String],
    ) -> Option<PathBuf> {
        if let Some(main) = self.main.as_deref().filter(|m| !m.trim().is_empty()) {
            let candidate = path_clean::clean(dir.join(main));
            if let Some(entry) = resolve_file(&candidate, extensions, runtime).await {
                return Some(entry);
            }
        }

        fallback_entry(runtime, dir).await
    }

    /// Command tokens of the configured scripts, in script order.
    ///
    /// Scripts missing from the manifest are skipped.
    pub fn script_tokens<'a>(&'a self, scripts: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        scripts
            .iter()
            .filter_map(|name| self.scripts.get(name))
            .flat_map(|command| command.split_whitespace())
    }
}

/// First existing entry from [`ENTRY_FALLBACKS`] in `dir`.
pub async fn fallback_entry(runtime: &dyn Runtime, dir: &Path) -> Option<PathBuf> {
    for name in ENTRY_FALLBACKS {
        let candidate = dir.join(name);
        if runtime.is_file(&candidate).await {
            return Some(candidate);
        }
    }
    None
}
