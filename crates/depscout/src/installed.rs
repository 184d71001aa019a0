//! Installed package tree.
//!
//! Reads one level of `node_modules` (scoped directories included) at the
//! project root. The tree is read once per analysis and shared read-only
//! afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AnalyzeError, Result};
use crate::package_json::{MANIFEST_FILE, PackageManifest};
use crate::runtime::Runtime;

const NODE_MODULES: &str = "node_modules";

/// Version of an installed package as written in its package.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InstalledVersion {
    Semver(#[serde(serialize_with = "serialize_display")] semver::Version),
    /// Not valid semver; kept verbatim
    Raw(String),
}

fn serialize_display<S: serde::Serializer>(
    version: &semver::Version,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(version)
}

impl InstalledVersion {
    pub fn parse(raw: &str) -> Self {
        match semver::Version::parse(raw.trim()) {
            Ok(version) => InstalledVersion::Semver(version),
            Err(_) => InstalledVersion::Raw(raw.to_string()),
        }
    }
}

impl fmt::Display for InstalledVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstalledVersion::Semver(version) => write!(f, "{version}"),
            InstalledVersion::Raw(raw) => f.write_str(raw),
        }
    }
}

/// One package directly under `node_modules`.
#[derive(Debug, Clone, Serialize)]
pub struct InstalledPackage {
    pub name: String,
    /// `None` when the package.json declares no version
    pub version: Option<InstalledVersion>,
    /// The package's own `dependencies`
    pub dependencies: BTreeMap<String, String>,
    /// Listed only under the root's `devDependencies`
    pub is_dev: bool,
    /// Listed only under the root's `bundleDependencies`
    pub is_bundled: bool,
    pub path: PathBuf,
}

impl InstalledPackage {
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }
}

/// Snapshot of the installed tree.
#[derive(Debug, Clone, Default)]
pub struct InstalledTree {
    root: PathBuf,
    packages: BTreeMap<String, InstalledPackage>,
}

impl InstalledTree {
    /// A tree with nothing installed.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            packages: BTreeMap::new(),
        }
    }

    pub fn from_packages(
        root: impl Into<PathBuf>,
        packages: impl IntoIterator<Item = InstalledPackage>,
    ) -> Self {
        Self {
            root: root.into(),
            packages: packages.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    /// Directory whose `node_modules` was read.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Packages excluding development-only and bundle-only ones.
    pub fn packages(&self) -> impl Iterator<Item = &InstalledPackage> {
        self.packages
            .values()
            .filter(|p| !p.is_dev && !p.is_bundled)
    }

    /// Every package, flagged ones included.
    pub fn all(&self) -> impl Iterator<Item = &InstalledPackage> {
        self.packages.values()
    }

    /// Look up a package in the default (filtered) view.
    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages
            .get(name)
            .filter(|p| !p.is_dev && !p.is_bundled)
    }

    /// Look up a package regardless of flags.
    pub fn get_any(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.get(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Reads the installed tree through a [`Runtime`].
#[derive(Debug, Clone)]
pub struct InstalledTreeReader {
    runtime: Arc<dyn Runtime>,
}

impl InstalledTreeReader {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }

    /// Nearest ancestor of `start_dir` (itself included) holding
    /// `node_modules` or `package.json`; `start_dir` when there is none.
    pub async fn find_root(&self, start_dir: &Path) -> PathBuf {
        for dir in start_dir.ancestors() {
            if self.runtime.is_dir(&dir.join(NODE_MODULES)).await
                || self.runtime.is_file(&dir.join(MANIFEST_FILE)).await
            {
                return dir.to_path_buf();
            }
        }
        start_dir.to_path_buf()
    }

    /// Read the tree rooted at the project containing `start_dir`.
    ///
    /// A missing `node_modules` is an empty tree. A `node_modules` that
    /// exists but cannot be listed, or a malformed root package.json, is
    /// [`AnalyzeError::InstalledTreeUnreadable`].
    pub async fn read_tree(&self, start_dir: &Path) -> Result<InstalledTree> {
        let root = self.find_root(start_dir).await;
        let node_modules = root.join(NODE_MODULES);

        let root_manifest = PackageManifest::find_in_dir(self.runtime.as_ref(), &root)
            .await
            .map_err(|e| AnalyzeError::InstalledTreeUnreadable {
                path: root.join(MANIFEST_FILE),
                reason: e.to_string(),
            })?;

        if !self.runtime.is_dir(&node_modules).await {
            debug!(root = %root.display(), "no node_modules directory, nothing installed");
            return Ok(InstalledTree::empty(root));
        }

        let flags = Flags::from_manifest(root_manifest.as_ref());
        let mut packages = Vec::new();

        for entry in self.list(&node_modules).await? {
            if entry.starts_with('.') {
                continue;
            }

            if entry.starts_with('@') {
                let scope_dir = node_modules.join(&entry);
                if !self.runtime.is_dir(&scope_dir).await {
                    continue;
                }
                for child in self.list(&scope_dir).await? {
                    if child.starts_with('.') {
                        continue;
                    }
                    let name = format!("{entry}/{child}");
                    if let Some(package) = self.read_package(&name, &scope_dir.join(&child), &flags).await {
                        packages.push(package);
                    }
                }
            } else if let Some(package) = self.read_package(&entry, &node_modules.join(&entry), &flags).await {
                packages.push(package);
            }
        }

        debug!(root = %root.display(), count = packages.len(), "read installed tree");
        Ok(InstalledTree::from_packages(root, packages))
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>> {
        let mut entries = self.runtime.read_dir(dir).await.map_err(|e| {
            AnalyzeError::InstalledTreeUnreadable {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        entries.sort();
        Ok(entries)
    }

    async fn read_package(&self, name: &str, dir: &Path, flags: &Flags) -> Option<InstalledPackage> {
        let manifest = match PackageManifest::find_in_dir(self.runtime.as_ref(), dir).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                debug!(dir = %dir.display(), "skipping directory without package.json");
                return None;
            }
            Err(e) => {
                warn!(package = name, error = %e, "skipping installed package with unreadable manifest");
                return None;
            }
        };

        Some(InstalledPackage {
            name: name.to_string(),
            version: manifest.version.as_deref().map(InstalledVersion::parse),
            dependencies: manifest.dependencies,
            is_dev: flags.dev.contains(name),
            is_bundled: flags.bundled.contains(name),
            path: dir.to_path_buf(),
        })
    }
}

/// Names flagged by the root manifest.
#[derive(Default)]
struct Flags {
    dev: FxHashSet<String>,
    bundled: FxHashSet<String>,
}

impl Flags {
    fn from_manifest(manifest: Option<&PackageManifest>) -> Self {
        let Some(manifest) = manifest else {
            return Self::default();
        };
        let production = |name: &str| manifest.dependencies.contains_key(name);

        Self {
            dev: manifest
                .dev_dependencies
                .keys()
                .filter(|name| !production(name.as_str()))
                .cloned()
                .collect(),
            bundled: manifest
                .bundled()
                .into_iter()
                .filter(|name| !production(name))
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestRuntime, create_test_project, install_fake_package};
    use tempfile::TempDir;

    fn reader() -> InstalledTreeReader {
        InstalledTreeReader::new(Arc::new(TestRuntime::new()))
    }

    #[tokio::test]
    async fn test_reads_one_level_with_scopes() {
        let temp = TempDir::new().unwrap();
        let root = create_test_project(
            temp.path(),
            &[
                ("package.json", r#"{"name":"app","devDependencies":{"mocha":"*"}}"#),
                ("node_modules/.bin/placeholder", ""),
                ("node_modules/stray/readme.md", ""),
            ],
        );
        install_fake_package(&root, "express", "4.17.1", &[("debug", "2.6.9")]);
        install_fake_package(&root, "@babel/core", "7.0.0-beta.1", &[]);
        install_fake_package(&root, "mocha", "1.0.0", &[]);
        install_fake_package(&root, "express/node_modules/debug", "2.6.9", &[]);

        let tree = reader().read_tree(&root).await.unwrap();

        let names: Vec<&str> = tree.packages().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["@babel/core", "express"]);
        assert!(tree.get("mocha").is_none());
        assert!(tree.get_any("mocha").unwrap().is_dev);
        assert_eq!(tree.all().count(), 3);

        let express = tree.get("express").unwrap();
        assert!(express.depends_on("debug"));
        assert_eq!(
            express.version,
            Some(InstalledVersion::Semver(semver::Version::new(4, 17, 1)))
        );
    }

    #[tokio::test]
    async fn test_missing_tree_is_empty() {
        let temp = TempDir::new().unwrap();
        let tree = reader().read_tree(temp.path()).await.unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), temp.path());
    }

    #[tokio::test]
    async fn test_root_found_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        let root = create_test_project(temp.path(), &[("src/lib/a.js", "")]);
        install_fake_package(&root, "vows", "0.5.13", &[]);

        let tree = reader().read_tree(&root.join("src/lib")).await.unwrap();
        assert_eq!(tree.root(), root.as_path());
        assert!(tree.get("vows").is_some());
    }

    #[tokio::test]
    async fn test_malformed_root_manifest_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let root = create_test_project(temp.path(), &[("package.json", "{ nope")]);
        let err = reader().read_tree(&root).await.unwrap_err();
        assert_eq!(err.kind(), "InstalledTreeUnreadable");
    }

    #[test]
    fn test_non_semver_version_kept_raw() {
        assert_eq!(
            InstalledVersion::parse("latest"),
            InstalledVersion::Raw("latest".to_string())
        );
        assert_eq!(InstalledVersion::parse("1.2.3").to_string(), "1.2.3");
    }
}
