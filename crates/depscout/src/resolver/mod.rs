//! Module resolution.
//!
//! Mirrors the lookup rules of the Node.js module system closely enough to
//! tell project files, installed packages and builtins apart:
//! 1. builtins from an embedded table
//! 2. relative and absolute paths with extension and `index` fallbacks
//! 3. bare specifiers through `node_modules` in the base directory and every
//!    ancestor
//!
//! Resolution reads the filesystem through [`Runtime`] and never writes or
//! spawns anything.

pub mod extensions;
mod native;
mod specifier;

pub use native::NativeModules;
pub use specifier::{SpecifierKind, package_name, split_package_specifier};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::package_json::PackageManifest;
use crate::runtime::Runtime;

use self::extensions::{resolve_file, try_index_files};

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    /// Runtime builtin
    Native(String),
    /// A project file reached through a relative or absolute specifier
    Local(PathBuf),
    /// A file inside an installed package
    Package {
        /// Top-level package name (`@scope/name` for scoped packages)
        name: String,
        /// Resolved entry or subpath file
        path: PathBuf,
    },
    /// Nothing matched; carries the specifier unchanged
    Unresolved(String),
}

/// Resolves specifiers relative to a base directory.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    natives: NativeModules,
    extensions: Vec<String>,
    runtime: Arc<dyn Runtime>,
}

impl ModuleResolver {
    pub fn new(natives: NativeModules, extensions: Vec<String>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            natives,
            extensions,
            runtime,
        }
    }

    pub fn natives(&self) -> &NativeModules {
        &self.natives
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    pub fn classify(&self, specifier: &str) -> SpecifierKind {
        SpecifierKind::classify(specifier, &self.natives)
    }

    /// Resolve `specifier` as requested by a module living in `from_dir`.
    pub async fn resolve(&self, specifier: &str, from_dir: &Path) -> ResolveResult {
        let result = match self.classify(specifier) {
            SpecifierKind::Native => ResolveResult::Native(specifier.to_string()),
            SpecifierKind::Relative => {
                let base = path_clean::clean(from_dir.join(specifier));
                self.resolve_local(specifier, &base).await
            }
            SpecifierKind::AbsolutePath => {
                let base = path_clean::clean(PathBuf::from(specifier));
                self.resolve_local(specifier, &base).await
            }
            SpecifierKind::Package { name, subpath } => {
                self.resolve_package(specifier, name, subpath.as_deref(), from_dir)
                    .await
            }
        };

        trace!(specifier, from = %from_dir.display(), ?result, "resolved specifier");
        result
    }

    async fn resolve_local(&self, specifier: &str, base: &Path) -> ResolveResult {
        match resolve_file(base, &self.extensions, self.runtime.as_ref()).await {
            Some(path) => ResolveResult::Local(path),
            None => ResolveResult::Unresolved(specifier.to_string()),
        }
    }

    async fn resolve_package(
        &self,
        specifier: &str,
        name: String,
        subpath: Option<&str>,
        from_dir: &Path,
    ) -> ResolveResult {
        let Some(package_dir) = self.find_package_dir(&name, from_dir).await else {
            return ResolveResult::Unresolved(specifier.to_string());
        };

        let entry = match subpath {
            Some(subpath) => {
                let base = path_clean::clean(package_dir.join(subpath));
                resolve_file(&base, &self.extensions, self.runtime.as_ref()).await
            }
            None => self.package_entry(&package_dir).await,
        };

        match entry {
            Some(path) => ResolveResult::Package { name, path },
            None => ResolveResult::Unresolved(specifier.to_string()),
        }
    }

    /// `node_modules/<name>` in `from_dir` or the nearest ancestor holding it.
    pub async fn find_package_dir(&self, name: &str, from_dir: &Path) -> Option<PathBuf> {
        for dir in from_dir.ancestors() {
            if dir.file_name().is_some_and(|n| n == "node_modules") {
                continue;
            }
            let candidate = dir.join("node_modules").join(name);
            if self.runtime.is_dir(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Entry file of an installed package: `main`, then `index.<ext>`.
    async fn package_entry(&self, package_dir: &Path) -> Option<PathBuf> {
        let runtime = self.runtime.as_ref();
        match PackageManifest::find_in_dir(runtime, package_dir).await {
            Ok(Some(manifest)) => {
                if let Some(main) = manifest.main.as_deref().filter(|m| !m.trim().is_empty()) {
                    let base = path_clean::clean(package_dir.join(main));
                    if let Some(entry) = resolve_file(&base, &self.extensions, runtime).await {
                        return Some(entry);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => trace!(dir = %package_dir.display(), error = %e, "ignoring unreadable package manifest"),
        }

        try_index_files(package_dir, &self.extensions, runtime).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EXTENSIONS;
    use crate::test_utils::{TestRuntime, create_test_project, install_fake_package};
    use tempfile::TempDir;

    fn resolver() -> ModuleResolver {
        ModuleResolver::new(
            NativeModules::node(),
            DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            Arc::new(TestRuntime::new()),
        )
    }

    #[tokio::test]
    async fn test_resolve_native() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("fs", temp.path()).await,
            ResolveResult::Native("fs".to_string())
        );
        assert_eq!(
            resolver.resolve("node:path", temp.path()).await,
            ResolveResult::Native("node:path".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_relative() {
        let temp = TempDir::new().unwrap();
        let root = create_test_project(temp.path(), &[("lib/helper.js", ""), ("src/main.js", "")]);
        let resolver = resolver();

        assert_eq!(
            resolver.resolve("../lib/helper", &root.join("src")).await,
            ResolveResult::Local(root.join("lib/helper.js"))
        );
        assert_eq!(
            resolver.resolve("./nope", &root).await,
            ResolveResult::Unresolved("./nope".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_package_from_ancestor() {
        let temp = TempDir::new().unwrap();
        let root = create_test_project(temp.path(), &[("src/deep/a.js", "")]);
        install_fake_package(&root, "vows", "0.5.0", &[]);
        let resolver = resolver();

        let result = resolver.resolve("vows", &root.join("src/deep")).await;
        assert_eq!(
            result,
            ResolveResult::Package {
                name: "vows".to_string(),
                path: root.join("node_modules/vows/index.js"),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_package_subpath() {
        let temp = TempDir::new().unwrap();
        let root = create_test_project(
            temp.path(),
            &[("node_modules/socket.io/lib/utils.js", "")],
        );
        install_fake_package(&root, "socket.io", "0.9.0", &[]);
        let resolver = resolver();

        match resolver.resolve("socket.io/lib/utils", &root).await {
            ResolveResult::Package { name, path } => {
                assert_eq!(name, "socket.io");
                assert_eq!(path, root.join("node_modules/socket.io/lib/utils.js"));
            }
            other => panic!("expected package, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_scoped_package_without_main() {
        let temp = TempDir::new().unwrap();
        let root = create_test_project(
            temp.path(),
            &[
                ("node_modules/@acme/tools/package.json", r#"{"name":"@acme/tools"}"#),
                ("node_modules/@acme/tools/index.js", ""),
            ],
        );
        let resolver = resolver();

        assert!(matches!(
            resolver.resolve("@acme/tools", &root).await,
            ResolveResult::Package { ref name, .. } if name == "@acme/tools"
        ));
    }

    #[tokio::test]
    async fn test_missing_package_is_unresolved() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("vows", temp.path()).await,
            ResolveResult::Unresolved("vows".to_string())
        );
    }
}
