//! Analysis options and targets.
//!
//! `AnalysisOptions` is built once per invocation and never mutated while an
//! analysis runs. Recursive analyses (one file per task in a directory scan,
//! extra script entries of a package) derive child targets with
//! [`AnalysisTarget::child`], which keeps every option and swaps the path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default wall-clock bound for one worker probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default number of files analyzed concurrently in a directory-tree scan.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default package.json scripts whose files are analyzed alongside `main`.
pub const DEFAULT_SCRIPTS: &[&str] = &["test", "prestart"];

/// Source extensions tried by the resolver, in order.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "cjs", "mjs", "json"];

/// Entry files probed, in order, when package.json declares no `main`.
pub const ENTRY_FALLBACKS: &[&str] = &["app.js", "server.js", "index.js"];

/// Maximum source file size accepted by the walker (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Node executable used for worker probes.
pub const DEFAULT_NODE_BINARY: &str = "node";

/// When the walker hands a module to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    /// Never execute modules; dynamic expressions are ignored.
    Off,
    /// Probe only modules containing non-literal import expressions.
    #[default]
    Dynamic,
    /// Additionally probe every entry module, even fully static ones.
    Always,
}

impl ProbeMode {
    pub fn follows_dynamic(self) -> bool {
        !matches!(self, ProbeMode::Off)
    }
}

/// Predicate deciding which files a directory-tree scan analyzes.
pub type FileFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Options shared by every step of one analysis run.
#[derive(Clone)]
pub struct AnalysisOptions {
    /// Whether and when modules are executed by the worker.
    pub probe_mode: ProbeMode,

    /// Wall-clock bound for a single worker probe.
    pub timeout: Duration,

    /// Skip native/relative filtering and package-name truncation.
    pub raw: bool,

    /// Move packages pulled in by a sibling into the suspect map.
    pub reduce: bool,

    /// Reconcile against the installed node_modules tree.
    pub npm_enabled: bool,

    /// Fail when installed-tree data cannot be read instead of degrading.
    pub require_installed: bool,

    /// Treat an unresolvable relative/absolute specifier as an error.
    pub strict_resolution: bool,

    /// package.json script names whose files are analyzed, in order.
    pub scripts: Vec<String>,

    /// Source extensions, without the leading dot.
    pub extensions: Vec<String>,

    /// Concurrent file tasks in a directory-tree scan.
    pub concurrency: usize,

    /// Executable used to run probes.
    pub node_binary: PathBuf,

    /// Extra filter applied to files found in a directory-tree scan.
    pub file_filter: Option<FileFilter>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            probe_mode: ProbeMode::default(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            raw: false,
            reduce: true,
            npm_enabled: true,
            require_installed: false,
            strict_resolution: false,
            scripts: DEFAULT_SCRIPTS.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            concurrency: DEFAULT_CONCURRENCY,
            node_binary: PathBuf::from(DEFAULT_NODE_BINARY),
            file_filter: None,
        }
    }
}

impl fmt::Debug for AnalysisOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisOptions")
            .field("probe_mode", &self.probe_mode)
            .field("timeout", &self.timeout)
            .field("raw", &self.raw)
            .field("reduce", &self.reduce)
            .field("npm_enabled", &self.npm_enabled)
            .field("require_installed", &self.require_installed)
            .field("strict_resolution", &self.strict_resolution)
            .field("scripts", &self.scripts)
            .field("extensions", &self.extensions)
            .field("concurrency", &self.concurrency)
            .field("node_binary", &self.node_binary)
            .field("file_filter", &self.file_filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl AnalysisOptions {
    /// Whether a file found during a directory-tree scan should be analyzed.
    ///
    /// Files under `node_modules` are never analyzed; the extension must be
    /// one of the configured source extensions (JSON excluded) and the
    /// optional filter must accept the path.
    pub fn accepts_file(&self, path: &Path) -> bool {
        if path
            .components()
            .any(|c| c.as_os_str() == "node_modules")
        {
            return false;
        }

        self.is_source_file(path) && self.file_filter.as_ref().is_none_or(|filter| filter(path))
    }

    /// Whether `path` has one of the configured source extensions (JSON excluded).
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext != "json" && self.extensions.iter().any(|e| e == ext))
    }
}

/// A filesystem path plus the options it is analyzed with.
#[derive(Debug, Clone)]
pub struct AnalysisTarget {
    path: PathBuf,
    options: Arc<AnalysisOptions>,
}

impl AnalysisTarget {
    pub fn new(path: impl Into<PathBuf>, options: AnalysisOptions) -> Self {
        Self {
            path: path.into(),
            options: Arc::new(options),
        }
    }

    /// Derive a target for `path` that shares every option with `self`.
    pub fn child(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: Arc::clone(&self.options),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }
}
