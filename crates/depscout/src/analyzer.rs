//! Analysis orchestration.
//!
//! Stats the target and dispatches to one of three flows:
//! - a file is walked (and probed) on its own
//! - a directory with package.json is analyzed from its entry point and the
//!   files named by its scripts
//! - any other directory has every source file analyzed concurrently
//!
//! The discovered names are then reconciled against the installed tree.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::aggregate::{DiscoverySet, normalize};
use crate::config::{AnalysisOptions, AnalysisTarget, ProbeMode};
use crate::error::{AnalyzeError, Result};
use crate::events::{AnalysisEvent, EventSender};
use crate::installed::{InstalledTree, InstalledTreeReader};
use crate::package_json::{MANIFEST_FILE, PackageManifest, fallback_entry};
use crate::reconcile::{ReconciledManifest, Reconciler};
use crate::resolver::extensions::resolve_file;
use crate::resolver::{ModuleResolver, NativeModules};
use crate::result::{AnalysisReport, TargetKind};
use crate::runtime::{NativeRuntime, Runtime, RuntimeError};
use crate::scanner::{OxcScanner, StaticScanner};
use crate::walker::ModuleWalker;
use crate::worker::ProbeWorker;

/// Typestate marker for an analyzer without a target.
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured;

/// Typestate marker for an analyzer with a target.
#[derive(Debug, Clone, Copy)]
pub struct Configured;

/// Dependency analyzer.
///
/// `analyze()` is only available once a target has been set.
///
/// ```rust,no_run
/// use depscout::Analyzer;
/// use std::time::Duration;
///
/// # async fn example() -> depscout::Result<()> {
/// let report = Analyzer::new()
///     .target("./my-app")
///     .timeout(Duration::from_secs(2))
///     .reduce(true)
///     .analyze()
///     .await?;
///
/// for (name, range) in report.versions() {
///     println!("{name}: {range}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Analyzer<State = Unconfigured> {
    target: Option<PathBuf>,
    options: AnalysisOptions,
    runtime: Option<Arc<dyn Runtime>>,
    scanner: Option<Arc<dyn StaticScanner>>,
    events: Option<EventSender>,
    _state: PhantomData<State>,
}

impl Analyzer<Unconfigured> {
    pub fn new() -> Self {
        Self {
            target: None,
            options: AnalysisOptions::default(),
            runtime: None,
            scanner: None,
            events: None,
            _state: PhantomData,
        }
    }

    /// Set the file or directory to analyze.
    pub fn target(self, path: impl Into<PathBuf>) -> Analyzer<Configured> {
        Analyzer {
            target: Some(path.into()),
            options: self.options,
            runtime: self.runtime,
            scanner: self.scanner,
            events: self.events,
            _state: PhantomData,
        }
    }
}

impl Default for Analyzer<Unconfigured> {
    fn default() -> Self {
        Self::new()
    }
}

impl<State> Analyzer<State> {
    /// Replace every option at once.
    pub fn options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Wall-clock bound for each worker probe (default: 5s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn probe_mode(mut self, mode: ProbeMode) -> Self {
        self.options.probe_mode = mode;
        self
    }

    /// Keep native, relative and subpath specifiers as discovered.
    pub fn raw(mut self, raw: bool) -> Self {
        self.options.raw = raw;
        self
    }

    /// Move packages already required by a sibling into `suspect` (default: true).
    pub fn reduce(mut self, reduce: bool) -> Self {
        self.options.reduce = reduce;
        self
    }

    /// Consult node_modules for versions (default: true).
    pub fn npm(mut self, enabled: bool) -> Self {
        self.options.npm_enabled = enabled;
        self
    }

    /// Fail instead of degrading when node_modules cannot be read.
    pub fn require_installed(mut self, required: bool) -> Self {
        self.options.require_installed = required;
        self
    }

    pub fn strict_resolution(mut self, strict: bool) -> Self {
        self.options.strict_resolution = strict;
        self
    }

    /// package.json scripts whose files are analyzed (default: test, prestart).
    pub fn scripts(mut self, scripts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.scripts = scripts.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum concurrently analyzed files in a directory scan.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.options.concurrency = limit.max(1);
        self
    }

    pub fn node_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.node_binary = path.into();
        self
    }

    /// Restrict which files a directory scan analyzes.
    pub fn file_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.options.file_filter = Some(Arc::new(filter));
        self
    }

    /// Filesystem used for resolution and tree reading (default: native).
    pub fn runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Static scanner (default: [`OxcScanner`]).
    pub fn scanner(mut self, scanner: Arc<dyn StaticScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Subscribe to the analysis checkpoints.
    pub fn events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }
}

impl Analyzer<Configured> {
    /// Run the analysis.
    pub async fn analyze(self) -> Result<AnalysisReport> {
        let runtime = self
            .runtime
            .unwrap_or_else(|| Arc::new(NativeRuntime::new()));
        let scanner = self.scanner.unwrap_or_else(|| Arc::new(OxcScanner::new()));
        let path = self.target.unwrap_or_default();

        let natives = NativeModules::node();
        let resolver = Arc::new(ModuleResolver::new(
            natives,
            self.options.extensions.clone(),
            Arc::clone(&runtime),
        ));
        let engine = Arc::new(Engine {
            walker: ModuleWalker::new(resolver, scanner)
                .strict_resolution(self.options.strict_resolution),
            worker: ProbeWorker::new(self.options.node_binary.clone()),
            runtime,
            natives,
            events: self.events,
        });

        engine.run(AnalysisTarget::new(path, self.options)).await
    }
}

/// Shared state of one analysis run.
struct Engine {
    runtime: Arc<dyn Runtime>,
    natives: NativeModules,
    walker: ModuleWalker,
    worker: ProbeWorker,
    events: Option<EventSender>,
}

impl Engine {
    async fn run(self: Arc<Self>, target: AnalysisTarget) -> Result<AnalysisReport> {
        let requested = target.path().to_path_buf();
        let not_found = |source: RuntimeError| AnalyzeError::TargetNotFound {
            path: requested.clone(),
            source,
        };
        let path = self.runtime.canonicalize(&requested).await.map_err(not_found)?;
        let metadata = self.runtime.metadata(&path).await.map_err(not_found)?;
        let target = target.child(path.clone());

        let (kind, discovered, declared, start_dir) = if metadata.is_file {
            let discovered = self.analyze_file(&target).await?;
            let start_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.clone());
            (TargetKind::File, discovered, BTreeMap::new(), start_dir)
        } else if metadata.is_dir && self.runtime.exists(&path.join(MANIFEST_FILE)) {
            let (discovered, manifest) = self.analyze_package(&target).await?;
            (TargetKind::Package, discovered, manifest.dependencies, path.clone())
        } else if metadata.is_dir {
            let discovered = self.analyze_dir(&target).await?;
            (TargetKind::Directory, discovered, BTreeMap::new(), path.clone())
        } else {
            return Err(AnalyzeError::UnsupportedTargetType { path });
        };

        info!(target = %path.display(), %kind, count = discovered.len(), "dependency discovery complete");
        self.emit(AnalysisEvent::Dependencies(discovered.clone()));

        let options = target.options();
        let installed = if options.npm_enabled {
            Some(self.read_installed(&start_dir, options.require_installed).await?)
        } else {
            None
        };
        let empty = InstalledTree::empty(&start_dir);
        let tree = installed.as_ref().unwrap_or(&empty);

        let reconciler = Reconciler::new().with_declared(declared.clone());
        let kept = reconciler.assign(&discovered, tree);
        info!(packages = kept.len(), installed = tree.len(), "installed search complete");
        self.emit(AnalysisEvent::Search(kept.clone()));

        let manifest = if options.reduce {
            let manifest = Reconciler::reduce(kept, tree);
            info!(kept = manifest.kept.len(), suspect = manifest.suspect.len(), "reduction complete");
            self.emit(AnalysisEvent::Reduce {
                kept: manifest.kept.clone(),
                suspect: manifest.suspect.clone(),
            });
            manifest
        } else {
            ReconciledManifest {
                kept,
                suspect: BTreeMap::new(),
            }
        };

        Ok(AnalysisReport {
            target: path,
            kind,
            discovered,
            manifest,
            declared,
            installed_root: installed.map(|tree| tree.root().to_path_buf()),
        })
    }

    fn emit(&self, event: AnalysisEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver only means nobody is listening any more
            let _ = sender.send(event);
        }
    }

    /// Walk one module and probe what the walk could not see statically.
    async fn analyze_file(&self, target: &AnalysisTarget) -> Result<DiscoverySet> {
        let options = target.options();
        let output = self.walker.walk(target.path()).await?;
        let mut raw: BTreeSet<String> = output.specifiers;

        if options.probe_mode.follows_dynamic() {
            let mut modules: Vec<PathBuf> = output.probes.into_iter().map(|p| p.module).collect();
            if options.probe_mode == ProbeMode::Always {
                if let Some(entry) = output.visited.first() {
                    if !modules.contains(entry) {
                        modules.insert(0, entry.clone());
                    }
                }
            }

            for module in modules {
                let found = self
                    .worker
                    .probe(&module, options.timeout)
                    .await
                    .map_err(|failure| failure.into_error(&module))?;
                raw.extend(found);
            }
        }

        Ok(normalize(raw, options.raw, &self.natives))
    }

    /// Analyze `files` concurrently, bounded by the configured limit.
    ///
    /// Every file runs to completion; failures are reported together.
    async fn analyze_files(
        self: &Arc<Self>,
        target: &AnalysisTarget,
        files: Vec<PathBuf>,
    ) -> Result<DiscoverySet> {
        let semaphore = Arc::new(Semaphore::new(target.options().concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for file in files {
            let engine = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let child = target.child(file);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = engine.analyze_file(&child).await;
                (child, result)
            });
        }

        let mut discovered = DiscoverySet::new();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(found))) => discovered.merge(found),
                Ok((child, Err(e))) => {
                    debug!(file = %child.path().display(), error = %e, "file analysis failed");
                    failures.push(e);
                }
                Err(e) => failures.push(AnalyzeError::Runtime(RuntimeError::Other(format!(
                    "analysis task failed: {e}"
                )))),
            }
        }

        failures.sort_by_key(|e| e.to_string());
        // a broken module shared by several files fails each of them the same way
        failures.dedup_by(|a, b| a.kind() == b.kind() && a.to_string() == b.to_string());
        match AnalyzeError::aggregate(failures) {
            Some(error) => Err(error),
            None => Ok(discovered),
        }
    }

    async fn analyze_dir(self: &Arc<Self>, target: &AnalysisTarget) -> Result<DiscoverySet> {
        let scan_target = target.clone();
        let files = tokio::task::spawn_blocking(move || collect_source_files(&scan_target))
            .await
            .map_err(|e| AnalyzeError::Runtime(RuntimeError::Other(format!("directory scan failed: {e}"))))?;

        debug!(dir = %target.path().display(), files = files.len(), "analyzing directory tree");
        self.analyze_files(target, files).await
    }

    /// Analyze a package directory from its entry point and script files.
    ///
    /// The package's own name and its development-only dependencies are
    /// removed from the result.
    async fn analyze_package(
        self: &Arc<Self>,
        target: &AnalysisTarget,
    ) -> Result<(DiscoverySet, PackageManifest)> {
        let dir = target.path();
        let options = target.options();
        let runtime = self.runtime.as_ref();

        let manifest = match PackageManifest::find_in_dir(runtime, dir).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => PackageManifest {
                path: dir.join(MANIFEST_FILE),
                ..PackageManifest::default()
            },
            Err(e) => match fallback_entry(runtime, dir).await {
                Some(entry) => {
                    warn!(error = %e, entry = %entry.display(), "ignoring unreadable package.json");
                    PackageManifest {
                        path: dir.join(MANIFEST_FILE),
                        ..PackageManifest::default()
                    }
                }
                None => return Err(e),
            },
        };

        let entry = manifest
            .resolve_entry(runtime, dir, &options.extensions)
            .await
            .ok_or_else(|| AnalyzeError::MissingEntryPoint {
                path: dir.to_path_buf(),
            })?;

        let mut entries = vec![entry];
        for token in manifest.script_tokens(&options.scripts) {
            let candidate = path_clean::clean(dir.join(token));
            if let Some(file) = resolve_file(&candidate, &options.extensions, runtime).await {
                if options.is_source_file(&file) && !entries.contains(&file) {
                    debug!(script_entry = %file.display(), "analyzing script file");
                    entries.push(file);
                }
            }
        }

        let mut discovered = self.analyze_files(target, entries).await?;
        if let Some(name) = &manifest.name {
            discovered.remove(name);
        }
        for dev in manifest.dev_dependencies.keys() {
            if !manifest.dependencies.contains_key(dev) {
                discovered.remove(dev);
            }
        }

        Ok((discovered, manifest))
    }

    async fn read_installed(&self, start_dir: &Path, required: bool) -> Result<InstalledTree> {
        let reader = InstalledTreeReader::new(Arc::clone(&self.runtime));
        match reader.read_tree(start_dir).await {
            Ok(tree) => Ok(tree),
            Err(e) if !required => {
                warn!(error = %e, "installed tree unreadable, treating as nothing installed");
                Ok(InstalledTree::empty(start_dir))
            }
            Err(e) => Err(e),
        }
    }
}

/// Source files under the target directory, skipping `node_modules` and
/// hidden directories, sorted for stable scheduling.
fn collect_source_files(target: &AnalysisTarget) -> Vec<PathBuf> {
    let root = target.path();
    let options = target.options();

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_name() == "node_modules"
                    || entry.file_name().to_string_lossy().starts_with('.'))
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| options.accepts_file(path))
        .collect();

    files.sort();
    files
}
