//! BFS traversal for one walk.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{AnalyzeError, Result};
use crate::resolver::ResolveResult;

use super::source::read_module;
use super::{ModuleWalker, PendingDynamicProbe, WalkOutput};

/// Traversal state. Owned by a single `walk` call and dropped with it.
pub(super) struct Traversal<'a> {
    walker: &'a ModuleWalker,
    visited: FxHashSet<PathBuf>,
    queue: VecDeque<PathBuf>,
    errors: Vec<AnalyzeError>,
    output: WalkOutput,
}

impl<'a> Traversal<'a> {
    pub(super) fn new(walker: &'a ModuleWalker) -> Self {
        Self {
            walker,
            visited: FxHashSet::default(),
            queue: VecDeque::new(),
            errors: Vec::new(),
            output: WalkOutput::default(),
        }
    }

    pub(super) async fn run(mut self, entry: &Path) -> Result<WalkOutput> {
        let entry = self.canonical(entry).await;
        self.visited.insert(entry.clone());
        self.queue.push_back(entry);

        while let Some(current) = self.queue.pop_front() {
            if let Err(e) = self.process(&current).await {
                debug!(path = %current.display(), error = %e, "module failed, continuing walk");
                self.errors.push(e);
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }

        debug!(
            modules = self.output.visited.len(),
            specifiers = self.output.specifiers.len(),
            probes = self.output.probes.len(),
            "walk complete"
        );
        Ok(self.output)
    }

    async fn process(&mut self, path: &Path) -> Result<()> {
        self.output.visited.push(path.to_path_buf());

        // JSON modules have no imports
        if path.extension().is_some_and(|ext| ext == "json") {
            return Ok(());
        }

        let resolver = &self.walker.resolver;
        let source = read_module(path, resolver.runtime().as_ref()).await?;
        let scan = self
            .walker
            .scanner
            .scan(path, &source)
            .map_err(|e| AnalyzeError::ModuleParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!(
            path = %path.display(),
            literals = scan.literal_specifiers.len(),
            dynamic = scan.dynamic_expressions,
            "scanned module"
        );

        if scan.has_dynamic_expressions() {
            self.output.probes.push(PendingDynamicProbe {
                module: path.to_path_buf(),
                dynamic_expressions: scan.dynamic_expressions,
            });
        }

        let from_dir = path.parent().unwrap_or_else(|| Path::new("/"));
        for specifier in &scan.literal_specifiers {
            match resolver.resolve(specifier, from_dir).await {
                ResolveResult::Local(resolved) => {
                    let canonical = self.canonical(&resolved).await;
                    if self.visited.insert(canonical.clone()) {
                        self.queue.push_back(canonical);
                    }
                }
                ResolveResult::Unresolved(_)
                    if self.walker.strict_resolution && !resolver.classify(specifier).is_package() =>
                {
                    return Err(AnalyzeError::ResolutionFailure {
                        specifier: specifier.clone(),
                        from: path.to_path_buf(),
                    });
                }
                ResolveResult::Native(_)
                | ResolveResult::Package { .. }
                | ResolveResult::Unresolved(_) => {
                    self.output.specifiers.insert(specifier.clone());
                }
            }
        }

        Ok(())
    }

    /// Visited-set key: the canonical path, or the path itself if it cannot be canonicalized.
    async fn canonical(&self, path: &Path) -> PathBuf {
        self.walker
            .resolver
            .runtime()
            .canonicalize(path)
            .await
            .unwrap_or_else(|_| path_clean::clean(path))
    }
}
