//! Static module-graph walker.
//!
//! Starting from one entry module, follows every literal specifier that
//! resolves to a project file and records everything else (packages,
//! builtins, unresolved specifiers). Modules whose imports are computed at
//! runtime are returned as pending probes for the worker instead of being
//! guessed at.

mod source;
mod traversal;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::resolver::ModuleResolver;
use crate::scanner::StaticScanner;

pub use source::read_module;

/// A module that needs to be executed to see all of its imports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingDynamicProbe {
    pub module: PathBuf,
    /// Number of computed `require()`/`import()` calls found statically
    pub dynamic_expressions: usize,
}

/// Result of walking one entry module.
#[derive(Debug, Clone, Default)]
pub struct WalkOutput {
    /// Specifiers as written, before normalization
    pub specifiers: BTreeSet<String>,
    /// At most one probe per module, in discovery order
    pub probes: Vec<PendingDynamicProbe>,
    /// Modules read and scanned, each exactly once
    pub visited: Vec<PathBuf>,
}

/// Walks the static import graph of one entry module.
///
/// A walker holds no per-walk state; every call to [`walk`](Self::walk)
/// starts with an empty visited set.
#[derive(Debug, Clone)]
pub struct ModuleWalker {
    resolver: Arc<ModuleResolver>,
    scanner: Arc<dyn StaticScanner>,
    strict_resolution: bool,
}

impl ModuleWalker {
    pub fn new(resolver: Arc<ModuleResolver>, scanner: Arc<dyn StaticScanner>) -> Self {
        Self {
            resolver,
            scanner,
            strict_resolution: false,
        }
    }

    /// Fail on unresolvable relative/absolute specifiers instead of recording them.
    pub fn strict_resolution(mut self, strict: bool) -> Self {
        self.strict_resolution = strict;
        self
    }

    /// Walk the graph reachable from `entry`.
    ///
    /// Unreadable or unparsable modules do not stop the walk; once the queue
    /// is drained the first such failure is returned with its path.
    pub async fn walk(&self, entry: &Path) -> Result<WalkOutput> {
        traversal::Traversal::new(self).run(entry).await
    }
}
