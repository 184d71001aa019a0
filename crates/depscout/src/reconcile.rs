//! Version reconciliation and reduction.
//!
//! Assigns a version to every discovered package and, optionally, moves
//! packages that a sibling already depends on into a `suspect` map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::aggregate::DiscoverySet;
use crate::installed::{InstalledTree, InstalledVersion};
use crate::version::{WILDCARD, extract_versions};

/// Where a kept package's version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedVersion {
    /// Range declared in the analyzed package's manifest
    Declared(String),
    /// Version found in the installed tree
    Installed(InstalledVersion),
    /// Neither declared nor installed
    Any,
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedVersion::Declared(range) => f.write_str(range),
            ResolvedVersion::Installed(version) => write!(f, "{version}"),
            ResolvedVersion::Any => f.write_str(WILDCARD),
        }
    }
}

impl Serialize for ResolvedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A package removed by reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspectEntry {
    /// Kept package that declares this one as a dependency
    pub subsumed_by: String,
    pub version: ResolvedVersion,
}

/// Final result of reconciliation. `kept` and `suspect` never share a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciledManifest {
    pub kept: BTreeMap<String, ResolvedVersion>,
    pub suspect: BTreeMap<String, SuspectEntry>,
}

impl ReconciledManifest {
    /// Manifest-ready version ranges of the kept packages.
    pub fn versions(&self) -> BTreeMap<String, String> {
        extract_versions(&self.kept)
    }
}

/// Joins discovered names with declared ranges and the installed tree.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    declared: BTreeMap<String, String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranges from the analyzed package's `dependencies`.
    ///
    /// A declared range wins over the installed version unless it is empty
    /// or `*`.
    pub fn with_declared(mut self, declared: BTreeMap<String, String>) -> Self {
        self.declared = declared;
        self
    }

    /// Build the manifest for `discovered`, reducing it when `reduce` is set.
    pub fn reconcile(
        &self,
        discovered: &DiscoverySet,
        installed: &InstalledTree,
        reduce: bool,
    ) -> ReconciledManifest {
        let kept = self.assign(discovered, installed);
        if reduce {
            Self::reduce(kept, installed)
        } else {
            ReconciledManifest {
                kept,
                suspect: BTreeMap::new(),
            }
        }
    }

    /// Version for every discovered name: declared range, else installed
    /// version, else [`ResolvedVersion::Any`].
    pub fn assign(
        &self,
        discovered: &DiscoverySet,
        installed: &InstalledTree,
    ) -> BTreeMap<String, ResolvedVersion> {
        discovered
            .iter()
            .map(|name| (name.clone(), self.resolve_version(name, installed)))
            .collect()
    }

    /// Move kept packages that a sibling depends on into `suspect`.
    ///
    /// Kept packages are visited in lexicographic order and each one still
    /// kept moves every other kept package it depends on. The
    /// lexicographically first subsumer therefore wins, and a package
    /// already moved to `suspect` subsumes nothing.
    pub fn reduce(
        mut kept: BTreeMap<String, ResolvedVersion>,
        installed: &InstalledTree,
    ) -> ReconciledManifest {
        let mut suspect = BTreeMap::new();
        let order: Vec<String> = kept.keys().cloned().collect();

        for parent in &order {
            if !kept.contains_key(parent) {
                continue;
            }
            let Some(package) = installed.get_any(parent) else {
                continue;
            };

            for child in &order {
                if child == parent || !package.depends_on(child) {
                    continue;
                }
                if let Some(version) = kept.remove(child) {
                    debug!(package = %child, subsumed_by = %parent, "reduced dependency");
                    suspect.insert(
                        child.clone(),
                        SuspectEntry {
                            subsumed_by: parent.clone(),
                            version,
                        },
                    );
                }
            }
        }

        ReconciledManifest { kept, suspect }
    }

    fn resolve_version(&self, name: &str, installed: &InstalledTree) -> ResolvedVersion {
        if let Some(range) = self
            .declared
            .get(name)
            .map(|r| r.trim())
            .filter(|r| !r.is_empty() && *r != WILDCARD)
        {
            return ResolvedVersion::Declared(range.to_string());
        }

        installed
            .get(name)
            .and_then(|package| package.version.clone())
            .map(ResolvedVersion::Installed)
            .unwrap_or(ResolvedVersion::Any)
    }
}
