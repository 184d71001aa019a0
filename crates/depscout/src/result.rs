use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::aggregate::DiscoverySet;
use crate::reconcile::ReconciledManifest;
use crate::version::{VersionDiff, diff};

/// How the target path was analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A single module
    File,
    /// Every source file of a directory tree without package.json
    Directory,
    /// A directory with package.json: `main` plus script entries
    Package,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::File => "file",
            TargetKind::Directory => "directory",
            TargetKind::Package => "package",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub target: PathBuf,
    pub kind: TargetKind,
    /// Normalized names discovered in the target
    pub discovered: DiscoverySet,
    pub manifest: ReconciledManifest,
    /// `dependencies` declared by the analyzed package, if any
    pub declared: BTreeMap<String, String>,
    /// Root of the installed tree that was consulted
    pub installed_root: Option<PathBuf>,
}

impl AnalysisReport {
    /// Manifest-ready version ranges of the kept packages.
    pub fn versions(&self) -> BTreeMap<String, String> {
        self.manifest.versions()
    }

    /// Changes relative to the declared `dependencies`.
    pub fn diff_declared(&self) -> VersionDiff {
        diff(&self.declared, &self.versions())
    }

    pub fn has_suspects(&self) -> bool {
        !self.manifest.suspect.is_empty()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dependency Analysis ({}: {})", self.kind, self.target.display())?;
        writeln!(f, "Discovered: {}", self.discovered.len())?;

        let versions = self.versions();
        writeln!(f, "Dependencies: {}", versions.len())?;
        for (name, range) in &versions {
            writeln!(f, "  {name}: {range}")?;
        }

        if !self.manifest.suspect.is_empty() {
            writeln!(f, "\nSuspect (already required by a sibling):")?;
            for (name, entry) in &self.manifest.suspect {
                writeln!(f, "  {name}: {} (via {})", entry.version, entry.subsumed_by)?;
            }
        }

        Ok(())
    }
}
