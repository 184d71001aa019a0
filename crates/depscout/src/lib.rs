//! # depscout
//!
//! Discover the npm packages a Node.js program depends on.
//!
//! Source modules are walked statically (oxc), modules that compute their
//! imports at runtime are executed under an instrumented loader in a
//! separate `node` process, and the resulting package names are reconciled
//! against the installed `node_modules` tree into a minimal, version-annotated
//! dependency list.
//!
//! ## Quick Start
//!
//! ```no_run
//! use depscout::Analyzer;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = Analyzer::new().target("./my-app").analyze().await?;
//!
//! for (name, range) in report.versions() {
//!     println!("{name}: {range}");
//! }
//! for (name, entry) in &report.manifest.suspect {
//!     println!("{name} is already required by {}", entry.subsumed_by);
//! }
//! # Ok(()) }
//! ```
//!
//! ## Components
//!
//! - [`resolver`]: Node-style specifier resolution
//! - [`scanner`]: static extraction of import specifiers
//! - [`walker`]: per-entry traversal of project files
//! - [`worker`]: isolated, time-bounded dynamic probing
//! - [`aggregate`]: normalization into package names
//! - [`installed`]: one-level read of `node_modules`
//! - [`reconcile`]: version assignment and reduction
//! - [`version`]: range formatting and manifest diffs

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod events;
pub mod installed;
pub mod package_json;
pub mod reconcile;
pub mod resolver;
pub mod result;
pub mod runtime;
pub mod scanner;
pub mod version;
pub mod walker;
pub mod worker;

// Test utilities (available in test builds and when test-utils feature is enabled)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use aggregate::{DiscoverySet, normalize};
pub use analyzer::{Analyzer, Configured, Unconfigured};
pub use config::{AnalysisOptions, AnalysisTarget, ProbeMode};
pub use error::{AnalyzeError, Result};
pub use events::{AnalysisEvent, EventReceiver, EventSender};
pub use installed::{InstalledPackage, InstalledTree, InstalledTreeReader, InstalledVersion};
pub use package_json::PackageManifest;
pub use reconcile::{ReconciledManifest, Reconciler, ResolvedVersion, SuspectEntry};
pub use resolver::{ModuleResolver, NativeModules, ResolveResult, SpecifierKind};
pub use result::{AnalysisReport, TargetKind};
pub use runtime::{NativeRuntime, Runtime, RuntimeError};
pub use scanner::{OxcScanner, ScanResult, StaticScanner};
pub use version::{VersionDiff, diff, extract_versions};
pub use walker::{ModuleWalker, PendingDynamicProbe, WalkOutput};
pub use worker::{ProbeWorker, WorkerFailure, WorkerResult};
