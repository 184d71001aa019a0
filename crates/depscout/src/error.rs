//! Error types for dependency analysis.
//!
//! Every variant names the path it originated from so that a failure in a
//! directory-tree scan can be traced back to one file.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::runtime::RuntimeError;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalyzeError>;

/// Errors surfaced by the analysis engine.
#[derive(Debug, Error, Diagnostic)]
pub enum AnalyzeError {
    /// The analysis target does not exist or cannot be read
    #[error("Target not found or unreadable: {}", .path.display())]
    #[diagnostic(
        code(depscout::target_not_found),
        help("Pass an existing file or directory")
    )]
    TargetNotFound {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    /// The analysis target is neither a file nor a directory
    #[error("{} is not a file or a directory", .path.display())]
    #[diagnostic(code(depscout::unsupported_target))]
    UnsupportedTargetType { path: PathBuf },

    /// package.json exists but is malformed
    #[error("Invalid package manifest {}: {reason}", .path.display())]
    #[diagnostic(
        code(depscout::manifest_parse),
        help("Check package.json syntax and field types")
    )]
    ManifestParse { path: PathBuf, reason: String },

    /// A source module cannot be read or statically parsed
    #[error("Failed to parse module {}: {reason}", .path.display())]
    #[diagnostic(code(depscout::module_parse))]
    ModuleParse { path: PathBuf, reason: String },

    /// The probed module threw an exception while loading
    #[error("Probed module {} threw an error: {message}", .path.display())]
    #[diagnostic(code(depscout::worker::thrown))]
    WorkerThrown { path: PathBuf, message: String },

    /// The probed module threw `null`, `undefined`, `false` or another falsey value
    #[error("Probed module {} threw a falsey value ({message})", .path.display())]
    #[diagnostic(code(depscout::worker::falsey_throw))]
    WorkerFalseyThrow { path: PathBuf, message: String },

    /// The probed module exhausted the call stack
    #[error("Probed module {} overflowed the call stack: {message}", .path.display())]
    #[diagnostic(
        code(depscout::worker::stack_overflow),
        help("Look for unbounded recursion at module load time")
    )]
    WorkerStackOverflow { path: PathBuf, message: String },

    /// The probed module failed to parse at load time
    #[error("Probed module {} has a syntax error: {message}", .path.display())]
    #[diagnostic(code(depscout::worker::syntax))]
    WorkerSyntax { path: PathBuf, message: String },

    /// The probe did not finish before its deadline
    #[error("Probing {} timed out after {timeout_ms}ms", .path.display())]
    #[diagnostic(
        code(depscout::worker::timeout),
        help("Increase the probe timeout or check for code that never finishes loading")
    )]
    WorkerTimeout { path: PathBuf, timeout_ms: u64 },

    /// The probe process could not be started
    #[error("Failed to start probe process for {}: {message}", .path.display())]
    #[diagnostic(
        code(depscout::worker::spawn_failed),
        help("Ensure `node` is installed and on PATH, or disable dynamic probing")
    )]
    WorkerSpawn { path: PathBuf, message: String },

    /// A specifier could not be located and the current mode does not tolerate it
    #[error("Cannot resolve '{specifier}' from {}", .from.display())]
    #[diagnostic(code(depscout::resolution_failure))]
    ResolutionFailure { specifier: String, from: PathBuf },

    /// No entry point could be determined for a package directory
    #[error("No entry point found for package at {}", .path.display())]
    #[diagnostic(
        code(depscout::missing_entry),
        help("Declare `main` in package.json or add app.js, server.js or index.js")
    )]
    MissingEntryPoint { path: PathBuf },

    /// node_modules exists but could not be read
    #[error("Installed package tree at {} is unreadable: {reason}", .path.display())]
    #[diagnostic(code(depscout::installed_tree_unreadable))]
    InstalledTreeUnreadable { path: PathBuf, reason: String },

    /// One or more files in a directory-tree scan failed
    #[error("{}", AggregateDisplay(.failures))]
    #[diagnostic(code(depscout::aggregate))]
    Aggregate { failures: Vec<AnalyzeError> },

    /// Filesystem error outside a more specific context
    #[error(transparent)]
    #[diagnostic(code(depscout::runtime))]
    Runtime(#[from] RuntimeError),
}

impl AnalyzeError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TargetNotFound { .. } => "TargetNotFoundOrUnreadable",
            Self::UnsupportedTargetType { .. } => "UnsupportedTargetType",
            Self::ManifestParse { .. } => "ManifestParseError",
            Self::ModuleParse { .. } => "ModuleParseError",
            Self::WorkerThrown { .. } => "WorkerThrownError",
            Self::WorkerFalseyThrow { .. } => "WorkerFalseyThrow",
            Self::WorkerStackOverflow { .. } => "WorkerStackOverflow",
            Self::WorkerSyntax { .. } => "WorkerSyntaxError",
            Self::WorkerTimeout { .. } => "WorkerTimeout",
            Self::WorkerSpawn { .. } => "WorkerSpawnError",
            Self::ResolutionFailure { .. } => "ResolutionFailure",
            Self::MissingEntryPoint { .. } => "MissingEntryPoint",
            Self::InstalledTreeUnreadable { .. } => "InstalledTreeUnreadable",
            Self::Aggregate { .. } => "Aggregate",
            Self::Runtime(_) => "Runtime",
        }
    }

    /// Fold a list of per-file failures into a single error.
    ///
    /// Returns `None` for an empty list and the error itself for a single one.
    pub fn aggregate(mut failures: Vec<AnalyzeError>) -> Option<AnalyzeError> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            _ => Some(AnalyzeError::Aggregate { failures }),
        }
    }
}

struct AggregateDisplay<'a>(&'a [AnalyzeError]);

impl fmt::Display for AggregateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Analysis failed for {} file(s):", self.0.len())?;
        for failure in self.0 {
            write!(f, "\n  - [{}] {}", failure.kind(), failure)?;
        }
        Ok(())
    }
}
