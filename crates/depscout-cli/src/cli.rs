//! Command-line interface definition.
//!
//! - `depscout analyze <TARGET>` - discover and reconcile dependencies

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use depscout::ProbeMode;
use serde::{Deserialize, Serialize};

/// depscout - find the npm packages a Node.js program actually uses
#[derive(Parser, Debug)]
#[command(
    name = "depscout",
    version,
    about = "Find the npm packages a Node.js program actually uses",
    long_about = "depscout walks a program's modules, executes the ones that compute their\n\
                  imports at runtime in an isolated node process, and reconciles the\n\
                  discovered packages against node_modules into a minimal dependency list."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a file, a directory tree or a package
    Analyze(AnalyzeArgs),
}

/// When modules are executed to observe computed imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeSetting {
    /// Never execute modules
    Off,
    /// Execute modules whose imports are computed at runtime
    Dynamic,
    /// Also execute every entry module
    Always,
}

impl From<ProbeSetting> for ProbeMode {
    fn from(setting: ProbeSetting) -> Self {
        match setting {
            ProbeSetting::Off => ProbeMode::Off,
            ProbeSetting::Dynamic => ProbeMode::Dynamic,
            ProbeSetting::Always => ProbeMode::Always,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// File, directory or package directory to analyze
    #[arg(value_name = "TARGET", default_value = ".")]
    pub target: PathBuf,

    /// Configuration file (default: ./depscout.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-module probe timeout in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// When to execute modules
    #[arg(long, value_enum, value_name = "MODE")]
    pub probe: Option<ProbeSetting>,

    /// Print every discovered specifier unfiltered
    #[arg(long)]
    pub raw: bool,

    /// Keep packages that a sibling dependency already requires
    #[arg(long)]
    pub no_reduce: bool,

    /// Do not read node_modules for versions
    #[arg(long)]
    pub no_npm: bool,

    /// Fail when node_modules cannot be read
    #[arg(long)]
    pub require_installed: bool,

    /// Fail on relative imports that do not resolve
    #[arg(long)]
    pub strict: bool,

    /// package.json script whose files are analyzed (repeatable)
    #[arg(long = "script", value_name = "NAME")]
    pub scripts: Vec<String>,

    /// Files analyzed concurrently in a directory scan
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// node executable used for probing
    #[arg(long = "node", value_name = "PATH")]
    pub node_binary: Option<PathBuf>,

    /// Show changes against the declared dependencies
    #[arg(long)]
    pub diff: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
