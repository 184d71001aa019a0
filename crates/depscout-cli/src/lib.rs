//! depscout CLI - print the npm dependencies a Node.js program actually uses.
//!
//! A thin layer over the `depscout` engine:
//!
//! - [`cli`] - argument definitions
//! - [`config`] - layered configuration (defaults, `depscout.json`, environment, flags)
//! - [`commands`] - command implementations
//! - [`error`] - CLI error types and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal styling helpers

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result};
