//! Layered configuration.
//!
//! Priority, highest first: command-line flags, `DEPSCOUT_*` environment
//! variables, the config file (`--config` or `./depscout.json`), defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use depscout::AnalysisOptions;
use depscout::config::{
    DEFAULT_CONCURRENCY, DEFAULT_EXTENSIONS, DEFAULT_NODE_BINARY, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_SCRIPTS,
};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::{Deserialize, Serialize};

use crate::cli::{AnalyzeArgs, ProbeSetting};
use crate::error::{ConfigError, Result};

/// Config file picked up from the working directory.
pub const CONFIG_FILE: &str = "depscout.json";

/// Prefix of environment overrides (`DEPSCOUT_TIMEOUT_MS=2000`).
pub const ENV_PREFIX: &str = "DEPSCOUT_";

/// Effective settings of one `depscout analyze` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepscoutConfig {
    pub timeout_ms: u64,
    pub probe: ProbeSetting,
    pub raw: bool,
    pub reduce: bool,
    pub npm: bool,
    pub require_installed: bool,
    pub strict: bool,
    pub scripts: Vec<String>,
    pub extensions: Vec<String>,
    pub concurrency: usize,
    pub node_binary: PathBuf,
}

impl Default for DepscoutConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            probe: ProbeSetting::Dynamic,
            raw: false,
            reduce: true,
            npm: true,
            require_installed: false,
            strict: false,
            scripts: DEFAULT_SCRIPTS.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            concurrency: DEFAULT_CONCURRENCY,
            node_binary: PathBuf::from(DEFAULT_NODE_BINARY),
        }
    }
}

/// Only the flags that were actually given, so unset flags never mask a
/// file or environment value.
#[derive(Debug, Default, Serialize)]
struct FlagOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probe: Option<ProbeSetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reduce: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    npm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    require_installed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scripts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_binary: Option<PathBuf>,
}

impl From<&AnalyzeArgs> for FlagOverrides {
    fn from(args: &AnalyzeArgs) -> Self {
        Self {
            timeout_ms: args.timeout,
            probe: args.probe,
            raw: args.raw.then_some(true),
            reduce: args.no_reduce.then_some(false),
            npm: args.no_npm.then_some(false),
            require_installed: args.require_installed.then_some(true),
            strict: args.strict.then_some(true),
            scripts: (!args.scripts.is_empty()).then(|| args.scripts.clone()),
            concurrency: args.concurrency,
            node_binary: args.node_binary.clone(),
        }
    }
}

impl DepscoutConfig {
    /// Load the configuration for `args`, resolving the default config file
    /// against the process working directory.
    pub fn load(args: &AnalyzeArgs) -> Result<Self> {
        Self::load_from(args, Path::new("."))
    }

    /// Load the configuration for `args`, looking for `depscout.json` in `dir`.
    pub fn load_from(args: &AnalyzeArgs, dir: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_file(args.config.as_deref(), dir)? {
            figment = figment.merge(Json::file(path));
        }

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(FlagOverrides::from(args)));

        let config: Self = figment.extract().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms".to_string(),
                value: "0".to_string(),
                hint: "Use a positive number of milliseconds".to_string(),
            }
            .into());
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                value: "0".to_string(),
                hint: "At least one file must be analyzed at a time".to_string(),
            }
            .into());
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extensions".to_string(),
                value: "[]".to_string(),
                hint: "List source extensions without the leading dot, e.g. [\"js\"]".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Engine options for this configuration.
    pub fn to_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            probe_mode: self.probe.into(),
            timeout: Duration::from_millis(self.timeout_ms),
            raw: self.raw,
            reduce: self.reduce,
            npm_enabled: self.npm,
            require_installed: self.require_installed,
            strict_resolution: self.strict,
            scripts: self.scripts.clone(),
            extensions: self
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            concurrency: self.concurrency,
            node_binary: self.node_binary.clone(),
            file_filter: None,
        }
    }
}

fn config_file(explicit: Option<&Path>, dir: &Path) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(ConfigError::NotFound(path.to_path_buf()).into()),
        None => {
            let default_path = dir.join(CONFIG_FILE);
            Ok(default_path.is_file().then_some(default_path))
        }
    }
}
