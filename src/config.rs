use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::upstream::alias::{AliasRule, AliasTable};
use crate::upstream::error::{AliasError, SummaryError};
use crate::upstream::summary::SummaryTemplate;

// =============================================================================
// Fetch-related constants
// =============================================================================

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// User agent sent with every upstream request
pub const DEFAULT_USER_AGENT: &str = "upstream-check";

/// Tera template of the summary handed to the report sink for outdated packages
pub const DEFAULT_SUMMARY_TEMPLATE: &str = "{{ name }}-{{ latest_upstream }} is available";

/// File name of the JSON log inside the data directory
const LOG_FILE_NAME: &str = "upstream-check.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid alias table: {0}")]
    Alias(#[from] AliasError),

    #[error("Invalid report.summaryTemplate: {0}")]
    Summary(#[from] SummaryError),
}

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckConfig {
    pub fetch: FetchConfig,
    pub report: ReportConfig,
    /// Extra alias rules, replacing built-in rules with the same key
    pub aliases: IndexMap<String, AliasRule>,
}

/// Fetch-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchConfig {
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: FETCH_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Reporting configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportConfig {
    /// Tera template rendered for every outdated package
    pub summary_template: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            summary_template: DEFAULT_SUMMARY_TEMPLATE.to_string(),
        }
    }
}

impl CheckConfig {
    /// Read a JSON config file; a missing file yields the defaults.
    ///
    /// The summary template is parsed here so a broken template fails the run
    /// before any package is checked.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.summary_template()?;
        Ok(config)
    }

    /// Parsed `report.summaryTemplate`
    pub fn summary_template(&self) -> Result<SummaryTemplate, ConfigError> {
        Ok(SummaryTemplate::new(&self.report.summary_template)?)
    }

    /// Built-in alias table with the configured rules merged over it
    pub fn alias_table(&self) -> Result<AliasTable, ConfigError> {
        Ok(AliasTable::builtin().with_overrides(self.aliases.clone())?)
    }
}

/// Default JSON log file: `upstream-check.log` under `$XDG_DATA_HOME/upstream-check`,
/// `~/.local/share/upstream-check` or `./upstream-check`, whichever is available first.
pub fn log_path() -> PathBuf {
    log_path_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default config file path (`$XDG_CONFIG_HOME/upstream-check/config.json`).
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("upstream-check")
        .join("config.json")
}

fn log_path_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("upstream-check")
        .join(LOG_FILE_NAME)
}
