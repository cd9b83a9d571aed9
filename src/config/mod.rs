//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables. Read once at
//! startup; nothing reconfigures a running aggregator.

mod services;

use std::time::Duration;

use serde::Deserialize;

use crate::breaker::BreakerSettings;

pub use services::{ServiceEndpoint, ServicesConfig};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "AGGREGATOR_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "AGGREGATOR";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "AGGREGATOR_LOG";

/// Default total scatter-gather budget.
pub const DEFAULT_BUDGET_MS: u64 = 1000;
/// Default extra time granted to re-observe outstanding calls after the budget.
pub const DEFAULT_SETTLE_GRACE_MS: u64 = 0;

/// Destinations that get a local events lookup.
pub const DEFAULT_COASTAL_LOCATIONS: [&str; 6] = ["CMB", "HMBT", "JFN", "TRINC", "GLL", "MTR"];

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid breaker settings for {dependency}: {reason}")]
    InvalidBreaker { dependency: String, reason: String },

    #[error("Invalid scatter settings: {0}")]
    InvalidScatter(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Downstream service endpoints.
    pub services: ServicesConfig,
    /// Scatter-gather time budget.
    pub scatter: ScatterConfig,
    /// Circuit breaker thresholds per protected dependency.
    pub breakers: BreakersConfig,
    /// Branch orchestration predicate.
    pub branch: BranchConfig,
}

/// Scatter-gather budget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    /// Total budget for one batch, in milliseconds.
    pub budget_ms: u64,
    /// After the budget expires, how long outstanding calls may still settle.
    pub settle_grace_ms: u64,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            budget_ms: DEFAULT_BUDGET_MS,
            settle_grace_ms: DEFAULT_SETTLE_GRACE_MS,
        }
    }
}

impl ScatterConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn settle_grace(&self) -> Duration {
        Duration::from_millis(self.settle_grace_ms)
    }
}

/// Breaker settings for protected dependencies.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BreakersConfig {
    pub weather: BreakerSettings,
}

/// Branch orchestration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
    /// Exact, case-sensitive destination codes that trigger the events call.
    pub coastal_locations: Vec<String>,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            coastal_locations: DEFAULT_COASTAL_LOCATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("branch.coastal_locations")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.breakers
            .weather
            .validate()
            .map_err(|reason| ConfigError::InvalidBreaker {
                dependency: "weather".to_string(),
                reason,
            })?;

        if self.scatter.budget_ms == 0 {
            return Err(ConfigError::InvalidScatter(
                "budget_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self::default()
    }
}
