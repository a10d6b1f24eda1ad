//! Configuration for the standard address space controller.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet_model::StandardSchema;

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address space whose addresses are reconciled.
    pub address_space: String,

    /// Time between reconcile passes.
    pub reconcile_interval: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub log_json: bool,

    /// Path to a JSON `StandardSchema`.
    pub schema_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address_space: "default".to_string(),
            reconcile_interval: Duration::from_secs(30),
            log_level: "info".to_string(),
            log_json: true,
            schema_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let address_space = lookup("FLEET_ADDRESS_SPACE").unwrap_or(defaults.address_space);

        let reconcile_interval = match lookup("FLEET_RECONCILE_INTERVAL_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .parse()
                    .with_context(|| format!("invalid FLEET_RECONCILE_INTERVAL_SECS: {value}"))?,
            ),
            None => defaults.reconcile_interval,
        };

        let log_level = lookup("FLEET_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_json = lookup("FLEET_LOG_JSON")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(defaults.log_json);

        let schema_path = lookup("FLEET_SCHEMA_PATH").map(PathBuf::from);

        Ok(Self {
            address_space,
            reconcile_interval,
            log_level,
            log_json,
            schema_path,
        })
    }

    /// Load the schema named by `schema_path`, if any.
    pub fn load_schema(&self) -> Result<Option<StandardSchema>> {
        self.schema_path
            .as_ref()
            .map(|path| {
                StandardSchema::from_path(path)
                    .with_context(|| format!("failed to load schema from {}", path.display()))
            })
            .transpose()
    }
}
