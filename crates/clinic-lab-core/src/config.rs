//! Layered configuration.
//!
//! Values come from defaults, then an optional file, then environment
//! variables prefixed `CLINIC_LAB` (e.g. `CLINIC_LAB__DATABASE__PATH`).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

const ENV_PREFIX: &str = "CLINIC_LAB";
const ENV_SEPARATOR: &str = "__";

/// Complete configuration of the lab core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Where results are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: String,
    /// Ignore `path` and keep everything in memory
    pub in_memory: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "clinic-lab.db".into(),
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info` or `clinic_lab_core=debug`
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            format: LogFormat::default(),
        }
    }
}

impl LabConfig {
    /// Load configuration from an optional file plus the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Load with an explicit environment map instead of the process environment.
    pub fn load_from(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = LabConfig::default();
        let mut builder = Config::builder()
            .set_default("database.path", defaults.database.path)?
            .set_default("database.in_memory", defaults.database.in_memory)?
            .set_default("logging.filter", defaults.logging.filter)?
            .set_default("logging.format", "compact")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: LabConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        tracing::debug!(
            in_memory = config.database.in_memory,
            format = ?config.logging.format,
            "Configuration loaded"
        );
        Ok(config)
    }
}
