//! Configuration for the sluice binary
//!
//! Sources, later ones winning: `sluice.toml` in the working directory (if
//! present), the file given with `--config`, then `SLUICE__*` environment
//! variables (`SLUICE__RUNTIME__MAX_WALK_STEPS=50`).

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use sluice_core::RuntimeConfig;
use sluice_monitoring::MonitoringConfig;
use std::path::Path;

/// Everything the binary can be configured with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine settings
    pub runtime: RuntimeConfig,

    /// Logging settings
    pub monitoring: MonitoringConfig,

    /// `memory://` or `redis://host:port`
    pub cache_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            monitoring: MonitoringConfig::default(),
            cache_url: "memory://".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, an optional explicit file
    /// and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::with_name("sluice").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix("SLUICE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
