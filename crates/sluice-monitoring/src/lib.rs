//! Logging setup for Sluice processes.

use serde::{Deserialize, Serialize};

pub mod logging;

pub use logging::{init_logging, LogExt};

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Service name attached to the startup record
    pub service_name: String,

    /// Filter directives, used when `RUST_LOG` is unset
    pub log_filter: String,

    /// JSON on stderr instead of the pretty format
    pub json_logs: bool,

    /// Also write JSON logs to this file, rotated daily
    pub log_file: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "sluice".to_string(),
            log_filter: "info,sluice_core=debug".to_string(),
            json_logs: false,
            log_file: None,
        }
    }
}
