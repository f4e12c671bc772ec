//! Configuration for agency-topology
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! `AGENCY_TOPO_*` environment variables (`__` separates nested keys, e.g.
//! `AGENCY_TOPO_AGENCY__ENDPOINT`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::common::Result;
use crate::target::WriteMode;

const ENV_PREFIX: &str = "AGENCY_TOPO";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Agency connection settings
    #[serde(default)]
    pub agency: AgencyConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agency: AgencyConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Agency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyConfig {
    /// Base URL of the agency REST endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Root of the target topology namespace
    #[serde(default = "default_root")]
    pub root: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Issue pairing changes as compare-and-swap operations
    #[serde(default)]
    pub guarded_writes: bool,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:4001".to_string()
}
fn default_root() -> String {
    "Target".to_string()
}
fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            root: default_root(),
            timeout_ms: default_timeout_ms(),
            guarded_writes: false,
        }
    }
}

impl AgencyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.guarded_writes {
            WriteMode::Guarded
        } else {
            WriteMode::Plain
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
