//! Configuration management for vobind components

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vobind_core::MultiValuePolicy;

/// Main configuration structure for vobind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VobindConfig {
    /// Request binding configuration
    pub binding: BindingConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Handling of query keys supplied more than once
    pub multi_value: MultiValuePolicy,

    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json or pretty)
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder
    pub enabled: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            multi_value: MultiValuePolicy::Reject,
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl VobindConfig {
    /// Load configuration from `vobind.toml` (if present) and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("vobind.toml")
    }

    /// Load configuration from a specific file; `VOBIND__*` variables override it
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&VobindConfig::default())?);

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        builder
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Load configuration from environment variables only
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&VobindConfig::default())?)
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("VOBIND")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
