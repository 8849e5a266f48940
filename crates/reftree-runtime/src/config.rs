//! Configuration management for reftree resolvers.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use reftree_runtime::config::ReftreeConfig;
//!
//! // Load from file with env overrides
//! let config = ReftreeConfig::load("reftree.yaml")?;
//!
//! // Or load from environment only
//! let config = ReftreeConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use reftree_domain::{FailedIdScope, ResolverConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix: `REFTREE_RESOLVER__DEDUP_IN_FLIGHT=false`.
const ENV_PREFIX: &str = "REFTREE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ReftreeConfig {
    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Resolver behaviour settings.
///
/// These settings can be overridden via environment variables with the
/// `REFTREE_` prefix and `__` as the nested key separator:
///
/// - `REFTREE_RESOLVER__DEDUP_IN_FLIGHT=false` - Fetch per branch even when
///   another branch is already fetching the same id
/// - `REFTREE_RESOLVER__MAX_CONCURRENT_FETCHES=8` - Per-node fan-out limit
/// - `REFTREE_RESOLVER__FAILED_ID_SCOPE=per_entity_type` - Key failed ids
///   by entity type
///
/// # Example YAML Configuration
///
/// ```yaml
/// resolver:
///   dedup_in_flight: true
///   max_concurrent_fetches: 32
///   failed_id_scope: global
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResolverSettings {
    /// Share in-flight fetches between concurrent branches.
    #[serde(default = "default_true")]
    pub dedup_in_flight: bool,

    /// Maximum per-id calls in flight for one non-batch node.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// `global` or `per_entity_type`; any other value fails deserialization.
    #[serde(default)]
    pub failed_id_scope: FailedIdScope,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            dedup_in_flight: true,
            max_concurrent_fetches: default_max_concurrent_fetches(),
            failed_id_scope: FailedIdScope::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_fetches() -> usize {
    ResolverConfig::default().max_concurrent_fetches
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,

    /// Log span enter/exit events
    #[serde(default)]
    pub spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            spans: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Describe resolver counters to the installed `metrics` recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ReftreeConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `REFTREE_` and use `__` as separator.
    /// For example:
    /// - `REFTREE_RESOLVER__MAX_CONCURRENT_FETCHES=8` overrides `resolver.max_concurrent_fetches`
    /// - `REFTREE_LOGGING__LEVEL=debug` overrides `logging.level`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ReftreeConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let reftree_config: ReftreeConfig = config.try_deserialize()?;
        reftree_config.validate()?;

        Ok(reftree_config)
    }

    /// Load configuration from environment variables only.
    ///
    /// Uses default values and allows overrides via REFTREE_ prefixed env vars.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ReftreeConfig::default())?)
            .add_source(env_source())
            .build()?;

        let reftree_config: ReftreeConfig = config.try_deserialize()?;
        reftree_config.validate()?;

        Ok(reftree_config)
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.resolver.max_concurrent_fetches == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "resolver.max_concurrent_fetches must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }

    /// The domain resolver configuration these settings describe.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_dedup_in_flight(self.resolver.dedup_in_flight)
            .with_max_concurrent_fetches(self.resolver.max_concurrent_fetches)
            .with_failed_id_scope(self.resolver.failed_id_scope)
    }
}

/// Use __ as separator for nested keys: REFTREE_LOGGING__LEVEL -> logging.level
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
resolver:
  dedup_in_flight: false
  max_concurrent_fetches: 8
  failed_id_scope: per_entity_type

logging:
  level: debug
  json: true
  spans: true

metrics:
  enabled: false
"#
        )
        .unwrap();

        let config = ReftreeConfig::load(file.path()).unwrap();

        assert!(!config.resolver.dedup_in_flight);
        assert_eq!(config.resolver.max_concurrent_fetches, 8);
        assert_eq!(config.resolver.failed_id_scope, FailedIdScope::PerEntityType);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.logging.spans);
        assert!(!config.metrics.enabled);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
resolver:
  max_concurrent_fetches: 8

logging:
  level: info
"#
        )
        .unwrap();

        std::env::set_var("REFTREE_RESOLVER__MAX_CONCURRENT_FETCHES", "64");
        std::env::set_var("REFTREE_LOGGING__LEVEL", "warn");

        let config = ReftreeConfig::load(file.path());

        std::env::remove_var("REFTREE_RESOLVER__MAX_CONCURRENT_FETCHES");
        std::env::remove_var("REFTREE_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.resolver.max_concurrent_fetches, 64); // Overridden by env
        assert!(config.resolver.dedup_in_flight); // Default
        assert_eq!(config.logging.level, "warn"); // Overridden by env
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = ReftreeConfig::default();
        config.resolver.max_concurrent_fetches = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrent_fetches"));

        let mut config = ReftreeConfig::default();
        config.logging.level = "invalid".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        let mut config = ReftreeConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok(), "log level is case-insensitive");
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ReftreeConfig::load("/nonexistent/path/reftree.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let err = ReftreeConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    /// Test: Unknown failed id scope is rejected while loading
    #[test]
    #[serial]
    fn test_unknown_failed_id_scope_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
resolver:
  failed_id_scope: per_tenant
"#
        )
        .unwrap();

        let err = ReftreeConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = ReftreeConfig::default();
        assert!(config.validate().is_ok());

        assert!(config.resolver.dedup_in_flight);
        assert_eq!(config.resolver.max_concurrent_fetches, 32);
        assert_eq!(config.resolver.failed_id_scope, FailedIdScope::Global);
        assert!(!config.logging.spans);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.metrics.enabled);
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("REFTREE_RESOLVER__FAILED_ID_SCOPE", "per_entity_type");

        let config = ReftreeConfig::from_env();

        std::env::remove_var("REFTREE_RESOLVER__FAILED_ID_SCOPE");

        let config = config.unwrap();
        assert_eq!(config.resolver.failed_id_scope, FailedIdScope::PerEntityType);
        assert_eq!(config.resolver.max_concurrent_fetches, 32); // default
    }

    #[test]
    fn test_resolver_config_maps_settings() {
        let mut config = ReftreeConfig::default();
        config.resolver.dedup_in_flight = false;
        config.resolver.max_concurrent_fetches = 4;
        config.resolver.failed_id_scope = FailedIdScope::PerEntityType;

        let resolver = config.resolver_config();

        assert_eq!(
            resolver,
            ResolverConfig::default()
                .with_dedup_in_flight(false)
                .with_max_concurrent_fetches(4)
                .with_failed_id_scope(FailedIdScope::PerEntityType)
        );
    }
}
