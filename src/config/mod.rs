//! Service settings.
//!
//! Settings are layered with the `config` crate, later sources winning:
//!
//! 1. `config/default.{toml,yaml,json}`
//! 2. `config/{ENV}` when the `ENV` variable is set
//! 3. `config/local`
//! 4. `SCANHUB__*` environment variables, `__` separating sections
//!    (`SCANHUB__SERVER__PORT=9090`)
//!
//! Every file is optional; an empty environment yields [`Settings::default`]
//! with no plugins.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::core::{PluginError, ScanType};
use crate::orchestrator::{OrchestratorConfig, RetryConfig, MAX_TIMEOUT_SECONDS};
use crate::plugins::{HttpPlugin, HttpPluginConfig};
use crate::registry::{PluginDescriptor, PluginRegistry};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading settings or building from them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("configuration source error: {0}")]
    Load(#[from] ::config::ConfigError),

    /// The settings were read but are not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A configured plugin client could not be created.
    #[error("plugin '{name}' could not be created: {source}")]
    Plugin {
        /// Plugin name.
        name: String,
        /// Underlying error.
        #[source]
        source: PluginError,
    },
}

impl ConfigError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }
}

/// Top-level service settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Health monitor cadence.
    pub health: HealthSettings,
    /// Scan defaults.
    pub scan: ScanSettings,
    /// Configured plugin services.
    pub plugins: Vec<PluginSettings>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Per-request timeout for API calls.
    pub request_timeout_seconds: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Health monitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    /// Seconds between probe rounds.
    pub interval_seconds: u64,
    /// Seconds a startup probe may take.
    pub probe_timeout_seconds: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            probe_timeout_seconds: 5,
        }
    }
}

/// Scan defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Job deadline when a request does not set one.
    pub default_timeout_seconds: u64,
    /// Fan-out bound when a request does not set one.
    pub default_max_concurrency: usize,
    /// Attempts per plugin call for recoverable errors.
    pub retry_attempts: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 300,
            default_max_concurrency: 4,
            retry_attempts: 1,
        }
    }
}

/// One plugin service.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Unique plugin name.
    pub name: String,
    /// Base URL.
    pub endpoint_url: String,
    /// Scan types the plugin serves.
    pub supported_scan_types: Vec<ScanType>,
    /// Health probe timeout.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_seconds: u64,
    /// Advertised per-request timeout.
    #[serde(default = "default_plugin_timeout")]
    pub timeout_seconds: u64,
    /// Advertised concurrency.
    #[serde(default = "default_plugin_concurrency")]
    pub max_concurrency: usize,
    /// Bearer token, if the service requires one.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Wrap the client in a circuit breaker.
    #[serde(default = "default_true")]
    pub circuit_breaker: bool,
}

impl fmt::Debug for PluginSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSettings")
            .field("name", &self.name)
            .field("endpoint_url", &self.endpoint_url)
            .field("supported_scan_types", &self.supported_scan_types)
            .field("health_timeout_seconds", &self.health_timeout_seconds)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_concurrency", &self.max_concurrency)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("circuit_breaker", &self.circuit_breaker)
            .finish()
    }
}

fn default_health_timeout() -> u64 {
    5
}

fn default_plugin_timeout() -> u64 {
    300
}

fn default_plugin_concurrency() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl PluginSettings {
    /// Returns the registry descriptor for this plugin.
    pub fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new(&self.name, &self.endpoint_url)
            .with_scan_types(self.supported_scan_types.iter().copied())
            .with_timeout_seconds(self.timeout_seconds)
            .with_max_concurrency(self.max_concurrency)
    }

    /// Returns the HTTP client configuration for this plugin.
    pub fn client_config(&self) -> HttpPluginConfig {
        let config = HttpPluginConfig::new(&self.name, &self.endpoint_url)
            .with_health_timeout(Duration::from_secs(self.health_timeout_seconds));
        match &self.api_key {
            Some(key) => config.with_api_key(key.as_str()),
            None => config,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("plugin name must not be empty"));
        }
        if !(self.endpoint_url.starts_with("http://") || self.endpoint_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid(format!(
                "plugin '{}': endpoint_url must be an http(s) URL",
                self.name
            )));
        }
        if self.supported_scan_types.is_empty() {
            return Err(ConfigError::invalid(format!(
                "plugin '{}': supported_scan_types must not be empty",
                self.name
            )));
        }
        if self.health_timeout_seconds == 0 || self.timeout_seconds == 0 {
            return Err(ConfigError::invalid(format!(
                "plugin '{}': timeouts must be greater than zero",
                self.name
            )));
        }
        Ok(())
    }
}

impl Settings {
    /// Loads and validates settings from files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::File::with_name("config/default").required(false));

        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(::config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder = builder
            .add_source(::config::File::with_name("config/local").required(false))
            .add_source(::config::Environment::with_prefix("SCANHUB").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses and validates settings from a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let settings: Settings = ::config::Config::builder()
            .add_source(::config::File::from_str(source, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port must not be 0"));
        }
        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_seconds must be greater than zero",
            ));
        }
        if self.health.interval_seconds == 0 || self.health.probe_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "health intervals must be greater than zero",
            ));
        }
        if self.scan.default_timeout_seconds == 0
            || self.scan.default_timeout_seconds > MAX_TIMEOUT_SECONDS
        {
            return Err(ConfigError::invalid(format!(
                "scan.default_timeout_seconds must be between 1 and {}",
                MAX_TIMEOUT_SECONDS
            )));
        }

        let mut names = HashSet::new();
        for plugin in &self.plugins {
            plugin.validate()?;
            if !names.insert(plugin.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate plugin name '{}'",
                    plugin.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the orchestrator configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_default_timeout_seconds(self.scan.default_timeout_seconds)
            .with_default_max_concurrency(self.scan.default_max_concurrency)
            .with_retry(RetryConfig::new().with_max_attempts(self.scan.retry_attempts))
    }

    /// Creates a registry holding an HTTP client per configured plugin.
    ///
    /// Plugins start with unknown health and are not dispatched to until a
    /// probe has marked them healthy.
    pub fn build_registry(&self) -> Result<PluginRegistry, ConfigError> {
        let registry = PluginRegistry::new();

        for plugin in &self.plugins {
            let client = HttpPlugin::new(plugin.client_config()).map_err(|source| {
                ConfigError::Plugin {
                    name: plugin.name.clone(),
                    source,
                }
            })?;

            if plugin.circuit_breaker {
                registry.register_plugin(
                    plugin.descriptor(),
                    CircuitBreaker::new(client, CircuitBreakerConfig::default()),
                );
            } else {
                registry.register_plugin(plugin.descriptor(), client);
            }
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HealthStatus;

    const SAMPLE: &str = r#"
        [server]
        port = 9090

        [logging]
        json = true

        [scan]
        default_timeout_seconds = 120
        retry_attempts = 2

        [[plugins]]
        name = "slither"
        endpoint_url = "http://slither:8080"
        supported_scan_types = ["static"]

        [[plugins]]
        name = "mythx"
        endpoint_url = "https://api.mythx.io"
        supported_scan_types = ["full"]
        api_key = "secret-token"
        circuit_breaker = false
    "#;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server.port, 8080);
        assert!(settings.plugins.is_empty());
    }

    #[test]
    fn test_from_toml() {
        let settings = Settings::from_toml(SAMPLE).unwrap();

        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert!(settings.logging.json);
        assert_eq!(settings.scan.default_timeout_seconds, 120);
        assert_eq!(settings.scan.default_max_concurrency, 4);
        assert_eq!(settings.plugins.len(), 2);
        assert_eq!(settings.plugins[0].timeout_seconds, 300);
        assert!(settings.plugins[0].circuit_breaker);
        assert_eq!(settings.plugins[1].api_key.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_api_key_is_redacted() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        let debug = format!("{:?}", settings.plugins[1]);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_orchestrator_config() {
        let config = Settings::from_toml(SAMPLE).unwrap().orchestrator_config();
        assert_eq!(config.default_timeout_seconds, 120);
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn test_rejects_duplicate_plugins() {
        let source = r#"
            [[plugins]]
            name = "slither"
            endpoint_url = "http://a:8080"
            supported_scan_types = ["static"]

            [[plugins]]
            name = "slither"
            endpoint_url = "http://b:8080"
            supported_scan_types = ["static"]
        "#;
        assert!(matches!(
            Settings::from_toml(source),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let source = r#"
            [[plugins]]
            name = "slither"
            endpoint_url = "slither:8080"
            supported_scan_types = ["static"]
        "#;
        assert!(matches!(
            Settings::from_toml(source),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_default_timeout() {
        let source = r#"
            [scan]
            default_timeout_seconds = 1000000000
        "#;
        assert!(matches!(
            Settings::from_toml(source),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_scan_type() {
        let source = r#"
            [[plugins]]
            name = "slither"
            endpoint_url = "http://slither:8080"
            supported_scan_types = ["magic"]
        "#;
        assert!(matches!(Settings::from_toml(source), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_build_registry() {
        let registry = Settings::from_toml(SAMPLE).unwrap().build_registry().unwrap();

        assert_eq!(registry.len(), 2);
        let slither = registry.get("slither").unwrap();
        assert_eq!(slither.health_status, HealthStatus::Unknown);
        assert!(slither.supports(ScanType::Static));
        assert!(registry.get("mythx").unwrap().supports(ScanType::Fuzzing));
    }
}
