//! Configuration management for the EnvData SDK
//!
//! This module provides utilities for loading and validating client
//! configuration, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::{Debug, Display};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::resilience::RecoveryConfig;
use crate::util::parse_duration;

type Result<T> = std::result::Result<T, ConfigError>;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.parse::<i64>().map_err(|e| ConfigError::invalid(key, e))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(key, format!("not a boolean: {}", value))),
        }
    }

    /// Get a duration such as `30s`, `500ms` or `2m`
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        parse_duration(&value)
            .ok_or_else(|| ConfigError::invalid(key, format!("not a duration: {}", value)))
    }

    /// Get an optional value; absent keys yield `None`, malformed ones still fail
    fn get_optional(&self, key: &str) -> Result<Option<String>> {
        match self.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::Missing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get a string configuration value, using `default` only when the key is absent
    fn get_string_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get_optional(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Get a non-negative count that fits `T`, using `default` only when the key is absent
    fn get_count_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: TryFrom<i64>,
        T::Error: Display,
    {
        match self.get_int(key) {
            Ok(value) => T::try_from(value).map_err(|e| ConfigError::invalid(key, e)),
            Err(ConfigError::Missing(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Get a duration, using `default` only when the key is absent
    fn get_duration_or(&self, key: &str, default: Duration) -> Result<Duration> {
        match self.get_duration(key) {
            Err(ConfigError::Missing(_)) => Ok(default),
            other => other,
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => ConfigError::Missing(env_key.clone()),
            env::VarError::NotUnicode(_) => ConfigError::invalid(&env_key, "not valid unicode"),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        for provider in &self.providers {
            match provider.get_string(key) {
                Ok(value) => return Ok(value),
                Err(ConfigError::Missing(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(ConfigError::Missing(key.to_string()))
    }
}

/// Global default configuration provider (`ENVDATA_*` variables)
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("ENVDATA")));

/// Deployment environment; production enables monitoring forwarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::invalid("environment", format!("unknown environment: {}", other))),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL, without trailing slash
    pub base_url: String,

    /// API key sent as `X-API-Key`
    pub api_key: Option<String>,

    /// Per-attempt timeout
    pub timeout: Duration,

    /// Attempts for GET requests
    pub max_attempts: u32,

    pub environment: Environment,

    /// Where production error logs are forwarded
    pub monitoring_endpoint: Option<String>,

    /// In-memory log ring buffer capacity
    pub log_capacity: usize,

    /// Number of recent log entries persisted on flush (development only)
    pub persisted_log_limit: usize,

    /// Directory for persistent key-value storage; in-memory when unset
    pub storage_dir: Option<PathBuf>,

    pub user_agent: String,

    pub recovery: RecoveryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            environment: Environment::Development,
            monitoring_endpoint: None,
            log_capacity: 1000,
            persisted_log_limit: 100,
            storage_dir: None,
            user_agent: format!("envdata-sdk/{}", env!("CARGO_PKG_VERSION")),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a config provider, falling back to defaults for absent keys.
    ///
    /// Present but malformed values are errors, never replaced by the default.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let recovery_defaults = &defaults.recovery;

        let environment = match provider.get_optional("environment")? {
            Some(value) => value.parse()?,
            None => defaults.environment,
        };

        let recovery = RecoveryConfig {
            network_retry_delay: provider
                .get_duration_or("network_retry_delay", recovery_defaults.network_retry_delay)?,
            network_max_attempts: provider
                .get_count_or("network_max_attempts", recovery_defaults.network_max_attempts)?,
            rate_limit_delay: provider
                .get_duration_or("rate_limit_delay", recovery_defaults.rate_limit_delay)?,
            redirect_delay: provider.get_duration_or("redirect_delay", recovery_defaults.redirect_delay)?,
            login_path: provider.get_string_or("login_path", &recovery_defaults.login_path)?,
            safe_default_path: provider
                .get_string_or("safe_default_path", &recovery_defaults.safe_default_path)?,
        };

        let config = Self {
            base_url: provider
                .get_string_or("api_url", &defaults.base_url)?
                .trim_end_matches('/')
                .to_string(),
            api_key: provider.get_optional("api_key")?,
            timeout: provider.get_duration_or("timeout", defaults.timeout)?,
            max_attempts: provider.get_count_or("max_attempts", defaults.max_attempts)?,
            environment,
            monitoring_endpoint: provider.get_optional("monitoring_endpoint")?,
            log_capacity: provider.get_count_or("log_capacity", defaults.log_capacity)?,
            persisted_log_limit: provider.get_count_or("persisted_log_limit", defaults.persisted_log_limit)?,
            storage_dir: provider.get_optional("storage_dir")?.map(PathBuf::from),
            user_agent: provider.get_string_or("user_agent", &defaults.user_agent)?,
            recovery,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("api_url", e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::invalid("api_url", "scheme must be http or https"));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout", "must be greater than zero"));
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }

        if self.recovery.network_max_attempts == 0 {
            return Err(ConfigError::invalid("network_max_attempts", "must be at least 1"));
        }

        if self.log_capacity == 0 {
            return Err(ConfigError::invalid("log_capacity", "must be at least 1"));
        }

        if matches!(self.api_key.as_deref(), Some("")) {
            return Err(ConfigError::invalid("api_key", "must not be empty when set"));
        }

        if !self.recovery.login_path.starts_with('/') {
            return Err(ConfigError::invalid("login_path", "must start with '/'"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("key1", "value1");
        provider.set("key2", "123");

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_int("key2").unwrap(), 123);
        assert!(matches!(provider.get_string("key3"), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_env_config_provider_key_format() {
        let provider = EnvConfigProvider::new().with_prefix("ENVDATA");

        assert_eq!(provider.format_key("api_key"), "ENVDATA_API_KEY");
        assert_eq!(provider.format_key("api-url"), "ENVDATA_API_URL");
    }

    #[test]
    fn test_composite_config_provider() {
        let mut mem1 = MemoryConfigProvider::new();
        mem1.set("key1", "value1");

        let mut mem2 = MemoryConfigProvider::new();
        mem2.set("key1", "shadowed");
        mem2.set("key2", "value2");

        let mut provider = CompositeConfigProvider::new();
        provider.add_provider(mem1);
        provider.add_provider(mem2);

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_string("key2").unwrap(), "value2");
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_client_config_from_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("api_url", "https://api.example.com/");
        provider.set("api_key", "k1");
        provider.set("timeout", "10s");
        provider.set("max_attempts", "5");
        provider.set("environment", "production");
        provider.set("rate_limit_delay", "250ms");

        let config = ClientConfig::from_provider(&provider).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.api_key.as_deref(), Some("k1"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.recovery.rate_limit_delay, Duration::from_millis(250));
        assert_eq!(config.recovery.network_retry_delay, Duration::from_millis(2000));
        assert_eq!(config.log_capacity, 1000);
    }

    #[test]
    fn test_client_config_validation() {
        let config = ClientConfig {
            base_url: "ftp://example.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            api_key: Some(String::new()),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let mut provider = MemoryConfigProvider::new();
        provider.set("environment", "staging");
        assert!(ClientConfig::from_provider(&provider).is_err());

        assert!(ClientConfig::default().validate().is_ok());
    }

    fn load_with(key: &str, value: &str) -> Result<ClientConfig> {
        let mut provider = MemoryConfigProvider::new();
        provider.set(key, value);
        ClientConfig::from_provider(&provider)
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(matches!(
            load_with("timeout", "thirty seconds"),
            Err(ConfigError::Invalid { ref key, .. }) if key == "timeout"
        ));
        assert!(matches!(
            load_with("max_attempts", "three"),
            Err(ConfigError::Invalid { ref key, .. }) if key == "max_attempts"
        ));
        assert!(load_with("network_retry_delay", "soon").is_err());
        assert!(load_with("log_capacity", "lots").is_err());
    }

    #[test]
    fn test_out_of_range_counts_are_rejected() {
        assert!(load_with("max_attempts", "0").is_err());
        assert!(load_with("max_attempts", "4294967297").is_err());
        assert!(load_with("max_attempts", "-1").is_err());
        assert!(load_with("network_max_attempts", "0").is_err());
        assert!(load_with("log_capacity", "0").is_err());
        assert!(load_with("persisted_log_limit", "-5").is_err());

        assert_eq!(load_with("max_attempts", "1").unwrap().max_attempts, 1);
        assert_eq!(load_with("persisted_log_limit", "0").unwrap().persisted_log_limit, 0);
    }
}
