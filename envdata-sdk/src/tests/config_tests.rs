//! Tests for configuration management functionality
//!
//! These tests verify that client configuration is loaded correctly from
//! layered providers and environment variables.

#[cfg(test)]
mod tests {
    use std::env;
    use std::time::Duration;

    use crate::config::{
        ClientConfig, CompositeConfigProvider, ConfigProvider, ConfigProviderExt, EnvConfigProvider, Environment,
        MemoryConfigProvider,
    };
    use crate::core::ClientBuilder;
    use crate::logging::{LogLevel, LoggerConfig};

    #[test]
    fn test_env_config_provider() {
        env::set_var("ENVDATA_TEST_CFG_API_URL", "https://api.example.com");
        env::set_var("ENVDATA_TEST_CFG_TIMEOUT", "15s");
        env::set_var("ENVDATA_TEST_CFG_NETWORK_RETRY_DELAY", "250ms");

        let provider = EnvConfigProvider::new().with_prefix("ENVDATA_TEST_CFG");

        assert_eq!(provider.get_string("api_url").unwrap(), "https://api.example.com");
        assert_eq!(provider.get_duration("timeout").unwrap(), Duration::from_secs(15));

        let config = ClientConfig::from_provider(&provider).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.recovery.network_retry_delay, Duration::from_millis(250));

        env::remove_var("ENVDATA_TEST_CFG_API_URL");
        env::remove_var("ENVDATA_TEST_CFG_TIMEOUT");
        env::remove_var("ENVDATA_TEST_CFG_NETWORK_RETRY_DELAY");
    }

    #[test]
    fn test_composite_overrides_file_defaults() {
        let mut overrides = MemoryConfigProvider::new();
        overrides.set("max_attempts", "2");

        let mut defaults = MemoryConfigProvider::new();
        defaults.set("max_attempts", "4");
        defaults.set("login_path", "/signin");
        defaults.set("environment", "prod");

        let mut provider = CompositeConfigProvider::new();
        provider.add_provider(overrides);
        provider.add_provider(defaults);

        let config = ClientConfig::from_provider(&provider).unwrap();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.recovery.login_path, "/signin");
        assert_eq!(config.environment, Environment::Production);

        let logger_config = LoggerConfig::from(&config);
        assert_eq!(logger_config.min_level, LogLevel::Info);
    }

    #[test]
    fn test_builder_from_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("api_url", "https://api.example.com");
        provider.set("api_key", "k1");

        let client = ClientBuilder::from_provider(&provider)
            .unwrap()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(client.config().api_key.as_deref(), Some("k1"));
        assert_eq!(client.config().timeout, Duration::from_secs(3));

        let mut bad = MemoryConfigProvider::new();
        bad.set("login_path", "signin");
        assert!(ClientBuilder::from_provider(&bad).is_err());
    }
}
