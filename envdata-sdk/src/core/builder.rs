//! Client builder implementation
//!
//! Provides the builder pattern for creating and configuring an `ApiClient`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client as ReqwestClient;

use crate::client::{ApiClient, Navigator, NoopNavigator};
use crate::config::{ClientConfig, ConfigProvider};
use crate::context::ClientContext;
use crate::error::ConfigError;
use crate::logging::MonitoringSink;
use crate::resilience::RecoveryConfig;
use crate::session::storage::KeyValueStorage;

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ClientBuilder {
    /// Starting configuration; defaults when unset
    config: Option<ClientConfig>,

    base_url: Option<String>,

    api_key: Option<String>,

    /// Per-attempt timeout
    timeout: Option<Duration>,

    /// Attempts for GET requests
    max_attempts: Option<u32>,

    /// Headers sent with every request
    custom_headers: HashMap<String, String>,

    user_agent: Option<String>,

    recovery: Option<RecoveryConfig>,

    storage: Option<Arc<dyn KeyValueStorage>>,

    monitor: Option<Arc<dyn MonitoringSink>>,

    navigator: Option<Arc<dyn Navigator>>,

    /// Share session and logs with other clients
    context: Option<Arc<ClientContext>>,
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Start from configuration read through `provider`
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self, ConfigError> {
        Ok(Self::new().config(ClientConfig::from_provider(provider)?))
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// API key sent as `X-API-Key`
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Add a header sent with every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(key.into(), value.into());
        self
    }

    /// Per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attempts for GET requests
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Recovery delays and redirect paths
    pub fn recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.recovery = Some(recovery);
        self
    }

    /// Key-value storage for the session and logs
    pub fn storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Target for production error logs
    pub fn monitoring(mut self, monitor: Arc<dyn MonitoringSink>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Reuse an existing context; `storage` and `monitoring` are ignored
    pub fn context(mut self, context: Arc<ClientContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Resolve the final configuration
    pub fn build_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = self.config.clone().unwrap_or_default();

        if let Some(ref url) = self.base_url {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ref key) = self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(ref user_agent) = self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if let Some(ref recovery) = self.recovery {
            config.recovery = recovery.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Build an HTTP client with the configured settings.
    ///
    /// No client-level timeout is set; the executor bounds each attempt.
    pub fn build_http_client(&self, config: &ClientConfig) -> Result<ReqwestClient, ConfigError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.custom_headers {
            let header_name = HeaderName::from_str(key)
                .map_err(|e| ConfigError::invalid("headers", format!("Invalid header name: {}", e)))?;

            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::invalid("headers", format!("Invalid header value: {}", e)))?;

            headers.insert(header_name, header_value);
        }

        ReqwestClient::builder()
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        let config = self.build_config()?;
        let http = self.build_http_client(&config)?;

        let context = match self.context {
            Some(context) => context,
            None => Arc::new(ClientContext::new(&config, self.storage, self.monitor)),
        };
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(NoopNavigator) as Arc<dyn Navigator>);

        Ok(ApiClient::from_parts(http, config, context, navigator))
    }
}
