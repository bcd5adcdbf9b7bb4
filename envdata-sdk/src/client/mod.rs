//! EnvData API client
//!
//! [`ApiClient`] runs every call through the same pipeline: header merge,
//! per-attempt timeout, classification of failures, recovery policy lookup
//! and bounded retries for GET requests. The named endpoint methods live in
//! `endpoints`.

mod endpoints;
mod executor;
mod models;
pub mod navigation;

pub use models::*;
pub use navigation::{Navigator, NoopNavigator, RecordingNavigator};

use std::fmt;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::context::ClientContext;
use crate::error::{ClassifiedError, ErrorResult};
use crate::logging::Logger;
use crate::resilience::RecoveryPolicy;
use crate::session::SessionStore;

/// Client for the EnvData REST API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    context: Arc<ClientContext>,
    policy: RecoveryPolicy,
    navigator: Arc<dyn Navigator>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("max_attempts", &self.config.max_attempts)
            .field("timeout", &self.config.timeout)
            .field("context", &self.context)
            .finish()
    }
}

impl ApiClient {
    pub(crate) fn from_parts(
        http: reqwest::Client,
        config: ClientConfig,
        context: Arc<ClientContext>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let policy = RecoveryPolicy::new(config.recovery.clone());
        Self {
            http,
            config,
            context,
            policy,
            navigator,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    pub fn logger(&self) -> &Arc<Logger> {
        self.context.logger()
    }

    pub fn session(&self) -> &SessionStore {
        self.context.session()
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// UI-facing summary of an error returned by this client
    pub fn error_result(&self, error: &ClassifiedError) -> ErrorResult {
        self.policy.error_result(error)
    }
}
