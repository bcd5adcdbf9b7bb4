//! Recovery policy for classified errors
//!
//! This module decides what the request pipeline does after a failure:
//! - Retry (with exponential backoff for network errors, fixed delay for rate limits)
//! - Redirect to login, clearing the session
//! - Surface the error to the UI

mod retry;

pub use retry::RetryState;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{codes, ClassifiedError, ErrorResult, ErrorType};

/// Remediation chosen for a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryAction {
    /// Try the request again after a delay
    Retry,

    /// Clear the session and send the user to the login page
    RedirectToLogin,

    /// Let the calling UI render the error
    ShowError,
}

/// What to do about one classified error
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPlan {
    pub action: RecoveryAction,

    /// Total attempts allowed for this kind of failure within one call
    pub max_attempts: Option<u32>,

    /// Delay before the next attempt (base delay when `backoff` is set)
    pub delay: Option<Duration>,

    /// Double the delay on each successive retry
    pub backoff: bool,

    /// Clear the stored session
    pub clear_session: bool,

    /// Navigation target, automatic for `RedirectToLogin`, advisory otherwise
    pub redirect_path: Option<String>,
}

impl RecoveryPlan {
    fn show_error() -> Self {
        Self {
            action: RecoveryAction::ShowError,
            max_attempts: None,
            delay: None,
            backoff: false,
            clear_session: false,
            redirect_path: None,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.action == RecoveryAction::Retry
    }
}

/// Tunable delays and paths used by the recovery policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Base delay for network retries
    pub network_retry_delay: Duration,

    /// Total attempts for network failures
    pub network_max_attempts: u32,

    /// Fixed delay before the single rate-limit retry
    pub rate_limit_delay: Duration,

    /// Pause before redirecting to login
    pub redirect_delay: Duration,

    /// Login page path
    pub login_path: String,

    /// Page suggested after an authorization failure
    pub safe_default_path: String,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            network_retry_delay: Duration::from_millis(2000),
            network_max_attempts: 3,
            rate_limit_delay: Duration::from_millis(5000),
            redirect_delay: Duration::from_millis(1500),
            login_path: "/login".to_string(),
            safe_default_path: "/dashboard".to_string(),
        }
    }
}

/// Deterministic mapping from classified error to recovery plan
#[derive(Debug, Clone, Default)]
pub struct RecoveryPolicy {
    config: RecoveryConfig,
}

impl RecoveryPolicy {
    pub fn new(config: RecoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Look up the plan for an error
    pub fn policy_for(&self, error: &ClassifiedError) -> RecoveryPlan {
        match error.error_type() {
            ErrorType::Network => RecoveryPlan {
                action: RecoveryAction::Retry,
                max_attempts: Some(self.config.network_max_attempts),
                delay: Some(self.config.network_retry_delay),
                backoff: true,
                ..RecoveryPlan::show_error()
            },
            ErrorType::Authentication => RecoveryPlan {
                action: RecoveryAction::RedirectToLogin,
                delay: Some(self.config.redirect_delay),
                clear_session: true,
                redirect_path: Some(self.config.login_path.clone()),
                ..RecoveryPlan::show_error()
            },
            ErrorType::Authorization => RecoveryPlan {
                redirect_path: Some(self.config.safe_default_path.clone()),
                ..RecoveryPlan::show_error()
            },
            ErrorType::Api if error.code() == codes::RATE_LIMITED => RecoveryPlan {
                action: RecoveryAction::Retry,
                max_attempts: Some(2),
                delay: Some(self.config.rate_limit_delay),
                backoff: false,
                ..RecoveryPlan::show_error()
            },
            ErrorType::Api | ErrorType::Validation | ErrorType::Unknown => {
                RecoveryPlan::show_error()
            }
        }
    }

    /// Whether the UI may offer a retry for this error
    pub fn can_retry(&self, error: &ClassifiedError) -> bool {
        self.policy_for(error).is_retry() || error.code() == codes::SERVER_ERROR
    }

    /// Build the uniform UI error object
    pub fn error_result(&self, error: &ClassifiedError) -> ErrorResult {
        ErrorResult {
            error_type: error.error_type(),
            message: error.user_message().to_string(),
            code: error.code().to_string(),
            severity: error.severity(),
            timestamp: error.timestamp(),
            can_retry: self.can_retry(error),
            redirect: self.policy_for(error).redirect_path,
        }
    }
}
