//! Error handling for the EnvData SDK
//!
//! This module provides the error taxonomy used by the request pipeline:
//! - Raw failures, built explicitly where a request goes wrong
//! - Classified errors with a type, severity, machine code and a user-safe message
//! - The UI-facing error result returned by `ApiClient::error_result`
//! - Configuration errors raised while building clients

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod classification;

pub use classification::classify;

/// Result type for API calls made through the SDK
pub type Result<T> = std::result::Result<T, ClassifiedError>;

/// Machine codes carried by classified errors
pub mod codes {
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const AUTH_REQUIRED: &str = "AUTH_REQUIRED";
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const API_ERROR: &str = "API_ERROR";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
}

/// Category of a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// No HTTP response was obtained
    Network,
    /// The API rejected the credentials (401)
    Authentication,
    /// The caller lacks permission (403)
    Authorization,
    /// Input was rejected, locally or by the API (422)
    Validation,
    /// Any other HTTP failure
    Api,
    /// Anything the classifier could not place
    Unknown,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::Network => "network",
            ErrorType::Authentication => "authentication",
            ErrorType::Authorization => "authorization",
            ErrorType::Validation => "validation",
            ErrorType::Api => "api",
            ErrorType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Severity of a classified error, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A failure as observed at the point it happened, before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawFailure {
    /// The request never produced an HTTP response
    Network { message: String, timed_out: bool },

    /// The API answered with a non-success status
    Http { status: u16, body: Option<Value> },

    /// The caller's input was rejected before anything was sent
    Validation { message: String, field: Option<String> },

    /// Anything else (undecodable bodies, unexpected client errors)
    Other { message: String },
}

impl RawFailure {
    /// Create a network failure
    pub fn network(message: impl Into<String>) -> Self {
        RawFailure::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create a network failure caused by the per-attempt timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        RawFailure::Network {
            message: message.into(),
            timed_out: true,
        }
    }

    /// Create an HTTP failure
    pub fn http(status: u16, body: Option<Value>) -> Self {
        RawFailure::Http { status, body }
    }

    /// Create a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        RawFailure::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation failure for a specific field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        RawFailure::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unclassifiable failure
    pub fn other(message: impl Into<String>) -> Self {
        RawFailure::Other {
            message: message.into(),
        }
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawFailure::Network { message, timed_out: true } => write!(f, "timeout: {}", message),
            RawFailure::Network { message, .. } => write!(f, "network failure: {}", message),
            RawFailure::Http { status, .. } => write!(f, "HTTP status {}", status),
            RawFailure::Validation { message, field: Some(field) } => {
                write!(f, "invalid {}: {}", field, message)
            }
            RawFailure::Validation { message, .. } => write!(f, "invalid input: {}", message),
            RawFailure::Other { message } => f.write_str(message),
        }
    }
}

/// Convert reqwest errors to raw failures
impl From<reqwest::Error> for RawFailure {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return RawFailure::http(status.as_u16(), None);
        }

        if err.is_timeout() {
            RawFailure::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            RawFailure::network(format!("Connection error: {}", err))
        } else if err.is_redirect() {
            RawFailure::network(format!("Too many redirects: {}", err))
        } else if err.is_request() || err.is_body() {
            RawFailure::network(format!("Request failed: {}", err))
        } else if err.is_decode() {
            RawFailure::other(format!("Response decode error: {}", err))
        } else {
            RawFailure::other(format!("HTTP client error: {}", err))
        }
    }
}

/// Convert serde_json errors to raw failures
impl From<serde_json::Error> for RawFailure {
    fn from(err: serde_json::Error) -> Self {
        RawFailure::other(format!("JSON error: {}", err))
    }
}

/// A failure normalized into the SDK taxonomy
///
/// Built only by [`classify`]; the fields are read through accessors so a
/// classified error cannot change after construction.
#[derive(Error, Debug, Clone, Serialize)]
#[error("{error_type} error [{code}]: {message}")]
pub struct ClassifiedError {
    #[serde(rename = "type")]
    error_type: ErrorType,
    severity: Severity,
    code: String,
    message: String,
    user_message: String,
    status: Option<u16>,
    details: Option<Value>,
    cause: RawFailure,
    timestamp: DateTime<Utc>,
}

impl ClassifiedError {
    pub(crate) fn new(
        error_type: ErrorType,
        severity: Severity,
        code: &str,
        message: String,
        user_message: String,
        cause: RawFailure,
    ) -> Self {
        let (status, details) = match &cause {
            RawFailure::Http { status, body } => (Some(*status), body.clone()),
            _ => (None, None),
        };

        Self {
            error_type,
            severity,
            code: code.to_string(),
            message,
            user_message,
            status,
            details,
            cause,
            timestamp: Utc::now(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Machine code, e.g. `RATE_LIMITED`
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Internal description, suitable for logs only
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message safe to show to end users
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// HTTP status code if the API answered
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Parsed error body returned by the API, if any
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// The raw failure this error was classified from
    pub fn cause(&self) -> &RawFailure {
        &self.cause
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Uniform error object handed to UI code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    #[serde(rename = "type")]
    pub error_type: ErrorType,

    /// User-facing message
    pub message: String,

    pub code: String,

    pub severity: Severity,

    pub timestamp: DateTime<Utc>,

    /// Whether the UI may offer a retry affordance
    pub can_retry: bool,

    /// Suggested navigation target, if any
    pub redirect: Option<String>,
}

/// Errors raised while loading configuration or building clients
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key is absent
    #[error("Configuration key not found: {0}")]
    Missing(String),

    /// A key is present but its value cannot be used
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
