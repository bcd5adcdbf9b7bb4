//! Error classification
//!
//! Maps a [`RawFailure`] into a [`ClassifiedError`]. Classification is pure:
//! it never performs I/O and never panics.

use reqwest::StatusCode;
use serde_json::Value;

use super::{codes, ClassifiedError, ErrorType, RawFailure, Severity};

/// User-facing messages, kept free of backend internals
pub mod messages {
    pub const NETWORK: &str =
        "Unable to reach the server. Please check your connection and try again.";
    pub const TIMEOUT: &str = "The server took too long to respond. Please try again.";
    pub const AUTH_REQUIRED: &str = "Your session has expired. Please sign in again.";
    pub const ACCESS_DENIED: &str = "You do not have permission to perform this action.";
    pub const VALIDATION: &str = "Please check your input and try again.";
    pub const RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
    pub const SERVER_ERROR: &str = "The server encountered an error. Please try again later.";
    pub const API_ERROR: &str = "Something went wrong while processing your request.";
    pub const UNKNOWN: &str = "An unexpected error occurred.";
}

/// Classify a raw failure. First matching rule wins.
pub fn classify(raw: RawFailure) -> ClassifiedError {
    match &raw {
        RawFailure::Network { message, timed_out } => {
            let (code, user_message) = if *timed_out {
                (codes::TIMEOUT, messages::TIMEOUT)
            } else {
                (codes::NETWORK_ERROR, messages::NETWORK)
            };
            let message = message.clone();
            ClassifiedError::new(
                ErrorType::Network,
                Severity::High,
                code,
                message,
                user_message.to_string(),
                raw,
            )
        }
        RawFailure::Http { status, body } => {
            let status = *status;
            let body_message = body.as_ref().and_then(user_message_from_body);
            let internal = internal_http_message(status, body.as_ref());
            let (error_type, severity, code, user_message) = match status {
                401 => (
                    ErrorType::Authentication,
                    Severity::High,
                    codes::AUTH_REQUIRED,
                    messages::AUTH_REQUIRED.to_string(),
                ),
                403 => (
                    ErrorType::Authorization,
                    Severity::High,
                    codes::ACCESS_DENIED,
                    messages::ACCESS_DENIED.to_string(),
                ),
                422 => (
                    ErrorType::Validation,
                    Severity::Low,
                    codes::VALIDATION_ERROR,
                    body_message.unwrap_or_else(|| messages::VALIDATION.to_string()),
                ),
                429 => (
                    ErrorType::Api,
                    Severity::Medium,
                    codes::RATE_LIMITED,
                    messages::RATE_LIMITED.to_string(),
                ),
                500 | 502 | 503 | 504 => (
                    ErrorType::Api,
                    Severity::Critical,
                    codes::SERVER_ERROR,
                    messages::SERVER_ERROR.to_string(),
                ),
                _ => (
                    ErrorType::Api,
                    Severity::Medium,
                    codes::API_ERROR,
                    body_message.unwrap_or_else(|| messages::API_ERROR.to_string()),
                ),
            };
            ClassifiedError::new(error_type, severity, code, internal, user_message, raw)
        }
        RawFailure::Validation { message, field } => {
            let internal = match field {
                Some(field) => format!("Validation failed for {}: {}", field, message),
                None => format!("Validation failed: {}", message),
            };
            ClassifiedError::new(
                ErrorType::Validation,
                Severity::Low,
                codes::VALIDATION_ERROR,
                internal,
                messages::VALIDATION.to_string(),
                raw,
            )
        }
        RawFailure::Other { message } => {
            let message = message.clone();
            ClassifiedError::new(
                ErrorType::Unknown,
                Severity::Medium,
                codes::UNKNOWN_ERROR,
                message,
                messages::UNKNOWN.to_string(),
                raw,
            )
        }
    }
}

/// Extract an explicitly user-facing message from an API error body.
///
/// Accepts `message`, a string `detail`, or the first `detail[].msg` entry
/// of a validation error list. Anything else is ignored.
pub fn user_message_from_body(body: &Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return non_empty(message);
    }

    match body.get("detail") {
        Some(Value::String(detail)) => non_empty(detail),
        Some(Value::Array(items)) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .and_then(non_empty),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn internal_http_message(status: u16, body: Option<&Value>) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown status");

    match body {
        Some(body) => format!(
            "HTTP {} {}: {}",
            status,
            reason,
            crate::util::truncate_string(&body.to_string(), 200)
        ),
        None => format!("HTTP {} {}", status, reason),
    }
}

/// Helper function to name the category of an HTTP status for logs
pub fn classify_http_status(status: u16) -> &'static str {
    match status {
        401 => "authentication",
        403 => "authorization",
        422 => "validation",
        429 => "rate_limit",
        500 | 502 | 503 | 504 => "server",
        _ => "api",
    }
}
