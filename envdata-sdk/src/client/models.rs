//! EnvData API data models
//!
//! Request and response types for the named endpoints. Response types keep
//! unknown fields in `extra` so newer API versions do not break decoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::UserProfile;

/// Company environmental score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CevsScore {
    pub company: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cevs_score: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Credentials for `POST /v1/auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token issued on login or email verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    pub user: UserProfile,
}

/// New account details
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Registration acknowledgement; the session starts after verification
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Editable profile fields; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// API key metadata. `key` is only present in the creation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyInfo {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request usage for the current account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(default)]
    pub requests_today: u64,

    #[serde(default)]
    pub requests_this_month: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_limit: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Service health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}
