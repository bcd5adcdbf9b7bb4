//! # EnvData SDK
//!
//! A client for the EnvData environmental-data API.
//!
//! This crate provides:
//!
//! - A request pipeline with per-attempt timeouts and bounded GET retries
//! - Error classification into a fixed taxonomy with user-safe messages
//! - A recovery policy deciding between retry, login redirect and showing the error
//! - A session store persisted to optional key-value storage
//! - Session-tagged structured logging with production monitoring
//!
//! ## Architecture
//!
//! - `ApiClient`: executes calls and exposes the named API operations
//! - `ClientContext`: storage, logger and session shared between clients
//! - `classify`: turns a `RawFailure` into a `ClassifiedError`
//! - `RecoveryPolicy`: maps a `ClassifiedError` to a `RecoveryPlan`
//! - `Logger`: bounded in-memory log history mirrored to `tracing`
//! - `SessionStore`: bearer token and cached user profile

pub mod client;
pub use client::{ApiClient, Navigator, NoopNavigator};

pub mod context;
pub use context::ClientContext;

pub mod core;
pub use core::{ClientBuilder, Method, RequestBody, RequestDescriptor};

pub mod error;
pub use error::{classify, ClassifiedError, ConfigError, ErrorResult, ErrorType, RawFailure, Result, Severity};

pub mod resilience;
pub use resilience::{RecoveryAction, RecoveryConfig, RecoveryPlan, RecoveryPolicy};

pub mod logging;
pub use logging::{init_tracing, LogEntry, LogLevel, Logger, TracingConfig};

pub mod session;
pub use session::{SessionRecord, SessionStore, UserProfile};

pub mod config;
pub use config::{ClientConfig, ConfigProvider, Environment};

// Utility module for common functionality
mod util;

#[cfg(test)]
mod tests;

/// Create a new default client builder
pub fn client() -> core::ClientBuilder {
    core::ClientBuilder::new()
}

/// Build a client from `ENVDATA_*` environment variables
pub fn client_from_env() -> std::result::Result<ApiClient, ConfigError> {
    core::ClientBuilder::from_provider(&**config::DEFAULT_PROVIDER)?.build()
}
