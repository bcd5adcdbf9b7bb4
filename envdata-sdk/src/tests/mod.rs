//! Unit tests for the EnvData SDK
//!
//! This module contains tests that exercise several components together.

use std::time::Duration;

use crate::config::ClientConfig;
use crate::resilience::RecoveryConfig;

pub mod config_tests;
pub mod recovery_tests;
pub mod session_tests;

/// Client configuration pointed at `base_url` with millisecond-scale delays
pub(crate) fn fast_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        recovery: RecoveryConfig {
            network_retry_delay: Duration::from_millis(10),
            rate_limit_delay: Duration::from_millis(20),
            redirect_delay: Duration::ZERO,
            ..RecoveryConfig::default()
        },
        ..ClientConfig::default()
    }
}

/// Address on which nothing is listening
pub(crate) fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
