//! External monitoring targets for production error logs

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::LogEntry;

#[derive(Error, Debug)]
pub enum MonitoringError {
    #[error("Monitoring target unreachable: {0}")]
    Unreachable(String),

    #[error("Monitoring target rejected entry with status {0}")]
    Rejected(u16),
}

/// Receiver of error-level log entries in production
#[async_trait]
pub trait MonitoringSink: Send + Sync {
    async fn report(&self, entry: &LogEntry) -> Result<(), MonitoringError>;
}

/// Posts entries as JSON to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpMonitoringSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMonitoringSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MonitoringSink for HttpMonitoringSink {
    async fn report(&self, entry: &LogEntry) -> Result<(), MonitoringError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(entry)
            .send()
            .await
            .map_err(|e| MonitoringError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(MonitoringError::Rejected(response.status().as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, Logger, LoggerConfig};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_sink_posts_entry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&mock_server)
            .await;

        let logger = Logger::new(LoggerConfig::default(), None, None);
        let entry = logger.log(LogLevel::Error, "boom", json!({ "component": "Dashboard" }));

        let sink = HttpMonitoringSink::new(format!("{}/ingest", mock_server.uri()));
        sink.report(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_sink_reports_rejection() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let logger = Logger::new(LoggerConfig::default(), None, None);
        let entry = logger.log(LogLevel::Error, "boom", json!({}));

        let sink = HttpMonitoringSink::new(mock_server.uri());
        assert!(matches!(sink.report(&entry).await, Err(MonitoringError::Rejected(503))));
    }
}
