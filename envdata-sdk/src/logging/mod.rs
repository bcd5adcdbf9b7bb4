//! # Structured Logging
//!
//! The [`Logger`] records leveled entries tagged with a session id, keeps the
//! most recent ones in a bounded ring buffer, mirrors every entry to
//! `tracing`, and in production forwards error entries to a
//! [`MonitoringSink`]. Forwarding is best-effort and never fails the caller.

mod monitoring;

pub use monitoring::{HttpMonitoringSink, MonitoringError, MonitoringSink};

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, EnvFilter, Registry};
use uuid::Uuid;

use crate::config::{ClientConfig, Environment};
use crate::session::storage::{keys, KeyValueStorage, StorageError};

// Flag to track if the tracing subscriber has been installed
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Log level of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// One recorded log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub context: Map<String, Value>,
    pub session_id: String,
    pub url: Option<String>,
    pub user_agent: String,
}

impl LogEntry {
    /// The `context.type` tag, if any
    pub fn entry_type(&self) -> Option<&str> {
        self.context.get("type").and_then(Value::as_str)
    }
}

/// Logger settings
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Ring buffer capacity
    pub capacity: usize,

    pub environment: Environment,

    /// Entries below this level are dropped
    pub min_level: LogLevel,

    /// Entries persisted by `flush` in development
    pub persisted_limit: usize,

    pub user_agent: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            environment: Environment::Development,
            min_level: LogLevel::Debug,
            persisted_limit: 100,
            user_agent: format!("envdata-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&ClientConfig> for LoggerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            capacity: config.log_capacity.max(1),
            environment: config.environment,
            min_level: match config.environment {
                Environment::Development => LogLevel::Debug,
                Environment::Production => LogLevel::Info,
            },
            persisted_limit: config.persisted_log_limit,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Session-scoped structured logger with a bounded in-memory history
pub struct Logger {
    config: LoggerConfig,
    session_id: String,
    entries: Mutex<VecDeque<LogEntry>>,
    location: RwLock<Option<String>>,
    storage: Option<Arc<dyn KeyValueStorage>>,
    monitor: Option<Arc<dyn MonitoringSink>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .field("session_id", &self.session_id)
            .field("len", &self.len())
            .field("persistent", &self.storage.is_some())
            .field("monitored", &self.monitor.is_some())
            .finish()
    }
}

impl Logger {
    /// `storage` should already have passed `probe_storage`.
    pub fn new(
        config: LoggerConfig,
        storage: Option<Arc<dyn KeyValueStorage>>,
        monitor: Option<Arc<dyn MonitoringSink>>,
    ) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            config: LoggerConfig { capacity, ..config },
            session_id: format!("session_{}", Uuid::new_v4().simple()),
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            location: RwLock::new(None),
            storage,
            monitor,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Set the page/location recorded with subsequent entries
    pub fn set_location(&self, url: impl Into<String>) {
        if let Ok(mut location) = self.location.write() {
            *location = Some(url.into());
        }
    }

    /// Record an entry. `context` should be a JSON object; other values are
    /// stored under `context.data`.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, context: Value) -> LogEntry {
        let context = match context {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            context,
            session_id: self.session_id.clone(),
            url: self.location.read().ok().and_then(|l| l.clone()),
            user_agent: self.config.user_agent.clone(),
        };

        if level < self.config.min_level {
            return entry;
        }

        self.push(entry.clone());
        emit(&entry);
        self.forward(&entry);

        entry
    }

    pub fn debug(&self, message: impl Into<String>, context: Value) -> LogEntry {
        self.log(LogLevel::Debug, message, context)
    }

    pub fn info(&self, message: impl Into<String>, context: Value) -> LogEntry {
        self.log(LogLevel::Info, message, context)
    }

    pub fn warn(&self, message: impl Into<String>, context: Value) -> LogEntry {
        self.log(LogLevel::Warn, message, context)
    }

    pub fn error(&self, message: impl Into<String>, context: Value) -> LogEntry {
        self.log(LogLevel::Error, message, context)
    }

    /// Outgoing API request
    pub fn log_request(&self, method: &str, url: &str, context: Value) -> LogEntry {
        let context = tagged("api_request", context, json!({ "method": method, "url": url }));
        self.info(format!("API Request: {} {}", method, url), context)
    }

    /// Successful API response
    pub fn log_response(&self, method: &str, url: &str, status: u16, duration: Duration, context: Value) -> LogEntry {
        let context = tagged(
            "api_response",
            context,
            json!({
                "method": method,
                "url": url,
                "status": status,
                "duration_ms": duration.as_millis() as u64,
            }),
        );
        self.info(format!("API Response: {} {} {}", method, url, status), context)
    }

    /// Failed API attempt
    pub fn log_request_failure(&self, level: LogLevel, method: &str, url: &str, context: Value) -> LogEntry {
        let context = tagged("api_error", context, json!({ "method": method, "url": url }));
        self.log(level, format!("API Error: {} {}", method, url), context)
    }

    /// Something the user did
    pub fn log_user_action(&self, action: &str, details: Value) -> LogEntry {
        let context = tagged("user_action", details, json!({ "action": action }));
        self.info(format!("User Action: {}", action), context)
    }

    /// A timing sample
    pub fn log_performance(&self, metric: &str, value: Duration, context: Value) -> LogEntry {
        let value_ms = value.as_secs_f64() * 1000.0;
        let context = tagged("performance", context, json!({ "metric": metric, "value_ms": value_ms }));
        self.debug(format!("Performance: {} {:.2}ms", metric, value_ms), context)
    }

    /// A UI component crashed while rendering
    pub fn log_component_error(&self, component: &str, error: &str, stack: Option<&str>) -> LogEntry {
        let context = json!({
            "type": "component_error",
            "component": component,
            "error": error,
            "stack": stack,
        });
        self.error(format!("Component Error: {}", component), context)
    }

    /// Snapshot of the buffered entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer().iter().cloned().collect()
    }

    pub fn entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.buffer().iter().filter(|e| e.level == level).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.buffer().clear();
    }

    /// Buffered entries as a JSON array
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries())
    }

    /// Persist the most recent entries to storage. Development only; a no-op
    /// in production or without persistent storage.
    pub fn flush(&self) -> Result<(), StorageError> {
        if self.config.environment != Environment::Development || self.config.persisted_limit == 0 {
            return Ok(());
        }
        let Some(storage) = self.storage.as_ref() else {
            return Ok(());
        };

        let recent: Vec<LogEntry> = {
            let buffer = self.buffer();
            let skip = buffer.len().saturating_sub(self.config.persisted_limit);
            buffer.iter().skip(skip).cloned().collect()
        };

        storage.set(keys::RECENT_LOGS, &serde_json::to_string(&recent)?)
    }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        // A panic while holding the lock leaves the buffer structurally valid
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, entry: LogEntry) {
        let mut buffer = self.buffer();
        while buffer.len() >= self.config.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry);
    }

    fn forward(&self, entry: &LogEntry) {
        if self.config.environment != Environment::Production || entry.level != LogLevel::Error {
            return;
        }
        let Some(monitor) = self.monitor.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime, skipping monitoring forward");
            return;
        };

        let entry = entry.clone();
        handle.spawn(async move {
            if let Err(e) = monitor.report(&entry).await {
                tracing::debug!(error = %e, "Failed to forward log entry to monitoring");
            }
        });
    }
}

fn tagged(entry_type: &str, extra: Value, base: Value) -> Value {
    let mut map = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Value::Object(extra) = extra {
        map.extend(extra);
    }
    map.insert("type".to_string(), Value::String(entry_type.to_string()));
    Value::Object(map)
}

fn emit(entry: &LogEntry) {
    let context = Value::Object(entry.context.clone());
    match entry.level {
        LogLevel::Debug => {
            tracing::debug!(session = %entry.session_id, context = %context, "{}", entry.message)
        }
        LogLevel::Info => {
            tracing::info!(session = %entry.session_id, context = %context, "{}", entry.message)
        }
        LogLevel::Warn => {
            tracing::warn!(session = %entry.session_id, context = %context, "{}", entry.message)
        }
        LogLevel::Error => {
            tracing::error!(session = %entry.session_id, context = %context, "{}", entry.message)
        }
    }
}

/// Settings for the process-wide `tracing` subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    pub json_format: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Install the global `tracing` subscriber once. Later calls are no-ops.
pub fn init_tracing(config: &TracingConfig) -> Result<(), String> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = Registry::default().with(filter);

    let result = if config.json_format {
        tracing::subscriber::set_global_default(
            subscriber.with(tracing_fmt::layer().json().flatten_event(true).with_target(true)),
        )
    } else {
        tracing::subscriber::set_global_default(subscriber.with(tracing_fmt::layer().with_target(true)))
    };

    result.map_err(|e| {
        TRACING_INITIALIZED.store(false, Ordering::SeqCst);
        format!("Failed to set global subscriber: {}", e)
    })?;

    tracing::info!(level = %config.level, json = config.json_format, "Structured logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;

    fn logger_with_capacity(capacity: usize) -> Logger {
        Logger::new(
            LoggerConfig {
                capacity,
                ..LoggerConfig::default()
            },
            None,
            None,
        )
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let logger = logger_with_capacity(3);
        for i in 0..5 {
            logger.info(format!("entry {}", i), json!({}));
            assert!(logger.len() <= 3);
        }

        let messages: Vec<String> = logger.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn test_default_capacity_is_1000() {
        let logger = Logger::new(LoggerConfig::default(), None, None);
        for i in 0..1001 {
            logger.debug(format!("entry {}", i), json!({}));
        }
        assert_eq!(logger.len(), 1000);
        assert_eq!(logger.entries()[0].message, "entry 1");
    }

    #[test]
    fn test_entry_metadata() {
        let logger = logger_with_capacity(10);
        logger.set_location("/dashboard");
        let entry = logger.warn("slow page", json!({ "page": "dashboard" }));

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.session_id, logger.session_id());
        assert!(entry.session_id.starts_with("session_"));
        assert_eq!(entry.url.as_deref(), Some("/dashboard"));
        assert_eq!(entry.context["page"], "dashboard");
    }

    #[test]
    fn test_convenience_entries_are_tagged() {
        let logger = logger_with_capacity(10);
        logger.log_request("GET", "/v1/health", json!({ "attempt": 1 }));
        logger.log_response("GET", "/v1/health", 200, Duration::from_millis(12), json!({}));
        logger.log_user_action("download_report", json!({ "company": "Acme" }));
        logger.log_performance("page_load", Duration::from_millis(340), json!({}));
        logger.log_component_error("ScoreChart", "undefined is not a function", None);

        let types: Vec<String> = logger
            .entries()
            .iter()
            .filter_map(|e| e.entry_type().map(str::to_string))
            .collect();
        assert_eq!(
            types,
            vec!["api_request", "api_response", "user_action", "performance", "component_error"]
        );
        assert_eq!(logger.entries_by_level(LogLevel::Error).len(), 1);
        assert_eq!(logger.entries()[0].context["attempt"], 1);
    }

    #[test]
    fn test_min_level_filters() {
        let logger = Logger::new(
            LoggerConfig {
                min_level: LogLevel::Info,
                ..LoggerConfig::default()
            },
            None,
            None,
        );
        logger.debug("hidden", json!({}));
        logger.info("shown", json!({}));
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn test_flush_persists_recent_entries_in_development() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let logger = Logger::new(
            LoggerConfig {
                persisted_limit: 2,
                ..LoggerConfig::default()
            },
            Some(Arc::clone(&storage)),
            None,
        );
        for i in 0..4 {
            logger.info(format!("entry {}", i), json!({}));
        }
        logger.flush().unwrap();

        let stored = storage.get(keys::RECENT_LOGS).unwrap().unwrap();
        let stored: Vec<LogEntry> = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].message, "entry 3");
    }

    #[test]
    fn test_flush_is_noop_in_production() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let logger = Logger::new(
            LoggerConfig {
                environment: Environment::Production,
                ..LoggerConfig::default()
            },
            Some(Arc::clone(&storage)),
            None,
        );
        logger.error("boom", json!({}));
        logger.flush().unwrap();
        assert_eq!(storage.get(keys::RECENT_LOGS).unwrap(), None);
    }

    #[test]
    fn test_export_json() {
        let logger = logger_with_capacity(10);
        logger.info("one", json!({}));
        let exported: Vec<Value> = serde_json::from_str(&logger.export_json().unwrap()).unwrap();
        assert_eq!(exported[0]["message"], "one");
        assert_eq!(exported[0]["level"], "info");
        assert!(exported[0].get("sessionId").is_some());
    }
}
