//! Shared client context
//!
//! One [`ClientContext`] is built at start-up and shared by `Arc` between
//! every `ApiClient` of the process. It owns the storage capability, the
//! logger and the session store.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::config::ClientConfig;
use crate::logging::{HttpMonitoringSink, Logger, LoggerConfig, MonitoringSink};
use crate::session::storage::{probe_storage, FileStorage, KeyValueStorage, MemoryStorage, StorageError};
use crate::session::SessionStore;

pub struct ClientContext {
    storage: Option<Arc<dyn KeyValueStorage>>,
    logger: Arc<Logger>,
    session: SessionStore,
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("persistent", &self.storage.is_some())
            .field("logger", &self.logger)
            .field("session", &self.session)
            .finish()
    }
}

impl ClientContext {
    /// Build the context.
    ///
    /// Without an explicit `storage`, a [`FileStorage`] under
    /// `config.storage_dir` is used when set, in-memory storage otherwise.
    /// Without an explicit `monitor`, production error entries go to
    /// `config.monitoring_endpoint` when set.
    pub fn new(
        config: &ClientConfig,
        storage: Option<Arc<dyn KeyValueStorage>>,
        monitor: Option<Arc<dyn MonitoringSink>>,
    ) -> Self {
        let mut open_error = None;
        let storage = storage.or_else(|| match config.storage_dir.as_ref() {
            Some(dir) => match FileStorage::in_dir(dir) {
                Ok(file) => Some(Arc::new(file) as Arc<dyn KeyValueStorage>),
                Err(e) => {
                    open_error = Some(e);
                    None
                }
            },
            None => Some(Arc::new(MemoryStorage::new()) as Arc<dyn KeyValueStorage>),
        });
        let requested = storage.is_some();
        let storage = probe_storage(storage);

        let monitor = monitor.or_else(|| {
            config
                .monitoring_endpoint
                .as_ref()
                .map(|endpoint| Arc::new(HttpMonitoringSink::new(endpoint.clone())) as Arc<dyn MonitoringSink>)
        });

        let logger = Arc::new(Logger::new(LoggerConfig::from(config), storage.clone(), monitor));
        if let Some(e) = open_error {
            logger.warn(
                "Could not open storage directory, session kept in memory only",
                json!({ "type": "storage", "error": e.to_string() }),
            );
        } else if requested && storage.is_none() {
            logger.warn(
                "Persistent storage unavailable, session kept in memory only",
                json!({ "type": "storage" }),
            );
        }

        let session = SessionStore::with_probed(storage.clone(), Arc::clone(&logger));

        Self {
            storage,
            logger,
            session,
        }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Whether storage passed the capability probe
    pub fn has_persistent_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Flush buffered logs to storage. Call once before the process exits.
    pub fn shutdown(&self) -> Result<(), StorageError> {
        self.logger.info("Client context shutting down", json!({ "type": "lifecycle" }));
        self.logger.flush()
    }
}
