//! Authentication session state
//!
//! [`SessionStore`] holds the bearer token and cached user profile. The
//! in-memory record is authoritative; persistent storage is written through
//! on every change when available, and failures there only produce warnings.

pub mod storage;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::logging::Logger;
use storage::{keys, probe_storage, KeyValueStorage, StorageError};

/// Cached profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Fields the SDK does not model explicitly
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            name: None,
            company: None,
            extra: Map::new(),
        }
    }
}

/// Token and user, always set or cleared together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    auth: Option<(String, UserProfile)>,
}

impl SessionRecord {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            auth: Some((token.into(), user)),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|(token, _)| token.as_str())
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.auth.as_ref().map(|(_, user)| user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}

/// Process-wide session state shared by all API calls
pub struct SessionStore {
    storage: Option<Arc<dyn KeyValueStorage>>,
    record: RwLock<SessionRecord>,
    api_key: RwLock<Option<String>>,
    logger: Arc<Logger>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("persistent", &self.storage.is_some())
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionStore {
    /// Create a store, probing `storage` once and restoring any saved session.
    pub fn new(storage: Option<Arc<dyn KeyValueStorage>>, logger: Arc<Logger>) -> Self {
        let requested = storage.is_some();
        let storage = probe_storage(storage);
        if requested && storage.is_none() {
            logger.warn(
                "Persistent storage unavailable, session kept in memory only",
                json!({ "type": "storage" }),
            );
        }

        Self::with_probed(storage, logger)
    }

    /// Create a store over storage that has already passed [`probe_storage`].
    pub(crate) fn with_probed(storage: Option<Arc<dyn KeyValueStorage>>, logger: Arc<Logger>) -> Self {
        let store = Self {
            storage,
            record: RwLock::new(SessionRecord::empty()),
            api_key: RwLock::new(None),
            logger,
        };
        store.restore();
        store
    }

    /// Whether session changes survive a restart
    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Current session record
    pub fn get(&self) -> SessionRecord {
        self.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token().map(str::to_string)
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// Store a new session
    pub fn set(&self, token: impl Into<String>, user: UserProfile) {
        let token = token.into();
        *self.write() = SessionRecord::authenticated(token.clone(), user.clone());

        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        let persisted = serde_json::to_string(&user)
            .map_err(StorageError::from)
            .and_then(|user_json| {
                storage.set(keys::AUTH_TOKEN, &token)?;
                storage.set(keys::USER, &user_json)
            });
        if let Err(e) = persisted {
            // Never leave a token without its user behind
            let _ = storage.remove(keys::AUTH_TOKEN);
            let _ = storage.remove(keys::USER);
            self.storage_warning("save session", &e);
        }
    }

    /// Replace the cached user while keeping the token
    pub fn update_user(&self, user: UserProfile) {
        let token = match self.token() {
            Some(token) => token,
            None => return,
        };
        self.set(token, user);
    }

    /// Drop the session
    pub fn clear(&self) {
        *self.write() = SessionRecord::empty();

        if let Some(storage) = self.storage.as_ref() {
            let removed = storage
                .remove(keys::AUTH_TOKEN)
                .and_then(|_| storage.remove(keys::USER));
            if let Err(e) = removed {
                self.storage_warning("clear session", &e);
            }
        }
    }

    /// Demo API key saved by the playground, if any
    pub fn api_key(&self) -> Option<String> {
        self.api_key.read().ok().and_then(|key| key.clone())
    }

    pub fn set_api_key(&self, key: Option<String>) {
        if let Ok(mut current) = self.api_key.write() {
            *current = key.clone();
        }

        if let Some(storage) = self.storage.as_ref() {
            let result = match key.as_deref() {
                Some(key) => storage.set(keys::DEMO_API_KEY, key),
                None => storage.remove(keys::DEMO_API_KEY),
            };
            if let Err(e) = result {
                self.storage_warning("save API key", &e);
            }
        }
    }

    fn restore(&self) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };

        match storage.get(keys::DEMO_API_KEY) {
            Ok(key) => {
                if let Ok(mut current) = self.api_key.write() {
                    *current = key;
                }
            }
            Err(e) => self.storage_warning("read API key", &e),
        }

        let token = storage.get(keys::AUTH_TOKEN);
        let user = storage.get(keys::USER);
        match (token, user) {
            (Ok(Some(token)), Ok(Some(user))) => match serde_json::from_str::<UserProfile>(&user) {
                Ok(user) => *self.write() = SessionRecord::authenticated(token, user),
                Err(e) => {
                    self.storage_warning("restore session", &StorageError::from(e));
                    self.clear();
                }
            },
            (Ok(None), Ok(None)) => {}
            (Ok(_), Ok(_)) => {
                // Half a session is no session
                self.clear();
            }
            (Err(e), _) | (_, Err(e)) => self.storage_warning("restore session", &e),
        }
    }

    fn storage_warning(&self, operation: &str, error: &StorageError) {
        self.logger.warn(
            format!("Storage unavailable, could not {}", operation),
            json!({ "type": "storage", "error": error.to_string() }),
        );
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionRecord> {
        self.record.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionRecord> {
        self.record.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
