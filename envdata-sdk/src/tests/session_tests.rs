//! Tests for session persistence through the client
//!
//! These tests verify that login state survives restarts with file storage
//! and that unavailable storage never breaks the login flow.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::ClientConfig;
    use crate::context::ClientContext;
    use crate::core::ClientBuilder;
    use crate::logging::LogLevel;
    use crate::session::storage::{keys, FileStorage, KeyValueStorage, MockKeyValueStorage, StorageError};
    use crate::tests::fast_config;

    async fn login_server() -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "t1",
                "user": { "email": "a@b.com", "name": "Ada" }
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_login_survives_restart_with_file_storage() {
        let mock_server = login_server().await;
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage_dir: Some(dir.path().to_path_buf()),
            ..fast_config(&mock_server.uri())
        };

        let client = ClientBuilder::new().config(config.clone()).build().unwrap();
        client.login("a@b.com", "secret").await.unwrap();
        client.context().shutdown().unwrap();

        let restarted = ClientBuilder::new().config(config).build().unwrap();
        assert_eq!(restarted.session().token().as_deref(), Some("t1"));
        assert_eq!(restarted.session().user().unwrap().name.as_deref(), Some("Ada"));

        let storage = FileStorage::in_dir(dir.path()).unwrap();
        let logs = storage.get(keys::RECENT_LOGS).unwrap().unwrap();
        assert!(logs.contains("User Action: login"));
    }

    #[tokio::test]
    async fn test_logout_clears_persisted_session() {
        let mock_server = login_server().await;
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage_dir: Some(dir.path().to_path_buf()),
            ..fast_config(&mock_server.uri())
        };

        let client = ClientBuilder::new().config(config.clone()).build().unwrap();
        client.login("a@b.com", "secret").await.unwrap();
        client.logout().await;
        assert!(!client.session().is_authenticated());

        let restarted = ClientContext::new(&config, None, None);
        assert!(!restarted.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_session_when_server_unreachable() {
        let client = ClientBuilder::new()
            .config(fast_config(&crate::tests::closed_port_url()))
            .max_attempts(1)
            .build()
            .unwrap();
        client
            .session()
            .set("t1", crate::session::UserProfile::new("a@b.com"));

        client.logout().await;
        assert!(!client.session().is_authenticated());
        assert!(client
            .logger()
            .entries_by_level(LogLevel::Warn)
            .iter()
            .any(|e| e.message.contains("Logout request failed")));
    }

    #[tokio::test]
    async fn test_login_works_without_storage() {
        let mock_server = login_server().await;

        let mut mock = MockKeyValueStorage::new();
        mock.expect_set()
            .returning(|_, _| Err(StorageError::Unavailable("private mode".to_string())));
        mock.expect_get().never();
        let storage: Arc<dyn KeyValueStorage> = Arc::new(mock);

        let client = ClientBuilder::new()
            .config(fast_config(&mock_server.uri()))
            .storage(storage)
            .build()
            .unwrap();
        assert!(!client.context().has_persistent_storage());

        client.login("a@b.com", "secret").await.unwrap();
        assert_eq!(client.session().token().as_deref(), Some("t1"));
        assert!(client
            .logger()
            .entries_by_level(LogLevel::Warn)
            .iter()
            .any(|e| e.context.get("type") == Some(&json!("storage"))));

        // Nothing to persist to, but shutdown still succeeds
        client.context().shutdown().unwrap();
    }
}
