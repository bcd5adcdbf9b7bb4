//! Host application navigation hooks

use std::sync::Mutex;

/// Lets the SDK ask the host application to change page
pub trait Navigator: Send + Sync {
    /// Path (with query) of the page currently shown
    fn current_path(&self) -> String;

    fn redirect(&self, target: &str);
}

/// Navigator for hosts without pages
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn current_path(&self) -> String {
        "/".to_string()
    }

    fn redirect(&self, target: &str) {
        tracing::debug!(target_path = target, "Redirect requested without a navigator");
    }
}

/// Navigator that remembers requested redirects
#[derive(Debug)]
pub struct RecordingNavigator {
    current: String,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Redirect targets in request order
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.current.clone()
    }

    fn redirect(&self, target: &str) {
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(target.to_string());
        }
    }
}

/// Login URL carrying `current` as the return target
pub fn login_redirect_target(login_path: &str, current: &str) -> String {
    let current_page = current.split(['?', '#']).next().unwrap_or(current);
    if current_page == login_path {
        return login_path.to_string();
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("returnTo", current)
        .finish();
    format!("{}?{}", login_path, query)
}
