//! Named EnvData API operations

use serde::Deserialize;
use serde_json::json;

use crate::core::{path_with_segment, MultipartPart, RequestDescriptor};
use crate::error::Result;
use crate::session::UserProfile;

use super::models::*;
use super::ApiClient;

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyList {
    Plain(Vec<ApiKeyInfo>),
    Wrapped { keys: Vec<ApiKeyInfo> },
}

impl ApiClient {
    /// Look up the CEVS score of a company, optionally for one country
    pub async fn cevs_score(&self, company: &str, country: Option<&str>) -> Result<CevsScore> {
        let mut request = RequestDescriptor::get(path_with_segment("/v1/global/cevs", company));
        if let Some(country) = country {
            request = request.query("country", country);
        }
        self.request(&request).await
    }

    /// Sign in and store the new session
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = RequestDescriptor::post("/v1/auth/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;

        let response: LoginResponse = self.request(&request).await?;
        self.session().set(response.access_token.clone(), response.user.clone());
        self.logger().log_user_action("login", json!({ "email": response.user.email }));
        Ok(response)
    }

    /// Create an account. The session starts once the email is verified.
    pub async fn register(&self, details: &RegisterRequest) -> Result<RegisterResponse> {
        let request = RequestDescriptor::post("/v1/auth/register").json(details)?;
        let response = self.request(&request).await?;
        self.logger().log_user_action("register", json!({ "email": details.email }));
        Ok(response)
    }

    /// Confirm a registration code and store the new session
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<LoginResponse> {
        let request = RequestDescriptor::post("/v1/auth/verify-email")
            .json(&json!({ "email": email, "code": code }))?;

        let response: LoginResponse = self.request(&request).await?;
        self.session().set(response.access_token.clone(), response.user.clone());
        self.logger().log_user_action("verify_email", json!({ "email": response.user.email }));
        Ok(response)
    }

    /// End the session. The server is notified when possible; the local
    /// session is cleared regardless.
    pub async fn logout(&self) {
        if self.session().is_authenticated() {
            if let Err(e) = self.execute(&RequestDescriptor::post("/v1/auth/logout")).await {
                self.logger().warn(
                    "Logout request failed, clearing local session anyway",
                    json!({ "type": "auth", "code": e.code() }),
                );
            }
        }
        self.session().clear();
        self.logger().log_user_action("logout", json!({}));
    }

    /// Profile of the signed-in user
    pub async fn current_user(&self) -> Result<UserProfile> {
        self.request(&RequestDescriptor::get("/v1/auth/me")).await
    }

    /// Update the profile and refresh the cached user
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let request = RequestDescriptor::put("/v1/users/me").json(update)?;
        let user: UserProfile = self.request(&request).await?;
        self.session().update_user(user.clone());
        Ok(user)
    }

    /// Upload a new avatar image
    pub async fn upload_avatar(&self, bytes: Vec<u8>, file_name: &str, mime: &str) -> Result<UserProfile> {
        let request = RequestDescriptor::post("/v1/users/me/avatar").multipart(vec![MultipartPart::File {
            name: "file".to_string(),
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            bytes,
        }]);

        let user: UserProfile = self.request(&request).await?;
        self.session().update_user(user.clone());
        Ok(user)
    }

    pub async fn list_api_keys(&self) -> Result<Vec<ApiKeyInfo>> {
        let keys = match self.request::<KeyList>(&RequestDescriptor::get("/v1/api-keys")).await? {
            KeyList::Plain(keys) | KeyList::Wrapped { keys } => keys,
        };
        Ok(keys)
    }

    /// Create an API key; the secret is only returned here
    pub async fn create_api_key(&self, name: &str) -> Result<ApiKeyInfo> {
        let request = RequestDescriptor::post("/v1/api-keys").json(&json!({ "name": name }))?;
        self.request(&request).await
    }

    pub async fn revoke_api_key(&self, id: &str) -> Result<()> {
        self.execute(&RequestDescriptor::delete(path_with_segment("/v1/api-keys", id)))
            .await
            .map(|_| ())
    }

    pub async fn usage(&self) -> Result<UsageSummary> {
        self.request(&RequestDescriptor::get("/v1/usage")).await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.request(&RequestDescriptor::get("/health")).await
    }
}
