use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};

use super::dto::{expires_at, PasswordRequest, PasswordResponse, RefreshResponse, UserSession};
use super::services::{AuthBackend, AuthError};
use crate::config::FirebaseConfig;
use crate::firebase::error_code;

/// Email/password accounts through the Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseAuth {
    http: Client,
    api_key: String,
    identity_url: String,
    securetoken_url: String,
}

impl FirebaseAuth {
    pub fn new(http: Client, config: &FirebaseConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            identity_url: config.identity_url.trim_end_matches('/').to_string(),
            securetoken_url: config.securetoken_url.trim_end_matches('/').to_string(),
        }
    }

    async fn password_call(&self, action: &str, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let url = format!("{}/v1/accounts:{}", self.identity_url, action);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;
        let body: PasswordResponse = parse(response).await?;
        Ok(body.into_session())
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let code = error_code(&text);
        warn!(%status, %code, "identity backend rejected request");
        return Err(AuthError::Rejected(code));
    }
    serde_json::from_str(&text).map_err(|e| AuthError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl AuthBackend for FirebaseAuth {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let session = self.password_call("signUp", email, password).await?;
        debug!(user_id = %session.user_id, "account created");
        Ok(session)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let session = self.password_call("signInWithPassword", email, password).await?;
        debug!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn refresh(&self, session: &UserSession) -> Result<UserSession, AuthError> {
        let url = format!("{}/v1/token", self.securetoken_url);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;
        let body: RefreshResponse = parse(response).await?;
        debug!("id token refreshed");
        Ok(UserSession {
            user_id: body.user_id,
            email: session.email.clone(),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expires_at(&body.expires_in),
        })
    }
}
