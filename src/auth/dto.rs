use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Signed-in user, handed explicitly to every controller that needs one.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: OffsetDateTime,
}

impl UserSession {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// True once the id token is within a minute of expiring.
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() + Duration::seconds(60) >= self.expires_at
    }
}

impl fmt::Debug for UserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Request body for `accounts:signUp` and `accounts:signInWithPassword`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

/// Response of `accounts:signUp` and `accounts:signInWithPassword`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResponse {
    pub local_id: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
}

/// Response of the secure token exchange (`grant_type=refresh_token`).
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub user_id: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
}

pub(crate) fn expires_at(expires_in: &str) -> OffsetDateTime {
    let secs = expires_in.parse::<i64>().unwrap_or(3600);
    OffsetDateTime::now_utc() + Duration::seconds(secs)
}

impl PasswordResponse {
    pub fn into_session(self) -> UserSession {
        UserSession {
            expires_at: expires_at(&self.expires_in),
            user_id: self.local_id,
            email: self.email,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        }
    }
}
