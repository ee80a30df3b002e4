use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::dto::UserSession;
use crate::profile::ProfileError;

/// Shortest password the identity backend accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,
    #[error("username is required")]
    MissingUsername,
    #[error("authentication rejected: {0}")]
    Rejected(String),
    #[error("authentication service unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed authentication response: {0}")]
    MalformedResponse(String),
    #[error("create profile document: {0}")]
    Profile(#[from] ProfileError),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidEmail(_) => "Please enter a valid email address.".into(),
            AuthError::WeakPassword => {
                format!("Password should be at least {MIN_PASSWORD_LEN} characters.")
            }
            AuthError::MissingUsername => "Please choose a username.".into(),
            AuthError::Rejected(code) => match code.as_str() {
                "EMAIL_EXISTS" => "An account with this email already exists.".into(),
                "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                    "Invalid email or password.".into()
                }
                "USER_DISABLED" => "This account has been disabled.".into(),
                "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Try again later.".into(),
                "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => {
                    "Your session has expired. Please sign in again.".into()
                }
                _ => "An error occurred during authentication.".into(),
            },
            AuthError::Network(_) => "Could not reach the authentication service.".into(),
            AuthError::MalformedResponse(_) => "An error occurred during authentication.".into(),
            AuthError::Profile(e) => e.user_message(),
        }
    }
}

/// Account creation and sign-in against the identity backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, AuthError>;
    async fn refresh(&self, session: &UserSession) -> Result<UserSession, AuthError>;
}

/// Renews `session` in place once its id token is about to expire. Returns whether it was renewed.
pub async fn refresh_if_expired(backend: &dyn AuthBackend, session: &mut UserSession) -> Result<bool, AuthError> {
    if !session.is_expired() {
        return Ok(false);
    }
    *session = backend.refresh(session).await?;
    Ok(true)
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks credentials before they leave the device. Returns the normalized email.
pub fn validate_credentials(email: &str, password: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AuthError::InvalidEmail(email));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(email)
}
