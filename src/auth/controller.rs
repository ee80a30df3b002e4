use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::dto::UserSession;
use super::services::{refresh_if_expired, validate_credentials, AuthError};
use crate::profile::ProfilePayload;
use crate::state::AppState;

/// Sign-up, sign-in and session upkeep for the auth screens.
#[derive(Clone)]
pub struct AuthController {
    state: AppState,
}

impl AuthController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Creates the account, then its profile document `{username, email, createdAt}`.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<UserSession, AuthError> {
        let email = validate_credentials(email, password).map_err(|e| {
            warn!(error = %e, "sign-up input rejected");
            e
        })?;
        let username = username.trim();
        if username.is_empty() {
            warn!("sign-up without username");
            return Err(AuthError::MissingUsername);
        }

        let session = self.state.auth.sign_up(&email, password).await.map_err(|e| {
            error!(error = %e, "account creation failed");
            e
        })?;

        let profile = ProfilePayload::new_account(username, &email, OffsetDateTime::now_utc());
        if let Err(e) = self.state.profiles.write_profile(&session, &profile).await {
            error!(error = %e, user_id = %session.user_id, "initial profile write failed");
            return Err(AuthError::Profile(e));
        }

        info!(user_id = %session.user_id, "account created");
        Ok(session)
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let email = validate_credentials(email, password).map_err(|e| {
            warn!(error = %e, "sign-in input rejected");
            e
        })?;
        let session = self.state.auth.sign_in(&email, password).await.map_err(|e| {
            warn!(error = %e, "sign-in failed");
            e
        })?;
        info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    /// Ends the session. Tokens are not revocable from the client; dropping the handle is the sign-out.
    pub fn sign_out(&self, session: UserSession) {
        info!(user_id = %session.user_id, "signed out");
    }

    /// Returns the session unchanged, or a renewed one once the id token is about to expire.
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn ensure_fresh(&self, mut session: UserSession) -> Result<UserSession, AuthError> {
        let renewed = refresh_if_expired(self.state.auth.as_ref(), &mut session)
            .await
            .map_err(|e| {
                warn!(error = %e, "token refresh failed");
                e
            })?;
        if renewed {
            info!("id token refreshed");
        }
        Ok(session)
    }
}

#[cfg(test)]
mod auth_controller_tests {
    use super::*;
    use crate::profile::dto::{CREATED_AT, EMAIL, USERNAME};
    use crate::testing::{fake_state, test_session, MemoryBackend};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use time::Duration;

    fn controller() -> (AuthController, Arc<MemoryBackend>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (state, backend) = fake_state("http://127.0.0.1:9", dir.path());
        (AuthController::new(state), backend, dir)
    }

    #[tokio::test]
    async fn sign_up_writes_initial_profile() {
        let (auth, backend, _dir) = controller();
        let session = auth
            .sign_up("  Jane@Example.COM ", "secret1", " jane ")
            .await
            .unwrap();
        assert_eq!(session.email, "jane@example.com");

        let profile = backend.profile(&session.user_id).unwrap();
        assert_eq!(profile.get(USERNAME), Some(&json!("jane")));
        assert_eq!(profile.get(EMAIL), Some(&json!("jane@example.com")));
        assert!(profile.get(CREATED_AT).is_some());
    }

    #[tokio::test]
    async fn sign_up_rejects_bad_input_before_calling_backend() {
        let (auth, backend, _dir) = controller();
        assert!(matches!(
            auth.sign_up("not-an-email", "secret1", "jane").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.sign_up("jane@example.com", "12345", "jane").await,
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            auth.sign_up("jane@example.com", "secret1", "   ").await,
            Err(AuthError::MissingUsername)
        ));
        assert_eq!(backend.account_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let (auth, _backend, _dir) = controller();
        auth.sign_up("jane@example.com", "secret1", "jane").await.unwrap();
        let err = auth
            .sign_up("JANE@example.com", "secret2", "jane2")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "An account with this email already exists.");
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let (auth, _backend, _dir) = controller();
        let created = auth.sign_up("jane@example.com", "secret1", "jane").await.unwrap();

        let session = auth.sign_in("Jane@example.com", "secret1").await.unwrap();
        assert_eq!(session.user_id, created.user_id);

        let err = auth.sign_in("jane@example.com", "wrong-one").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid email or password.");
        auth.sign_out(session);
    }

    #[tokio::test]
    async fn ensure_fresh_refreshes_only_expired_sessions() {
        let (auth, backend, _dir) = controller();
        let fresh = test_session("uid-1");
        let same = auth.ensure_fresh(fresh.clone()).await.unwrap();
        assert_eq!(same, fresh);
        assert_eq!(backend.refreshes.load(Ordering::SeqCst), 0);

        let stale = UserSession {
            expires_at: OffsetDateTime::now_utc() - Duration::minutes(5),
            ..test_session("uid-1")
        };
        let renewed = auth.ensure_fresh(stale).await.unwrap();
        assert_eq!(renewed.id_token, "id-token-uid-1-refreshed");
        assert!(!renewed.is_expired());
        assert_eq!(backend.refreshes.load(Ordering::SeqCst), 1);
    }
}
