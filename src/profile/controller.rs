use tracing::{info, instrument, warn};

use super::dto::{PersonalDataForm, ProfilePayload, PERSONAL_FIELDS};
use crate::auth::{refresh_if_expired, UserSession};
use crate::error::AppError;
use crate::state::AppState;

/// Personal data screen of the signed-in user.
pub struct ProfileController {
    state: AppState,
    user: UserSession,
}

impl ProfileController {
    pub fn new(state: AppState, user: UserSession) -> Self {
        Self { state, user }
    }

    pub fn user(&self) -> &UserSession {
        &self.user
    }

    /// Renews the id token before it is sent to the profile store.
    async fn fresh_user(&mut self) -> Result<(), AppError> {
        if refresh_if_expired(self.state.auth.as_ref(), &mut self.user).await? {
            info!("id token refreshed");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %self.user.user_id))]
    pub async fn load(&mut self) -> Result<Option<ProfilePayload>, AppError> {
        self.fresh_user().await?;
        let profile = self.state.profiles.read_profile(&self.user).await?;
        if profile.is_none() {
            warn!("no profile document");
        }
        Ok(profile)
    }

    /// Validates the form and merges it into the profile document.
    /// Left-blank numeric fields keep their stored value.
    #[instrument(skip(self, form), fields(user_id = %self.user.user_id))]
    pub async fn update(&mut self, form: &PersonalDataForm) -> Result<ProfilePayload, AppError> {
        let fields = form.to_payload().map_err(|e| {
            warn!(error = %e, "personal data rejected");
            e
        })?;
        let paths: Vec<&str> = PERSONAL_FIELDS
            .iter()
            .copied()
            .filter(|key| fields.get(key).is_some())
            .collect();
        self.fresh_user().await?;
        self.state
            .profiles
            .merge_profile(&self.user, &fields, &paths)
            .await?;
        info!(fields = paths.len(), "personal data updated");
        Ok(fields)
    }
}
