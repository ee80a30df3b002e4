use async_trait::async_trait;
use thiserror::Error;

use crate::auth::UserSession;

pub mod controller;
pub mod dto;
pub mod firestore;

pub use controller::ProfileController;
pub use dto::{PersonalDataForm, ProfilePayload};
pub use firestore::FirestoreProfileStore;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),
    #[error("profile request rejected ({status}): {code}")]
    Rejected { status: u16, code: String },
    #[error("profile service unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed profile document: {0}")]
    MalformedResponse(String),
}

impl ProfileError {
    pub fn user_message(&self) -> String {
        match self {
            ProfileError::Validation(msg) => msg.clone(),
            ProfileError::Rejected { .. } | ProfileError::MalformedResponse(_) => {
                "Error updating personal data. Please try again.".into()
            }
            ProfileError::Network(_) => "Could not reach the profile service.".into(),
        }
    }
}

/// Per-user profile documents.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn read_profile(&self, session: &UserSession) -> Result<Option<ProfilePayload>, ProfileError>;
    /// Replaces the whole document.
    async fn write_profile(&self, session: &UserSession, profile: &ProfilePayload) -> Result<(), ProfileError>;
    /// Overwrites only `field_paths`, keeping every other field.
    async fn merge_profile(
        &self,
        session: &UserSession,
        fields: &ProfilePayload,
        field_paths: &[&str],
    ) -> Result<(), ProfileError>;
}
