use thiserror::Error;

use crate::advice::AdviceError;
use crate::auth::AuthError;
use crate::capture::CaptureError;
use crate::profile::ProfileError;
use crate::upload::PackageError;

/// Failure of a controller action. `user_message` is the text of the blocking notification.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error(transparent)]
    Advice(#[from] AdviceError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("photo storage: {0:#}")]
    Storage(anyhow::Error),
    #[error("camera: {0:#}")]
    Camera(anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Capture(CaptureError::InvalidTarget(_)) => {
                "Please select the number of products.".into()
            }
            AppError::Capture(CaptureError::SessionComplete(_)) => {
                "All photos are taken. Request advice or start over.".into()
            }
            AppError::Package(PackageError::IncompleteSession { .. }) => {
                "Please capture all required photos and ensure user data is loaded".into()
            }
            AppError::Package(PackageError::MissingProfile) => {
                "No personal data found for this user.".into()
            }
            AppError::Package(PackageError::Profile(_)) => {
                "Personal data could not be prepared for upload.".into()
            }
            AppError::Advice(AdviceError::Network(_)) => {
                "Could not reach the advice service. Check your connection and try again.".into()
            }
            AppError::Advice(AdviceError::Server { message, .. }) => {
                format!("Failed to get advice: {message}")
            }
            AppError::Advice(AdviceError::MalformedResponse(_)) => {
                "Unexpected response from the advice service.".into()
            }
            AppError::Advice(AdviceError::Attachment { .. } | AdviceError::InvalidPart(_)) => {
                "A captured photo could not be read. Please start over.".into()
            }
            AppError::Auth(e) => e.user_message(),
            AppError::Profile(e) => e.user_message(),
            AppError::PermissionDenied => "No access to camera".into(),
            AppError::InvalidState { .. } => "This action is not available right now.".into(),
            AppError::Storage(_) => "Could not save the photo. Please try again.".into(),
            AppError::Camera(_) => "Failed to take picture".into(),
        }
    }
}
