//! Advice screens: capture photos, package them with the profile, ask for advice.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::advice::{AdviceEndpoint, AdviceResult};
use crate::auth::{refresh_if_expired, UserSession};
use crate::camera::Camera;
use crate::capture::{CaptureError, CaptureSession, CapturedImage, NextPrompt, PhotoRole};
use crate::error::AppError;
use crate::profile::ProfilePayload;
use crate::state::AppState;
use crate::upload::{build_meal, build_product, part_key, PackageError, UploadBody};

pub mod meal;
pub mod product;

pub use meal::MealAdviceController;
pub use product::ProductAdviceController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Meal,
    Product,
}

impl FlowKind {
    pub fn endpoint(self) -> AdviceEndpoint {
        match self {
            FlowKind::Meal => AdviceEndpoint::Meal,
            FlowKind::Product => AdviceEndpoint::Product,
        }
    }

    /// Cache file name (without extension) of the photo at `position` in the session.
    fn photo_name(self, role: PhotoRole, item_index: usize, position: usize) -> String {
        match self {
            FlowKind::Meal => part_key(role, item_index),
            FlowKind::Product => format!("photo_{}", position + 1),
        }
    }

    fn package(
        self,
        images: &[CapturedImage],
        target_item_count: usize,
        profile: Option<&ProfilePayload>,
    ) -> Result<UploadBody, PackageError> {
        match self {
            FlowKind::Meal => build_meal(images, target_item_count, profile),
            FlowKind::Product => build_product(images, profile),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Capturing,
    ReadyToUpload,
    Uploading,
    AdviceShown(AdviceResult),
    UploadFailed,
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Capturing => "capturing",
            FlowState::ReadyToUpload => "ready to upload",
            FlowState::Uploading => "uploading",
            FlowState::AdviceShown(_) => "showing advice",
            FlowState::UploadFailed => "upload failed",
        }
    }
}

/// Holds the screen in `Uploading` while the advice request is in flight.
/// Dropped before `finish` (the request future was cancelled), it leaves `UploadFailed`.
struct UploadInFlight<'a> {
    state: &'a mut FlowState,
    finished: bool,
}

impl<'a> UploadInFlight<'a> {
    fn begin(state: &'a mut FlowState) -> Self {
        *state = FlowState::Uploading;
        Self {
            state,
            finished: false,
        }
    }

    fn finish(&mut self, outcome: FlowState) {
        *self.state = outcome;
        self.finished = true;
    }
}

impl Drop for UploadInFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state = FlowState::UploadFailed;
        }
    }
}

/// State machine shared by the meal and product screens.
///
/// `Idle -> Capturing -> ReadyToUpload -> Uploading -> AdviceShown | UploadFailed`.
/// Photos stay on disk after a failed upload so the request can be retried;
/// they are released after advice is shown or on `reset`.
pub struct AdviceFlow {
    kind: FlowKind,
    app: AppState,
    camera: Arc<dyn Camera>,
    user: UserSession,
    profile: Option<ProfilePayload>,
    session: Option<CaptureSession>,
    state: FlowState,
}

impl AdviceFlow {
    pub fn new(kind: FlowKind, app: AppState, camera: Arc<dyn Camera>, user: UserSession) -> Self {
        Self {
            kind,
            app,
            camera,
            user,
            profile: None,
            session: None,
            state: FlowState::Idle,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn user(&self) -> &UserSession {
        &self.user
    }

    pub fn profile(&self) -> Option<&ProfilePayload> {
        self.profile.as_ref()
    }

    pub fn images(&self) -> &[CapturedImage] {
        self.session.as_ref().map(|s| s.images()).unwrap_or(&[])
    }

    pub fn next_prompt(&self) -> Option<NextPrompt> {
        self.session.as_ref().map(|s| s.next_prompt())
    }

    pub fn advice(&self) -> Option<&AdviceResult> {
        match &self.state {
            FlowState::AdviceShown(advice) => Some(advice),
            _ => None,
        }
    }

    /// Asks for the camera and loads the user's profile. A missing profile is not
    /// an error here; `request_advice` reports it.
    #[instrument(skip(self), fields(kind = ?self.kind, user_id = %self.user.user_id))]
    pub async fn open(&mut self) -> Result<(), AppError> {
        if !self.camera.request_permission().await {
            warn!("camera permission denied");
            return Err(AppError::PermissionDenied);
        }
        if refresh_if_expired(self.app.auth.as_ref(), &mut self.user).await? {
            info!("id token refreshed");
        }
        self.profile = self.app.profiles.read_profile(&self.user).await.map_err(|e| {
            error!(error = %e, "profile load failed");
            e
        })?;
        if self.profile.is_none() {
            warn!("no personal data for user");
        }
        info!(profile_loaded = self.profile.is_some(), "advice screen opened");
        Ok(())
    }

    pub fn start(&mut self, target_item_count: i64) -> Result<(), AppError> {
        if self.state != FlowState::Idle {
            return Err(self.invalid("start capturing"));
        }
        let session = CaptureSession::start(target_item_count).map_err(|e| {
            warn!(error = %e, "invalid number of products");
            e
        })?;
        info!(session_id = %session.id(), products = session.target_item_count(), "capture started");
        self.session = Some(session);
        self.state = FlowState::Capturing;
        Ok(())
    }

    /// Takes the next photo and returns what to capture after it.
    #[instrument(skip(self), fields(kind = ?self.kind))]
    pub async fn take_picture(&mut self) -> Result<NextPrompt, AppError> {
        if matches!(self.state, FlowState::Idle | FlowState::Uploading | FlowState::AdviceShown(_)) {
            return Err(self.invalid("take a picture"));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(self.invalid("take a picture"));
        };
        if session.is_complete() {
            return Err(CaptureError::SessionComplete(session.required_images()).into());
        }

        let name = match session.next_prompt() {
            NextPrompt::Capture { role, item_index } => {
                self.kind.photo_name(role, item_index, session.images().len())
            }
            NextPrompt::Complete => {
                return Err(CaptureError::SessionComplete(session.required_images()).into())
            }
        };
        let shot = self.camera.take_picture().await.map_err(|e| {
            error!(error = %e, "camera failed");
            AppError::Camera(e)
        })?;
        let stored = self
            .app
            .photos
            .persist(session.id(), &shot, &name)
            .await;
        let stored = match stored {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "persist photo failed");
                if let Err(rm) = tokio::fs::remove_file(&shot).await {
                    warn!(error = %rm, path = %shot.display(), "remove camera shot failed");
                }
                return Err(AppError::Storage(e));
            }
        };
        session.record_capture(stored)?;

        let next = session.next_prompt();
        if session.is_complete() {
            self.state = FlowState::ReadyToUpload;
            info!(photos = session.images().len(), "all photos captured");
        }
        Ok(next)
    }

    /// Sends the photos and profile to the advice service. One request, no retry.
    #[instrument(skip(self), fields(kind = ?self.kind))]
    pub async fn request_advice(&mut self) -> Result<AdviceResult, AppError> {
        if matches!(self.state, FlowState::Uploading | FlowState::AdviceShown(_)) {
            return Err(self.invalid("request advice"));
        }
        let target = self.session.as_ref().map_or(0, |s| s.target_item_count());
        let body = self
            .kind
            .package(self.images(), target, self.profile.as_ref())
            .map_err(|e| {
                warn!(error = %e, "nothing to upload");
                e
            })?;

        let result = {
            let mut upload = UploadInFlight::begin(&mut self.state);
            let result = self.app.advice.submit(&body, self.kind.endpoint()).await;
            upload.finish(match &result {
                Ok(advice) => FlowState::AdviceShown(advice.clone()),
                Err(_) => FlowState::UploadFailed,
            });
            result
        };
        match result {
            Ok(advice) => {
                self.release_images().await;
                info!("advice shown");
                Ok(advice)
            }
            Err(e) => {
                error!(error = %e, "advice request failed; photos kept for retry");
                Err(e.into())
            }
        }
    }

    /// Takes every remaining photo, asks for advice, then releases the photos
    /// whatever the outcome. For callers that cannot offer a retry.
    pub async fn advise_once(&mut self) -> Result<AdviceResult, AppError> {
        let result = self.capture_and_request().await;
        self.reset().await;
        result
    }

    async fn capture_and_request(&mut self) -> Result<AdviceResult, AppError> {
        while let Some(prompt @ NextPrompt::Capture { .. }) = self.next_prompt() {
            info!(%prompt, "capturing");
            self.take_picture().await?;
        }
        self.request_advice().await
    }

    /// Drops the capture session and its photos. Valid from any state.
    pub async fn reset(&mut self) {
        self.release_images().await;
        self.state = FlowState::Idle;
        info!(kind = ?self.kind, "advice screen reset");
    }

    async fn release_images(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        for image in session.take_images() {
            if let Err(e) = self.app.photos.release(&image.storage_ref).await {
                warn!(error = %e, path = %image.storage_ref.path().display(), "release photo failed");
            }
        }
        if let Err(e) = self.app.photos.clear_session(session.id()).await {
            warn!(error = %e, session_id = %session.id(), "clear capture session failed");
        }
    }

    fn invalid(&self, action: &'static str) -> AppError {
        AppError::InvalidState {
            action,
            state: self.state.name(),
        }
    }
}
