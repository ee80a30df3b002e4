use std::sync::Arc;

use super::{AdviceFlow, FlowKind, FlowState};
use crate::advice::AdviceResult;
use crate::auth::UserSession;
use crate::camera::Camera;
use crate::capture::NextPrompt;
use crate::error::AppError;
use crate::state::AppState;

/// Single product screen: ingredients photo, nutrition table photo, advice.
pub struct ProductAdviceController {
    flow: AdviceFlow,
}

impl ProductAdviceController {
    pub fn new(app: AppState, camera: Arc<dyn Camera>, user: UserSession) -> Self {
        Self {
            flow: AdviceFlow::new(FlowKind::Product, app, camera, user),
        }
    }

    /// Opens the screen ready for the first photo.
    pub async fn open(&mut self) -> Result<(), AppError> {
        self.flow.open().await?;
        self.flow.start(1)
    }

    pub async fn take_picture(&mut self) -> Result<NextPrompt, AppError> {
        self.flow.take_picture().await
    }

    pub async fn request_advice(&mut self) -> Result<AdviceResult, AppError> {
        self.flow.request_advice().await
    }

    /// Captures the remaining photos and asks for advice in one go; photos are released either way.
    pub async fn advise_once(&mut self) -> Result<AdviceResult, AppError> {
        self.flow.advise_once().await
    }

    /// Drops both photos and waits for a new ingredients photo.
    pub async fn reset(&mut self) -> Result<(), AppError> {
        self.flow.reset().await;
        self.flow.start(1)
    }

    pub fn state(&self) -> &FlowState {
        self.flow.state()
    }

    pub fn flow(&self) -> &AdviceFlow {
        &self.flow
    }
}
