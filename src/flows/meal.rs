use std::sync::Arc;

use super::{AdviceFlow, FlowKind, FlowState};
use crate::advice::AdviceResult;
use crate::auth::UserSession;
use crate::camera::Camera;
use crate::capture::NextPrompt;
use crate::error::AppError;
use crate::state::AppState;

/// Meal screen: the user picks how many products, then photographs each one twice.
pub struct MealAdviceController {
    flow: AdviceFlow,
}

impl MealAdviceController {
    pub fn new(app: AppState, camera: Arc<dyn Camera>, user: UserSession) -> Self {
        Self {
            flow: AdviceFlow::new(FlowKind::Meal, app, camera, user),
        }
    }

    pub async fn open(&mut self) -> Result<(), AppError> {
        self.flow.open().await
    }

    pub fn start(&mut self, product_count: i64) -> Result<(), AppError> {
        self.flow.start(product_count)
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

    pub async fn reset(&mut self) {
        self.flow.reset().await
    }

    pub fn state(&self) -> &FlowState {
        self.flow.state()
    }

    pub fn flow(&self) -> &AdviceFlow {
        &self.flow
    }
}

#[cfg(test)]
mod meal_tests {
    use super::*;
    use crate::profile::ProfilePayload;
    use crate::testing::{fake_state, test_session, FakeAdviceServer, FakeCamera};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn two_products_are_sent_in_capture_order() {
        let dir = tempfile::tempdir().unwrap();
        let server = FakeAdviceServer::start(StatusCode::OK, json!({ "advice": "Fine choice" })).await;
        let (app, backend) = fake_state(&server.url, &dir.path().join("cache"));
        let mut profile = ProfilePayload::new();
        profile.insert("gender", json!("female"));
        backend.put_profile("uid-1", profile);

        let camera = Arc::new(FakeCamera::new(dir.path()));
        let mut meal = MealAdviceController::new(app, camera, test_session("uid-1"));
        meal.open().await.unwrap();
        meal.start(2).unwrap();
        let mut prompts = vec![meal.flow().next_prompt().unwrap().to_string()];
        for _ in 0..4 {
            prompts.push(meal.take_picture().await.unwrap().to_string());
        }
        assert_eq!(
            prompts,
            vec![
                "Ingredients for Product 1",
                "Nutritional Table for Product 1",
                "Ingredients for Product 2",
                "Nutritional Table for Product 2",
                "All photos captured",
            ]
        );

        let advice = meal.request_advice().await.unwrap();
        assert_eq!(advice.text, "Fine choice");
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].1,
            vec![
                "ingredients_image_0",
                "nutrition_image_0",
                "ingredients_image_1",
                "nutrition_image_1",
                "personal_data",
            ]
        );

        meal.reset().await;
        assert_eq!(meal.state(), &FlowState::Idle);
        meal.start(1).unwrap();
        assert_eq!(meal.state(), &FlowState::Capturing);
    }
}
