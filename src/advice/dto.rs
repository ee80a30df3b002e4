use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

/// Remote advice routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceEndpoint {
    Meal,
    Product,
}

impl AdviceEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            AdviceEndpoint::Meal => "/meal-advice",
            AdviceEndpoint::Product => "/product-advice/",
        }
    }
}

/// Advice text shown to the user; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceResult {
    pub text: String,
    pub produced_at: OffsetDateTime,
}

/// Error body of the advice service: `{"error": "...", "details": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn message(body: &str) -> String {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(ErrorResponse { error, details: Some(d) }) => format!("{error} ({d})"),
            Ok(ErrorResponse { error, details: None }) => error,
            Err(_) => body.trim().chars().take(200).collect(),
        }
    }
}

/// Pulls the `advice` string out of a success body.
pub(crate) fn advice_text(body: &str) -> Result<String, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("not JSON: {e}"))?;
    match value.get("advice") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(format!("advice is not a string: {other}")),
        None => Err("missing advice field".into()),
    }
}
