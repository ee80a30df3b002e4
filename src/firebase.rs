//! Helpers shared by the Identity Toolkit and Firestore REST clients.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Extracts the error code from a Firebase error body.
///
/// Identity Toolkit answers `{"error":{"message":"WEAK_PASSWORD : Password should be ..."}}`,
/// Firestore answers `{"error":{"status":"PERMISSION_DENIED","message":"..."}}`.
pub fn error_code(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env
                .error
                .message
                .split(" : ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            if code.is_empty() {
                env.error.status.unwrap_or_else(|| "UNKNOWN".into())
            } else {
                code
            }
        }
        Err(_) if body.trim().is_empty() => "UNKNOWN".into(),
        Err(_) => body.trim().chars().take(200).collect(),
    }
}
