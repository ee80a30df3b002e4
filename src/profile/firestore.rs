use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Number, Value};
use tracing::{debug, instrument, warn};

use super::dto::ProfilePayload;
use super::{ProfileError, ProfileStore};
use crate::auth::UserSession;
use crate::config::FirebaseConfig;
use crate::firebase::error_code;

/// Profile documents stored at `users/{uid}` through the Firestore REST API.
#[derive(Clone)]
pub struct FirestoreProfileStore {
    http: Client,
    documents_url: String,
}

impl FirestoreProfileStore {
    pub fn new(http: Client, config: &FirebaseConfig) -> Self {
        Self {
            http,
            documents_url: format!(
                "{}/v1/projects/{}/databases/(default)/documents",
                config.firestore_url.trim_end_matches('/'),
                config.project_id
            ),
        }
    }

    fn user_doc(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.documents_url, user_id)
    }

    async fn patch(
        &self,
        session: &UserSession,
        profile: &ProfilePayload,
        field_paths: &[&str],
    ) -> Result<(), ProfileError> {
        let query: Vec<(&str, &str)> = field_paths
            .iter()
            .map(|f| ("updateMask.fieldPaths", *f))
            .collect();
        let response = self
            .http
            .patch(self.user_doc(session.user_id()))
            .bearer_auth(&session.id_token)
            .query(&query)
            .json(&json!({ "fields": encode_fields(profile.as_map()) }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let code = error_code(&response.text().await?);
            warn!(%status, %code, "profile write rejected");
            return Err(ProfileError::Rejected { status: status.as_u16(), code });
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FirestoreProfileStore {
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn read_profile(&self, session: &UserSession) -> Result<Option<ProfilePayload>, ProfileError> {
        let response = self
            .http
            .get(self.user_doc(session.user_id()))
            .bearer_auth(&session.id_token)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("no profile document");
            return Ok(None);
        }
        let text = response.text().await?;
        if !status.is_success() {
            let code = error_code(&text);
            warn!(%status, %code, "profile read rejected");
            return Err(ProfileError::Rejected { status: status.as_u16(), code });
        }
        let doc: Value =
            serde_json::from_str(&text).map_err(|e| ProfileError::MalformedResponse(e.to_string()))?;
        let fields = match doc.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields),
            Some(_) => return Err(ProfileError::MalformedResponse("fields is not an object".into())),
            None => Map::new(),
        };
        Ok(Some(ProfilePayload::from_map(fields)))
    }

    #[instrument(skip(self, session, profile), fields(user_id = %session.user_id))]
    async fn write_profile(&self, session: &UserSession, profile: &ProfilePayload) -> Result<(), ProfileError> {
        self.patch(session, profile, &[]).await?;
        debug!("profile document replaced");
        Ok(())
    }

    #[instrument(skip(self, session, fields), fields(user_id = %session.user_id))]
    async fn merge_profile(
        &self,
        session: &UserSession,
        fields: &ProfilePayload,
        field_paths: &[&str],
    ) -> Result<(), ProfileError> {
        // a masked path missing from `fields` is deleted from the document
        self.patch(session, fields, field_paths).await?;
        debug!(fields = field_paths.len(), "profile document merged");
        Ok(())
    }
}

pub(crate) fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub(crate) fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "booleanValue" | "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            inner.clone()
        }
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        "geoPointValue" => inner.clone(),
        _ => Value::Null,
    }
}
