use std::path::PathBuf;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::dto::{advice_text, AdviceEndpoint, AdviceResult, ErrorResponse};
use crate::config::AdviceConfig;
use crate::upload::{PartContent, UploadBody};

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("advice service unreachable: {0}")]
    Network(#[source] reqwest::Error),
    #[error("advice service returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("malformed advice response: {0}")]
    MalformedResponse(String),
    #[error("read photo {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid form part: {0}")]
    InvalidPart(#[source] reqwest::Error),
}

/// Client of the remote advice service. One call per `submit`, no retries.
#[derive(Clone)]
pub struct AdviceClient {
    http: Client,
    base_url: String,
}

impl AdviceClient {
    pub fn new(config: &AdviceConfig) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("nutrichat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, &config.base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, endpoint: AdviceEndpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    #[instrument(skip(self, body), fields(parts = body.len()))]
    pub async fn submit(&self, body: &UploadBody, endpoint: AdviceEndpoint) -> Result<AdviceResult, AdviceError> {
        let form = to_form(body).await?;
        let response = self
            .http
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "advice request failed");
                AdviceError::Network(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(AdviceError::Network)?;
        if !status.is_success() {
            let message = ErrorResponse::message(&text);
            warn!(%status, %message, "advice service error");
            return Err(AdviceError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let advice = advice_text(&text).map_err(|e| {
            warn!(error = %e, "unexpected advice response");
            AdviceError::MalformedResponse(e)
        })?;
        info!(chars = advice.len(), "advice received");
        Ok(AdviceResult {
            text: advice,
            produced_at: OffsetDateTime::now_utc(),
        })
    }
}

async fn to_form(body: &UploadBody) -> Result<Form, AdviceError> {
    let mut form = Form::new();
    for part in body.parts() {
        form = match &part.content {
            PartContent::File {
                path,
                file_name,
                content_type,
            } => {
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|source| AdviceError::Attachment {
                        path: path.clone(),
                        source,
                    })?;
                let file = Part::bytes(data)
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(AdviceError::InvalidPart)?;
                form.part(part.name.clone(), file)
            }
            PartContent::Text(text) => form.text(part.name.clone(), text.clone()),
        };
    }
    Ok(form)
}
