use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

const GOOGLE_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
const GOOGLE_SECURETOKEN_URL: &str = "https://securetoken.googleapis.com";
const GOOGLE_FIRESTORE_URL: &str = "https://firestore.googleapis.com";

#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_domain: Option<String>,
    pub storage_bucket: Option<String>,
    pub identity_url: String,
    pub securetoken_url: String,
    pub firestore_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdviceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub advice: AdviceConfig,
    pub firebase: FirebaseConfig,
    pub cache_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let advice = AdviceConfig {
            base_url: std::env::var("ADVICE_BASE_URL").context("ADVICE_BASE_URL is not set")?,
            timeout_secs: std::env::var("ADVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(120),
        };
        let firebase = FirebaseConfig {
            api_key: std::env::var("FIREBASE_API_KEY").context("FIREBASE_API_KEY is not set")?,
            project_id: std::env::var("FIREBASE_PROJECT_ID")
                .context("FIREBASE_PROJECT_ID is not set")?,
            auth_domain: std::env::var("FIREBASE_AUTH_DOMAIN").ok(),
            storage_bucket: std::env::var("FIREBASE_STORAGE_BUCKET").ok(),
            identity_url: std::env::var("FIREBASE_IDENTITY_URL")
                .unwrap_or_else(|_| GOOGLE_IDENTITY_URL.into()),
            securetoken_url: std::env::var("FIREBASE_SECURETOKEN_URL")
                .unwrap_or_else(|_| GOOGLE_SECURETOKEN_URL.into()),
            firestore_url: std::env::var("FIREBASE_FIRESTORE_URL")
                .unwrap_or_else(|_| GOOGLE_FIRESTORE_URL.into()),
        };
        let cache_dir = std::env::var("NUTRICHAT_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("nutrichat"));
        Ok(Self {
            advice,
            firebase,
            cache_dir,
        })
    }
}

impl FirebaseConfig {
    /// Config pointing every Firebase endpoint at one base url (emulator, test server).
    pub fn local(base_url: &str, project_id: &str) -> Self {
        Self {
            api_key: "local-api-key".into(),
            project_id: project_id.into(),
            auth_domain: None,
            storage_bucket: None,
            identity_url: base_url.into(),
            securetoken_url: base_url.into(),
            firestore_url: base_url.into(),
        }
    }
}
