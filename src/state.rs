use std::sync::Arc;

use anyhow::Context;
use reqwest::Client;

use crate::advice::AdviceClient;
use crate::auth::{AuthBackend, FirebaseAuth};
use crate::config::AppConfig;
use crate::profile::{FirestoreProfileStore, ProfileStore};
use crate::storage::{CacheDirStore, PhotoStore};

/// Everything the controllers share: configuration and the backend clients.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<dyn AuthBackend>,
    pub profiles: Arc<dyn ProfileStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub advice: AdviceClient,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        Self::from_config(config)
    }

    pub fn from_config(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        // Firebase calls share one connection pool; advice uploads get their own timeout
        let http = Client::builder()
            .user_agent(concat!("nutrichat/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build firebase http client")?;

        let auth = Arc::new(FirebaseAuth::new(http.clone(), &config.firebase)) as Arc<dyn AuthBackend>;
        let profiles =
            Arc::new(FirestoreProfileStore::new(http, &config.firebase)) as Arc<dyn ProfileStore>;
        let photos = Arc::new(CacheDirStore::new(&config.cache_dir)) as Arc<dyn PhotoStore>;
        let advice = AdviceClient::new(&config.advice).context("build advice http client")?;

        Ok(Self {
            config,
            auth,
            profiles,
            photos,
            advice,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        auth: Arc<dyn AuthBackend>,
        profiles: Arc<dyn ProfileStore>,
        photos: Arc<dyn PhotoStore>,
        advice: AdviceClient,
    ) -> Self {
        Self {
            config,
            auth,
            profiles,
            photos,
            advice,
        }
    }
}
