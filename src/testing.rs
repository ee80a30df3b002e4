//! Test doubles shared by the controller tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use reqwest::Client;
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::advice::AdviceClient;
use crate::auth::{AuthBackend, AuthError, UserSession};
use crate::camera::Camera;
use crate::config::{AdviceConfig, AppConfig, FirebaseConfig};
use crate::profile::{ProfileError, ProfilePayload, ProfileStore};
use crate::state::AppState;
use crate::storage::{CacheDirStore, PhotoStore};

pub(crate) fn test_session(user_id: &str) -> UserSession {
    UserSession {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
        id_token: format!("id-token-{user_id}"),
        refresh_token: format!("refresh-{user_id}"),
        expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
    }
}

/// In-memory accounts and profile documents.
#[derive(Default)]
pub(crate) struct MemoryBackend {
    accounts: Mutex<HashMap<String, (String, String)>>,
    profiles: Mutex<HashMap<String, ProfilePayload>>,
    pub refreshes: AtomicUsize,
}

impl MemoryBackend {
    pub fn put_profile(&self, user_id: &str, profile: ProfilePayload) {
        self.profiles.lock().unwrap().insert(user_id.to_string(), profile);
    }

    pub fn profile(&self, user_id: &str) -> Option<ProfilePayload> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AuthError::Rejected("EMAIL_EXISTS".into()));
        }
        let user_id = format!("uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (user_id.clone(), password.to_string()));
        Ok(UserSession {
            email: email.to_string(),
            ..test_session(&user_id)
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        match self.accounts.lock().unwrap().get(email) {
            Some((user_id, stored)) if stored == password => Ok(UserSession {
                email: email.to_string(),
                ..test_session(user_id)
            }),
            _ => Err(AuthError::Rejected("INVALID_LOGIN_CREDENTIALS".into())),
        }
    }

    async fn refresh(&self, session: &UserSession) -> Result<UserSession, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(UserSession {
            id_token: format!("{}-refreshed", session.id_token),
            expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
            ..session.clone()
        })
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn read_profile(&self, session: &UserSession) -> Result<Option<ProfilePayload>, ProfileError> {
        Ok(self.profile(&session.user_id))
    }

    async fn write_profile(&self, session: &UserSession, profile: &ProfilePayload) -> Result<(), ProfileError> {
        self.put_profile(&session.user_id, profile.clone());
        Ok(())
    }

    async fn merge_profile(
        &self,
        session: &UserSession,
        fields: &ProfilePayload,
        field_paths: &[&str],
    ) -> Result<(), ProfileError> {
        let mut profiles = self.profiles.lock().unwrap();
        let doc = profiles.entry(session.user_id.clone()).or_default();
        let mut map = std::mem::take(doc).into_map();
        for path in field_paths {
            match fields.get(path) {
                Some(v) => {
                    map.insert(path.to_string(), v.clone());
                }
                None => {
                    map.remove(*path);
                }
            }
        }
        *doc = ProfilePayload::from_map(map);
        Ok(())
    }
}

/// Camera writing small fake JPEGs into `dir`.
pub(crate) struct FakeCamera {
    granted: bool,
    dir: PathBuf,
    shots: AtomicUsize,
}

impl FakeCamera {
    pub fn new(dir: &Path) -> Self {
        Self {
            granted: true,
            dir: dir.to_path_buf(),
            shots: AtomicUsize::new(0),
        }
    }

    pub fn denied(dir: &Path) -> Self {
        Self {
            granted: false,
            ..Self::new(dir)
        }
    }

    pub fn shots(&self) -> usize {
        self.shots.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn request_permission(&self) -> bool {
        self.granted
    }

    async fn take_picture(&self) -> anyhow::Result<PathBuf> {
        let n = self.shots.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("IMG_{n}.jpg"));
        tokio::fs::write(&path, format!("jpeg-{n}")).await?;
        Ok(path)
    }
}

/// Request seen by the fake advice service: route and multipart field names.
pub(crate) type ReceivedRequest = (String, Vec<String>);

#[derive(Clone)]
struct Recorder {
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    status: StatusCode,
    body: Arc<Value>,
}

/// Advice service on a local port answering every request with a fixed response.
pub(crate) struct FakeAdviceServer {
    pub url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl FakeAdviceServer {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let recorder = Recorder {
            requests: Arc::new(Mutex::new(Vec::new())),
            status,
            body: Arc::new(body),
        };
        let requests = recorder.requests.clone();
        let app = Router::new()
            .route("/meal-advice", post(advise))
            .route("/product-advice/", post(advise))
            .with_state(recorder);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn advise(
    State(recorder): State<Recorder>,
    uri: Uri,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut names = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        names.push(field.name().unwrap_or_default().to_string());
        let _ = field.bytes().await;
    }
    recorder
        .requests
        .lock()
        .unwrap()
        .push((uri.path().to_string(), names));
    (recorder.status, Json((*recorder.body).clone()))
}

/// App state backed by `MemoryBackend`, a cache dir store and an advice client for `advice_url`.
pub(crate) fn fake_state(advice_url: &str, cache_dir: &Path) -> (AppState, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::default());
    let config = Arc::new(AppConfig {
        advice: AdviceConfig {
            base_url: advice_url.to_string(),
            timeout_secs: 5,
        },
        firebase: FirebaseConfig::local("http://127.0.0.1:9", "test-project"),
        cache_dir: cache_dir.to_path_buf(),
    });
    let state = AppState::from_parts(
        config,
        backend.clone() as Arc<dyn AuthBackend>,
        backend.clone() as Arc<dyn ProfileStore>,
        Arc::new(CacheDirStore::new(cache_dir)) as Arc<dyn PhotoStore>,
        AdviceClient::with_client(Client::new(), advice_url),
    );
    (state, backend)
}
