use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Source of photos for a capture session.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn request_permission(&self) -> bool;
    /// Takes one photo and returns where it was written. The caller owns the file.
    async fn take_picture(&self) -> anyhow::Result<PathBuf>;
}

/// Camera replaying image files from disk, in order.
///
/// Each shot is a copy in `scratch`, so the photo store may move or delete
/// it without touching the originals.
pub struct FileQueueCamera {
    queue: Mutex<VecDeque<PathBuf>>,
    scratch: PathBuf,
    shots: AtomicUsize,
}

impl FileQueueCamera {
    pub fn new(images: impl IntoIterator<Item = PathBuf>, scratch: impl Into<PathBuf>) -> Self {
        Self {
            queue: Mutex::new(images.into_iter().collect()),
            scratch: scratch.into(),
            shots: AtomicUsize::new(0),
        }
    }

    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl Camera for FileQueueCamera {
    /// Granted when every queued file can be read.
    async fn request_permission(&self) -> bool {
        let queue = self.queue.lock().await;
        for path in queue.iter() {
            if let Err(e) = tokio::fs::metadata(path).await {
                warn!(error = %e, path = %path.display(), "image not readable");
                return false;
            }
        }
        true
    }

    async fn take_picture(&self) -> anyhow::Result<PathBuf> {
        let source = self
            .queue
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow!("no more images to capture"))?;

        tokio::fs::create_dir_all(&self.scratch)
            .await
            .with_context(|| format!("create {}", self.scratch.display()))?;
        let n = self.shots.fetch_add(1, Ordering::SeqCst);
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_lowercase();
        let shot = self.scratch.join(format!("shot_{n}.{ext}"));
        tokio::fs::copy(&source, &shot)
            .await
            .with_context(|| format!("read {}", source.display()))?;
        debug!(source = %source.display(), shot = %shot.display(), "picture taken");
        Ok(shot)
    }
}
