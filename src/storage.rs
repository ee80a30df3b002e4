use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

/// Handle to a captured photo sitting in temporary storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRef {
    path: PathBuf,
}

impl StorageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Moves a freshly taken photo to `<session>/<name>.<ext>`.
    async fn persist(&self, session_id: Uuid, from: &Path, name: &str) -> anyhow::Result<StorageRef>;
    /// Deletes the photo. Releasing an already released photo is not an error.
    async fn release(&self, photo: &StorageRef) -> anyhow::Result<()>;
    async fn clear_session(&self, session_id: Uuid) -> anyhow::Result<()>;
}

/// Photos kept under a cache directory, one sub-directory per capture session.
#[derive(Debug, Clone)]
pub struct CacheDirStore {
    root: PathBuf,
}

impl CacheDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.root.join(session_id.to_string())
    }
}

#[async_trait]
impl PhotoStore for CacheDirStore {
    async fn persist(&self, session_id: Uuid, from: &Path, name: &str) -> anyhow::Result<StorageRef> {
        let dir = self.session_dir(session_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create cache dir {}", dir.display()))?;

        let ext = ext_from_path(from).unwrap_or("jpg");
        let dest = dir.join(format!("{}.{}", name, ext));

        // rename fails across filesystems; fall back to copy + remove
        if tokio::fs::rename(from, &dest).await.is_err() {
            tokio::fs::copy(from, &dest)
                .await
                .with_context(|| format!("move {} to {}", from.display(), dest.display()))?;
            tokio::fs::remove_file(from)
                .await
                .with_context(|| format!("remove {}", from.display()))?;
        }
        debug!(session_id = %session_id, path = %dest.display(), "photo persisted");
        Ok(StorageRef::new(dest))
    }

    async fn release(&self, photo: &StorageRef) -> anyhow::Result<()> {
        match tokio::fs::remove_file(photo.path()).await {
            Ok(()) => {
                debug!(path = %photo.path().display(), "photo released");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete {}", photo.path().display())),
        }
    }

    async fn clear_session(&self, session_id: Uuid) -> anyhow::Result<()> {
        let dir = self.session_dir(session_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", dir.display())),
        }
    }
}

fn ext_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpeg" | "jpg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "heic" => Some("heic"),
        _ => None,
    }
}
