//! A directory used as a bucket.
//!
//! Objects live at `<root>/<key>`. Content type and visibility have nowhere
//! to go on a plain filesystem, so they are written next to the object as
//! `<key>.meta.json`.

use super::{ObjectStore, Visibility};
use crate::error::Pdf2JpegError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Sidecar metadata for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub visibility: Visibility,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create the store, creating `root` if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, Pdf2JpegError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Pdf2JpegError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing anything that escapes it.
    pub fn object_path(&self, key: &str) -> Option<PathBuf> {
        let rel = Path::new(key);
        let safe = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        safe.then(|| self.root.join(rel))
    }

    /// Read the sidecar written by [`ObjectStore::store`].
    pub async fn metadata(&self, key: &str) -> Result<ObjectMetadata, Pdf2JpegError> {
        let path = self.meta_path(key)?;
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|e| Pdf2JpegError::FetchFailed {
                key: key.to_string(),
                detail: e.to_string(),
            })?;
        serde_json::from_slice(&raw).map_err(|e| Pdf2JpegError::FetchFailed {
            key: key.to_string(),
            detail: format!("corrupt metadata: {e}"),
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, Pdf2JpegError> {
        self.object_path(key)
            .ok_or_else(|| Pdf2JpegError::StoreFailed {
                key: key.to_string(),
                detail: "key must be a relative path without '..'".into(),
            })
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, Pdf2JpegError> {
        let mut path = self.resolve(key)?.into_os_string();
        path.push(".meta.json");
        Ok(PathBuf::from(path))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, Pdf2JpegError> {
        let path = self.resolve(key).map_err(|e| Pdf2JpegError::FetchFailed {
            key: key.to_string(),
            detail: e.to_string(),
        })?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Pdf2JpegError::FetchFailed {
                key: key.to_string(),
                detail: e.to_string(),
            })
    }

    async fn store(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), Pdf2JpegError> {
        let path = self.resolve(key)?;
        let failed = |e: std::io::Error| Pdf2JpegError::StoreFailed {
            key: key.to_string(),
            detail: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }
        let meta = ObjectMetadata {
            content_type: content_type.to_string(),
            visibility,
            size: body.len() as u64,
        };
        tokio::fs::write(&path, body).await.map_err(failed)?;

        let meta_json = serde_json::to_vec_pretty(&meta).map_err(|e| Pdf2JpegError::StoreFailed {
            key: key.to_string(),
            detail: e.to_string(),
        })?;
        tokio::fs::write(self.meta_path(key)?, meta_json)
            .await
            .map_err(failed)?;

        debug!("Stored {} ({} bytes)", path.display(), meta.size);
        Ok(())
    }
}
