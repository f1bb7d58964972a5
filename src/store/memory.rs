//! In-process store that remembers every object and every call.

use super::{ObjectStore, Visibility};
use crate::error::Pdf2JpegError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub visibility: Visibility,
}

/// A map-backed [`ObjectStore`].
///
/// Writes to keys registered with [`reject_key`](Self::reject_key) fail,
/// which lets tests exercise upload failures.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    rejected: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, e.g. a source PDF. Not counted as a call.
    pub fn insert(&self, key: impl Into<String>, body: Vec<u8>, content_type: &str) {
        self.lock_objects().insert(
            key.into(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                visibility: Visibility::Private,
            },
        );
    }

    /// Make every future write to `key` fail.
    pub fn reject_key(&self, key: impl Into<String>) {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.into());
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock_objects().get(key).cloned()
    }

    /// Sorted list of keys currently held.
    pub fn keys(&self) -> Vec<String> {
        self.lock_objects().keys().cloned().collect()
    }

    /// Number of `fetch` + `store` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, Pdf2JpegError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock_objects()
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| Pdf2JpegError::FetchFailed {
                key: key.to_string(),
                detail: "no such key".into(),
            })
    }

    async fn store(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), Pdf2JpegError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rejected = self
            .rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|k| k == key);
        if rejected {
            return Err(Pdf2JpegError::StoreFailed {
                key: key.to_string(),
                detail: "access denied".into(),
            });
        }
        self.lock_objects().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                visibility,
            },
        );
        Ok(())
    }
}
