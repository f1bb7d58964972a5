//! S3-compatible store over plain HTTP.
//!
//! Objects are addressed as `{base_url}/{key}`. Writes are a single `PUT`
//! carrying `Content-Type` and the canned ACL in `x-amz-acl`; there is no
//! multipart upload and no retry. Request signing is left to the endpoint
//! (pre-authorised bucket policy, signing proxy, MinIO anonymous access…).

use super::{ObjectStore, Visibility};
use crate::error::Pdf2JpegError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Header carrying the canned ACL.
const ACL_HEADER: &str = "x-amz-acl";

#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    /// `base_url` is the bucket root, e.g. `https://bucket.s3.amazonaws.com`.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, Pdf2JpegError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Pdf2JpegError::InvalidConfig(format!(
                "Object store URL must be HTTP/HTTPS, got '{base_url}'"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Pdf2JpegError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL of `key`.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, Pdf2JpegError> {
        let failed = |detail: String| Pdf2JpegError::FetchFailed {
            key: key.to_string(),
            detail,
        };
        let url = self.object_url(key);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn store(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), Pdf2JpegError> {
        let failed = |detail: String| Pdf2JpegError::StoreFailed {
            key: key.to_string(),
            detail,
        };
        let url = self.object_url(key);
        debug!("PUT {} ({} bytes, {})", url, body.len(), visibility);

        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .header(ACL_HEADER, visibility.as_acl())
            .body(body)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}
