//! Object store client.
//!
//! The pipeline only needs two operations: fetch a source document and
//! store a finished image. Credentials, bucket selection and request
//! signing are the concern of whoever builds the store.
//!
//! | Store | Use |
//! |-------|-----|
//! | [`HttpObjectStore`]   | S3-compatible endpoint (`PUT` / `GET` with `x-amz-acl`) |
//! | [`LocalObjectStore`]  | a directory acting as a bucket |
//! | [`MemoryObjectStore`] | tests and dry runs |

pub mod http;
pub mod local;
pub mod memory;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use crate::error::Pdf2JpegError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content type of every uploaded variant.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Who may read a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    Private,
    PublicRead,
}

impl Visibility {
    /// Canned ACL name as understood by S3-compatible stores.
    pub fn as_acl(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::PublicRead => "public-read",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_acl())
    }
}

/// Remote storage for source documents and rendered images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the whole object at `key`.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, Pdf2JpegError>;

    /// Write `body` to `key`, replacing any existing object.
    async fn store(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), Pdf2JpegError>;
}
