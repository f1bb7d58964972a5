//! # pdf2jpeg
//!
//! Convert every page of a PDF into three JPEG variants and publish them to
//! an object store.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    validate a local file, or fetch it from the store
//!  ├─ 2. Count    ask the backend how many pages the document has
//!  ├─ 3. Convert  N workers, contiguous page ranges:
//!  │              large (full DPI) → normal (≤ 800 px) → small (≤ 300 px)
//!  ├─ 4. Upload   M workers, contiguous page ranges, public-read image/jpeg
//!  └─ 5. Output   per-worker reports + stats
//! ```
//!
//! Phase 4 starts only after every worker of phase 3 has finished. A worker
//! that hits an error stops its own range; the other workers carry on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2jpeg::{convert, ConversionConfig, LocalObjectStore, PathTemplate, RemoteTemplates};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(LocalObjectStore::new("bucket").await?);
//!     let remote = RemoteTemplates {
//!         normal: PathTemplate::parse("jpeg", "docs/42/page%d.jpg")?,
//!         small: PathTemplate::parse("jpeg_small", "docs/42/page%d-small.jpg")?,
//!         large: PathTemplate::parse("jpeg_large", "docs/42/page%d-large.jpg")?,
//!     };
//!     let config = ConversionConfig::default();
//!     let output = convert("document.pdf", &remote, store, &config).await?;
//!     eprintln!("{} objects stored", output.stats.uploaded_objects);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2jpeg` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2jpeg = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod store;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{GhostscriptBackend, PdfiumBackend, RasterBackend};
pub use config::{
    BackendKind, ConversionConfig, ConversionConfigBuilder, RenderProfile, ResizeSource,
};
pub use convert::{convert, convert_request, convert_sync, inspect};
pub use error::{ErrorKind, PageError, Pdf2JpegError};
pub use output::{
    ConversionJob, ConversionOutput, ConversionStats, ImageVariant, PhaseReport, UploadTarget,
    WorkerReport,
};
pub use pipeline::partition::{plan, PageRange};
pub use request::{FormFields, RemoteTemplates};
pub use store::{HttpObjectStore, LocalObjectStore, MemoryObjectStore, ObjectStore, Visibility};
pub use template::PathTemplate;
