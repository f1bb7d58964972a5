//! Rasteriser/resizer capability.
//!
//! The coordinators never care how pages become JPEGs; they only call
//! [`RasterBackend`]. Two implementations ship with the crate:
//!
//! * [`GhostscriptBackend`] — shells out to `gs` and ImageMagick (default).
//! * [`PdfiumBackend`] — renders in-process through `pdfium-render` and
//!   resizes with the `image` crate.
//!
//! Tests and embedders can supply their own through
//! [`crate::config::ConversionConfigBuilder::backend`].

pub mod ghostscript;
pub mod pdfium;

pub use ghostscript::GhostscriptBackend;
pub use pdfium::PdfiumBackend;

use crate::config::{BackendKind, ConversionConfig};
use crate::error::Pdf2JpegError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Something that can count, rasterise and resize.
///
/// Implementations are shared across concurrently running workers, each
/// working on a disjoint page range, so they must be `Send + Sync`.
#[async_trait]
pub trait RasterBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Total number of pages in `doc`.
    async fn count_pages(&self, doc: &Path) -> Result<u32, Pdf2JpegError>;

    /// Rasterise the single 1-indexed `page` of `doc` to a JPEG at `out`.
    async fn rasterize_page(&self, doc: &Path, page: u32, out: &Path)
        -> Result<(), Pdf2JpegError>;

    /// Write a copy of `src` to `dst` that fits inside `max_w` × `max_h`,
    /// keeping the aspect ratio and never upscaling.
    async fn resize(
        &self,
        src: &Path,
        max_w: u32,
        max_h: u32,
        dst: &Path,
    ) -> Result<(), Pdf2JpegError>;
}

/// Pick the backend for a conversion, from most to least specific.
///
/// 1. A pre-built backend in `config.backend` is used as-is.
/// 2. Otherwise `config.backend_kind` selects a built-in implementation.
pub fn resolve_backend(config: &ConversionConfig) -> Arc<dyn RasterBackend> {
    if let Some(ref backend) = config.backend {
        return Arc::clone(backend);
    }
    match config.backend_kind {
        BackendKind::Ghostscript => Arc::new(GhostscriptBackend::from_config(config)),
        BackendKind::Pdfium => Arc::new(PdfiumBackend::from_config(config)),
    }
}
