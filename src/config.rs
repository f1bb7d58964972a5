//! Configuration types for PDF-to-JPEG conversion.
//!
//! All pipeline behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Worker counts, render resolution and
//! the choice of rasteriser all live here so a run can be reproduced from
//! its logged config alone.

use crate::backend::RasterBackend;
use crate::error::Pdf2JpegError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a conversion request.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2jpeg::{ConversionConfig, RenderProfile};
///
/// let config = ConversionConfig::builder()
///     .profile(RenderProfile::Compact)
///     .conversion_workers(4)
///     .upload_workers(16)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rasterisation resolution of the large variant. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// JPEG quality for every variant. Range: 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Parallel page-range workers during conversion. Default: 2.
    ///
    /// Each worker runs one external rasteriser at a time, so this is also
    /// the number of concurrent `gs` processes.
    pub conversion_workers: usize,

    /// Parallel page-range workers during upload. Default: 10.
    pub upload_workers: usize,

    /// Image the small variant is derived from. Default: [`ResizeSource::Normal`].
    pub small_source: ResizeSource,

    /// Built-in rasteriser used when `backend` is `None`. Default: Ghostscript.
    pub backend_kind: BackendKind,

    /// Pre-constructed backend. Takes precedence over `backend_kind`.
    pub backend: Option<Arc<dyn RasterBackend>>,

    /// Ghostscript executable. Default: `gs`.
    pub ghostscript_program: String,

    /// ImageMagick executable used for resizing. Default: `convert`.
    pub resize_program: String,

    /// Parent directory for per-request scratch directories.
    /// If None, uses the system temp directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            jpeg_quality: 90,
            conversion_workers: 2,
            upload_workers: 10,
            small_source: ResizeSource::default(),
            backend_kind: BackendKind::default(),
            backend: None,
            ghostscript_program: "gs".to_string(),
            resize_program: "convert".to_string(),
            scratch_dir: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("conversion_workers", &self.conversion_workers)
            .field("upload_workers", &self.upload_workers)
            .field("small_source", &self.small_source)
            .field("backend_kind", &self.backend_kind)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("ghostscript_program", &self.ghostscript_program)
            .field("resize_program", &self.resize_program)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Not clamped: zero is rejected by [`build`](Self::build).
    pub fn conversion_workers(mut self, n: usize) -> Self {
        self.config.conversion_workers = n;
        self
    }

    /// Not clamped: zero is rejected by [`build`](Self::build).
    pub fn upload_workers(mut self, n: usize) -> Self {
        self.config.upload_workers = n;
        self
    }

    pub fn small_source(mut self, source: ResizeSource) -> Self {
        self.config.small_source = source;
        self
    }

    /// Apply a deployment preset (resolution and small-variant source).
    pub fn profile(mut self, profile: RenderProfile) -> Self {
        let (dpi, small_source) = profile.settings();
        self.config.dpi = dpi;
        self.config.small_source = small_source;
        self
    }

    pub fn backend_kind(mut self, kind: BackendKind) -> Self {
        self.config.backend_kind = kind;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn RasterBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn ghostscript_program(mut self, program: impl Into<String>) -> Self {
        self.config.ghostscript_program = program.into();
        self
    }

    pub fn resize_program(mut self, program: impl Into<String>) -> Self {
        self.config.resize_program = program.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2JpegError> {
        let c = &self.config;
        if c.conversion_workers == 0 {
            return Err(Pdf2JpegError::InvalidConfig(
                "Conversion workers must be ≥ 1".into(),
            ));
        }
        if c.upload_workers == 0 {
            return Err(Pdf2JpegError::InvalidConfig(
                "Upload workers must be ≥ 1".into(),
            ));
        }
        if c.ghostscript_program.trim().is_empty() || c.resize_program.trim().is_empty() {
            return Err(Pdf2JpegError::InvalidConfig(
                "External program names must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which already-produced image the small variant is resized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeSource {
    /// Resize the 800 px normal image (cheaper). (default)
    #[default]
    Normal,
    /// Resize the full-resolution large image (sharper).
    Large,
}

/// Built-in rasteriser implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External `gs` + ImageMagick processes. (default)
    #[default]
    Ghostscript,
    /// In-process pdfium + `image` crate.
    Pdfium,
}

/// Deployment presets.
///
/// | Profile | DPI | Small variant from |
/// |---------|-----|--------------------|
/// | Standard | 300 | normal |
/// | Compact  | 200 | large  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderProfile {
    #[default]
    Standard,
    Compact,
}

impl RenderProfile {
    fn settings(self) -> (u32, ResizeSource) {
        match self {
            RenderProfile::Standard => (300, ResizeSource::Normal),
            RenderProfile::Compact => (200, ResizeSource::Large),
        }
    }
}
