//! In-process backend: pdfium for rasterisation, `image` for resizing.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. JPEG encoding and
//! Lanczos resampling are CPU-bound too. Every call therefore runs on the
//! blocking pool so the Tokio worker threads stay free for uploads.
//!
//! The document is reopened for every page. That keeps the trait stateless;
//! the `thread_safe` feature serialises pdfium access anyway.

use super::RasterBackend;
use crate::config::ConversionConfig;
use crate::error::Pdf2JpegError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    dpi: u32,
    jpeg_quality: u8,
    library_path: Option<PathBuf>,
}

impl PdfiumBackend {
    pub fn new(dpi: u32, jpeg_quality: u8) -> Self {
        Self {
            dpi,
            jpeg_quality,
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.dpi, config.jpeg_quality)
    }

    /// Use an explicit libpdfium instead of `PDFIUM_LIB_PATH` / the system one.
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }
}

#[async_trait]
impl RasterBackend for PdfiumBackend {
    fn name(&self) -> &str {
        "pdfium"
    }

    async fn count_pages(&self, doc: &Path) -> Result<u32, Pdf2JpegError> {
        let doc = doc.to_path_buf();
        let lib = self.library_path.clone();
        tokio::task::spawn_blocking(move || count_pages_blocking(lib.as_deref(), &doc))
            .await
            .map_err(|e| Pdf2JpegError::Internal(format!("Page count task panicked: {}", e)))?
    }

    async fn rasterize_page(
        &self,
        doc: &Path,
        page: u32,
        out: &Path,
    ) -> Result<(), Pdf2JpegError> {
        let doc = doc.to_path_buf();
        let out = out.to_path_buf();
        let lib = self.library_path.clone();
        let (dpi, quality) = (self.dpi, self.jpeg_quality);
        tokio::task::spawn_blocking(move || {
            render_page_blocking(lib.as_deref(), &doc, page, dpi, quality, &out)
        })
        .await
        .map_err(|e| Pdf2JpegError::Internal(format!("Render task panicked: {}", e)))?
    }

    async fn resize(
        &self,
        src: &Path,
        max_w: u32,
        max_h: u32,
        dst: &Path,
    ) -> Result<(), Pdf2JpegError> {
        let src = src.to_path_buf();
        let dst = dst.to_path_buf();
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || resize_file(&src, max_w, max_h, &dst, quality))
            .await
            .map_err(|e| Pdf2JpegError::Internal(format!("Resize task panicked: {}", e)))?
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, Pdf2JpegError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2JpegError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn count_pages_blocking(library_path: Option<&Path>, doc: &Path) -> Result<u32, Pdf2JpegError> {
    let pdfium = bind_pdfium(library_path)?;
    let document =
        pdfium
            .load_pdf_from_file(doc, None)
            .map_err(|e| Pdf2JpegError::PageCountFailed {
                path: doc.to_path_buf(),
                detail: format!("{:?}", e),
            })?;
    Ok(document.pages().len() as u32)
}

fn render_page_blocking(
    library_path: Option<&Path>,
    doc: &Path,
    page: u32,
    dpi: u32,
    quality: u8,
    out: &Path,
) -> Result<(), Pdf2JpegError> {
    let failed = |detail: String| Pdf2JpegError::RasterisationFailed { page, detail };

    let pdfium = bind_pdfium(library_path)?;
    let document = pdfium
        .load_pdf_from_file(doc, None)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let index = page
        .checked_sub(1)
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| failed("page number out of range".into()))?;
    let pdf_page = document
        .pages()
        .get(index)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let render_config =
        PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / PDF_POINTS_PER_INCH);
    let bitmap = pdf_page
        .render_with_config(&render_config)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page,
        image.width(),
        image.height()
    );
    write_jpeg(&image, out, quality)
}

/// Scale `img` down to fit `max_w` × `max_h`; smaller images come back as-is.
pub fn fit_within(img: &DynamicImage, max_w: u32, max_h: u32) -> DynamicImage {
    if img.width() <= max_w && img.height() <= max_h {
        return img.clone();
    }
    img.resize(max_w, max_h, FilterType::Lanczos3)
}

fn resize_file(
    src: &Path,
    max_w: u32,
    max_h: u32,
    dst: &Path,
    quality: u8,
) -> Result<(), Pdf2JpegError> {
    let img = image::open(src).map_err(|e| Pdf2JpegError::ResizeFailed {
        src: src.to_path_buf(),
        detail: e.to_string(),
    })?;
    let scaled = fit_within(&img, max_w, max_h);
    debug!(
        "Resized {} {}x{} → {}x{}",
        src.display(),
        img.width(),
        img.height(),
        scaled.width(),
        scaled.height()
    );
    write_jpeg(&scaled, dst, quality)
}

/// Encode as baseline RGB JPEG; alpha is dropped.
pub(crate) fn write_jpeg(img: &DynamicImage, out: &Path, quality: u8) -> Result<(), Pdf2JpegError> {
    let file = std::fs::File::create(out).map_err(|e| Pdf2JpegError::io(out, e))?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| Pdf2JpegError::ResizeFailed {
            src: out.to_path_buf(),
            detail: format!("JPEG encoding failed: {e}"),
        })?;
    writer.flush().map_err(|e| Pdf2JpegError::io(out, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 30, 30])))
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        let scaled = fit_within(&solid(2480, 3508), 800, 800);
        assert_eq!(scaled.height(), 800);
        assert!(scaled.width() < 800);
        let ratio = scaled.width() as f64 / scaled.height() as f64;
        assert!((ratio - 2480.0 / 3508.0).abs() < 0.01, "ratio {ratio}");
    }

    #[test]
    fn fit_within_never_upscales() {
        let scaled = fit_within(&solid(120, 90), 300, 300);
        assert_eq!((scaled.width(), scaled.height()), (120, 90));
    }

    #[tokio::test]
    async fn resize_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("page1-large.jpg");
        let dst = dir.path().join("page1-small.jpg");
        write_jpeg(&solid(1000, 600), &src, 90).unwrap();

        let backend = PdfiumBackend::new(300, 90);
        backend.resize(&src, 300, 300, &dst).await.unwrap();

        let out = image::open(&dst).unwrap();
        assert_eq!((out.width(), out.height()), (300, 180));
    }

    #[tokio::test]
    async fn resize_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = PdfiumBackend::new(300, 90);
        let err = backend
            .resize(&dir.path().join("nope.jpg"), 300, 300, &dir.path().join("o.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2JpegError::ResizeFailed { .. }));
    }
}
