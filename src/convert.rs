//! Conversion entry points.
//!
//! Every entry point validates caller input before touching the store or
//! the backend, then runs the two phases strictly in order: all pages are
//! converted (or their workers have stopped) before the first upload starts.

use crate::backend::resolve_backend;
use crate::config::ConversionConfig;
use crate::error::Pdf2JpegError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::{input, rasterise, upload};
use crate::request::{self, FormFields, RemoteTemplates};
use crate::store::ObjectStore;
use crate::template::PathTemplate;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Base name of the local scratch images; variants add `-small` / `-large`.
const SCRATCH_TEMPLATE_NAME: &str = "page%d.jpg";

/// Convert a local PDF and publish every page under `remote`.
///
/// # Returns
/// `Ok(ConversionOutput)` once both phases have run, even if some workers
/// stopped early (check [`ConversionOutput::is_complete`]).
///
/// # Errors
/// Only fatal failures: unreadable or non-PDF source, page count failure,
/// scratch directory creation.
pub async fn convert(
    source: impl AsRef<Path>,
    remote: &RemoteTemplates,
    store: Arc<dyn ObjectStore>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2JpegError> {
    let resolved = input::resolve_local(source)?;
    run(resolved.path(), remote, store, config).await
}

/// Handle one caller request: fields `pdf`, `jpeg`, `jpeg_small` and
/// `jpeg_large`, each exactly once.
///
/// The source PDF is fetched from `store` into a private temp directory.
/// Invalid fields fail before any store call.
pub async fn convert_request(
    form: &FormFields,
    store: Arc<dyn ObjectStore>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2JpegError> {
    let source_key = request::source_key_from_form(form)?;
    let remote = RemoteTemplates::from_form(form)?;
    info!("Request for {}", source_key);

    let resolved =
        input::fetch_source(store.as_ref(), &source_key, config.scratch_dir.as_deref()).await?;
    run(resolved.path(), &remote, store, config).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: impl AsRef<Path>,
    remote: &RemoteTemplates,
    store: Arc<dyn ObjectStore>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2JpegError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2JpegError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(source, remote, store, config))
}

/// Page count of a local PDF, without converting anything.
pub async fn inspect(
    source: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<u32, Pdf2JpegError> {
    let resolved = input::resolve_local(source)?;
    let backend = resolve_backend(config);
    crate::pipeline::count::count_pages(backend.as_ref(), resolved.path()).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    pdf_path: &Path,
    remote: &RemoteTemplates,
    store: Arc<dyn ObjectStore>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2JpegError> {
    let total_start = Instant::now();

    // ── Step 1: Scratch space ────────────────────────────────────────────
    let scratch = input::scratch_tempdir(config.scratch_dir.as_deref())?;
    let scratch_template = scratch_template(scratch.path())?;

    // ── Step 2: Conversion phase ─────────────────────────────────────────
    let backend = resolve_backend(config);
    info!(
        "Starting conversion of {} with the {} backend",
        pdf_path.display(),
        backend.name()
    );
    let (job, conversion) =
        rasterise::convert_all(backend, pdf_path, &scratch_template, config).await?;

    // ── Step 3: Upload phase ─────────────────────────────────────────────
    let converted = conversion.completed_pages();
    let upload = upload::upload_all(
        Arc::clone(&job),
        remote,
        store,
        converted.clone(),
        config.upload_workers,
    )
    .await;

    // ── Step 4: Stats ────────────────────────────────────────────────────
    let stats = ConversionStats {
        page_count: job.page_count,
        converted_pages: converted.len(),
        uploaded_pages: upload.completed_pages().len(),
        uploaded_objects: upload.outputs().count(),
        failed_workers: conversion.failed_workers() + upload.failed_workers(),
        convert_duration_ms: conversion.duration_ms,
        upload_duration_ms: upload.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    if stats.failed_workers > 0 {
        warn!(
            "Conversion incomplete: {} worker(s) failed, {}/{} pages uploaded",
            stats.failed_workers, stats.uploaded_pages, stats.page_count
        );
    } else {
        info!(
            "Conversion complete: {} pages, {} objects, {}ms total",
            stats.page_count, stats.uploaded_objects, stats.total_duration_ms
        );
    }

    // `scratch` is dropped here, removing every local image.
    Ok(ConversionOutput {
        page_count: job.page_count,
        conversion,
        upload,
        stats,
    })
}

fn scratch_template(dir: &Path) -> Result<PathTemplate, Pdf2JpegError> {
    let raw = dir.join(SCRATCH_TEMPLATE_NAME);
    let raw = raw.to_str().ok_or_else(|| {
        Pdf2JpegError::InvalidConfig(format!(
            "scratch directory is not valid UTF-8: {}",
            dir.display()
        ))
    })?;
    PathTemplate::parse("scratch", raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_template_resolves_per_page() {
        let t = scratch_template(Path::new("/tmp/pdf2jpeg-abc")).unwrap();
        assert_eq!(t.resolve(4), "/tmp/pdf2jpeg-abc/page4.jpg");
    }
}
