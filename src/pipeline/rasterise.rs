//! Conversion phase: page ranges → large, normal and small JPEGs.

use crate::backend::RasterBackend;
use crate::config::{ConversionConfig, ResizeSource};
use crate::error::{PageError, Pdf2JpegError};
use crate::output::{ConversionJob, ImageVariant, PhaseReport, WorkerReport};
use crate::pipeline::partition::{self, PageRange};
use crate::pipeline::{count, join_workers};
use crate::template::PathTemplate;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every page of `range`, in increasing order.
///
/// Stops at the first failing page; that page and the rest of the range are
/// reported as skipped and the error is returned in the report.
pub async fn convert_range(
    job: &ConversionJob,
    backend: &dyn RasterBackend,
    small_source: ResizeSource,
    range: PageRange,
) -> WorkerReport {
    let mut report = WorkerReport::new(range);
    for page in range.pages() {
        match convert_page(job, backend, small_source, page).await {
            Ok(written) => {
                report.completed_pages.push(page);
                report.outputs.extend(written);
            }
            Err(e) => {
                warn!("Conversion worker {} stopping: {}", range, e);
                report.stop_at(page, e);
                break;
            }
        }
    }
    report
}

/// Produce the three variants of one page; returns the paths written.
async fn convert_page(
    job: &ConversionJob,
    backend: &dyn RasterBackend,
    small_source: ResizeSource,
    page: u32,
) -> Result<Vec<String>, PageError> {
    let failed = move |variant: ImageVariant| {
        move |e: Pdf2JpegError| PageError::Conversion {
            page,
            variant,
            detail: e.to_string(),
        }
    };

    let large = job.local_path(page, ImageVariant::Large);
    backend
        .rasterize_page(&job.source_path, page, &large)
        .await
        .map_err(failed(ImageVariant::Large))?;

    let normal = job.local_path(page, ImageVariant::Normal);
    let (w, h) = bounds(ImageVariant::Normal);
    backend
        .resize(&large, w, h, &normal)
        .await
        .map_err(failed(ImageVariant::Normal))?;

    let small = job.local_path(page, ImageVariant::Small);
    let small_from = match small_source {
        ResizeSource::Normal => &normal,
        ResizeSource::Large => &large,
    };
    let (w, h) = bounds(ImageVariant::Small);
    backend
        .resize(small_from, w, h, &small)
        .await
        .map_err(failed(ImageVariant::Small))?;

    debug!("Converted page {}", page);
    Ok([large, normal, small]
        .iter()
        .map(|p| p.display().to_string())
        .collect())
}

fn bounds(variant: ImageVariant) -> (u32, u32) {
    variant.max_dimensions().unwrap_or((u32::MAX, u32::MAX))
}

/// Count pages, then convert them across `config.conversion_workers`
/// concurrent workers and wait for all of them.
///
/// Only the page count can fail the call; per-page failures are in the
/// returned [`PhaseReport`].
pub async fn convert_all(
    backend: Arc<dyn RasterBackend>,
    source: &Path,
    scratch: &PathTemplate,
    config: &ConversionConfig,
) -> Result<(Arc<ConversionJob>, PhaseReport), Pdf2JpegError> {
    let start = Instant::now();
    let page_count = count::count_pages(backend.as_ref(), source).await?;
    let job = Arc::new(ConversionJob::new(source, scratch, page_count));

    let ranges = partition::plan(page_count, config.conversion_workers);
    info!(
        "Converting {} pages with {} workers",
        page_count,
        ranges.len()
    );

    let workers = ranges
        .into_iter()
        .map(|range| {
            let job = Arc::clone(&job);
            let backend = Arc::clone(&backend);
            let small_source = config.small_source;
            let handle = tokio::spawn(async move {
                convert_range(&job, backend.as_ref(), small_source, range).await
            });
            (range, handle)
        })
        .collect();

    let report = PhaseReport {
        workers: join_workers(workers).await,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion finished: {}/{} pages in {}ms",
        report.completed_pages().len(),
        page_count,
        report.duration_ms
    );
    Ok((job, report))
}
