//! Upload phase: converted JPEGs → object store.
//!
//! Each page contributes three objects, stored in the order normal, small,
//! large. Pages whose conversion did not complete are skipped rather than
//! attempted, so every upload reads a file that was fully written.

use crate::error::{PageError, Pdf2JpegError};
use crate::output::{ConversionJob, ImageVariant, PhaseReport, UploadTarget, WorkerReport};
use crate::pipeline::join_workers;
use crate::pipeline::partition::{self, PageRange};
use crate::request::RemoteTemplates;
use crate::store::{ObjectStore, Visibility, JPEG_CONTENT_TYPE};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Upload targets of one page, in upload order.
fn page_targets<'a>(
    job: &'a ConversionJob,
    remote: &'a RemoteTemplates,
    page: u32,
) -> impl Iterator<Item = UploadTarget> + 'a {
    ImageVariant::UPLOAD_ORDER.into_iter().map(move |variant| {
        UploadTarget::new(
            page,
            variant,
            job.local_path(page, variant),
            remote.template(variant),
        )
    })
}

/// Publish one local image. Single attempt, no retry.
pub async fn upload_target(
    store: &dyn ObjectStore,
    target: &UploadTarget,
) -> Result<(), Pdf2JpegError> {
    let missing = || Pdf2JpegError::MissingImage {
        path: target.local_path.clone(),
    };
    let meta = tokio::fs::metadata(&target.local_path)
        .await
        .map_err(|_| missing())?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(missing());
    }

    let body = tokio::fs::read(&target.local_path)
        .await
        .map_err(|e| Pdf2JpegError::io(&target.local_path, e))?;
    debug!(
        "Uploading page {} {} ({} bytes) → {}",
        target.page,
        target.variant,
        body.len(),
        target.remote_key
    );
    store
        .store(
            &target.remote_key,
            body,
            JPEG_CONTENT_TYPE,
            Visibility::PublicRead,
        )
        .await
}

/// Upload every converted page of `range`; stop at the first failure.
pub async fn upload_range(
    job: &ConversionJob,
    remote: &RemoteTemplates,
    store: &dyn ObjectStore,
    converted: &BTreeSet<u32>,
    range: PageRange,
) -> WorkerReport {
    let mut report = WorkerReport::new(range);
    for page in range.pages() {
        if !converted.contains(&page) {
            debug!("Skipping upload of unconverted page {}", page);
            report.skipped_pages.push(page);
            continue;
        }
        for target in page_targets(job, remote, page) {
            if let Err(e) = upload_target(store, &target).await {
                let error = PageError::Upload {
                    page,
                    variant: target.variant,
                    detail: e.to_string(),
                };
                warn!("Upload worker {} stopping: {}", range, error);
                report.stop_at(page, error);
                return report;
            }
            report.outputs.push(target.remote_key);
        }
        report.completed_pages.push(page);
    }
    report
}

/// Upload all converted pages across `workers` concurrent workers and wait
/// for all of them.
pub async fn upload_all(
    job: Arc<ConversionJob>,
    remote: &RemoteTemplates,
    store: Arc<dyn ObjectStore>,
    converted: BTreeSet<u32>,
    workers: usize,
) -> PhaseReport {
    let start = Instant::now();
    let ranges = partition::plan(job.page_count, workers);
    info!(
        "Uploading {} pages with {} workers",
        converted.len(),
        ranges.len()
    );

    let remote = Arc::new(remote.clone());
    let converted = Arc::new(converted);
    let handles = ranges
        .into_iter()
        .map(|range| {
            let job = Arc::clone(&job);
            let remote = Arc::clone(&remote);
            let store = Arc::clone(&store);
            let converted = Arc::clone(&converted);
            let handle = tokio::spawn(async move {
                upload_range(&job, &remote, store.as_ref(), &converted, range).await
            });
            (range, handle)
        })
        .collect();

    let report = PhaseReport {
        workers: join_workers(handles).await,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Upload finished: {} objects in {}ms",
        report.outputs().count(),
        report.duration_ms
    );
    report
}
