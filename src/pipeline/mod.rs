//! Pipeline stages for PDF-to-JPEG conversion.
//!
//! ## Data Flow
//!
//! ```text
//! count ──▶ partition ──▶ rasterise ══▶ barrier ──▶ partition ──▶ upload ══▶ barrier
//! (gs -c)   (ranges)      (N workers)              (ranges)      (M workers)
//! ```
//!
//! 1. [`count`]     — ask the backend for the page count; fatal on failure
//! 2. [`partition`] — split `[1, pages]` into contiguous per-worker ranges
//! 3. [`rasterise`] — one task per range renders the large JPEG, then
//!    derives normal and small from it
//! 4. [`upload`]    — one task per range stores normal, small and large
//!    for each page in its range
//!
//! Both fan-outs end at a join barrier that waits for every task, whether it
//! finished its range, stopped on an error, or panicked. Workers never share
//! mutable state: they read one immutable job and write disjoint pages.

pub mod count;
pub mod input;
pub mod partition;
pub mod rasterise;
pub mod upload;

use crate::error::PageError;
use crate::output::WorkerReport;
use partition::PageRange;
use tokio::task::JoinHandle;
use tracing::error;

/// Wait for every worker of a phase, turning a panicked task into a report.
pub(crate) async fn join_workers(
    workers: Vec<(PageRange, JoinHandle<WorkerReport>)>,
) -> Vec<WorkerReport> {
    let (ranges, handles): (Vec<_>, Vec<_>) = workers.into_iter().unzip();
    futures::future::join_all(handles)
        .await
        .into_iter()
        .zip(ranges)
        .map(|(joined, range)| match joined {
            Ok(report) => report,
            Err(e) => {
                error!("Worker for pages {} did not finish: {}", range, e);
                let mut report = WorkerReport::new(range);
                report.skipped_pages.extend(range.pages());
                report.error = Some(PageError::WorkerPanicked {
                    range,
                    detail: e.to_string(),
                });
                report
            }
        })
        .collect()
}
