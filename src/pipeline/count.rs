//! Page counting: the one fatal step of the conversion phase.
//!
//! There is no fallback strategy. If the rasteriser cannot open the
//! document, or prints something that is not a number, the whole request
//! fails before any worker is spawned.

use crate::backend::RasterBackend;
use crate::error::Pdf2JpegError;
use std::path::Path;
use tracing::info;

/// Ask the backend how many pages `doc` has.
pub async fn count_pages(backend: &dyn RasterBackend, doc: &Path) -> Result<u32, Pdf2JpegError> {
    let pages = backend.count_pages(doc).await?;
    info!("{} has {} pages ({})", doc.display(), pages, backend.name());
    Ok(pages)
}

/// Parse the single-line, base-10 output of a page-count query.
pub fn parse_page_count(doc: &Path, stdout: &str) -> Result<u32, Pdf2JpegError> {
    let trimmed = stdout.trim();
    trimmed
        .parse::<u32>()
        .map_err(|e| Pdf2JpegError::PageCountFailed {
            path: doc.to_path_buf(),
            detail: format!("unexpected output {trimmed:?}: {e}"),
        })
}
