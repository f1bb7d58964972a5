//! Error types for the pdf2jpeg library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2JpegError`] — **Fatal**: the request cannot proceed at all
//!   (missing form field, unreadable PDF, page count unavailable). Returned
//!   as `Err(Pdf2JpegError)` from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: one worker hit a failing page and
//!   stopped early, but every other worker carried on. Stored inside
//!   [`crate::output::WorkerReport`] so callers see exactly which page
//!   stopped which range instead of a silent success.

use crate::output::ImageVariant;
use crate::pipeline::partition::PageRange;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Malformed or missing caller input, detected before any work begins.
    Validation,
    /// Local file or external-process failure.
    Io,
    /// The object store rejected a read or a write.
    Remote,
    /// Bug or runtime failure inside the library.
    Internal,
}

/// All fatal errors returned by the pdf2jpeg library.
///
/// Per-page failures use [`PageError`] and are stored in worker reports
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2JpegError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// A required form field was not supplied.
    #[error("Must specify the '{field}' field.")]
    MissingField { field: String },

    /// A form field was supplied with zero or several values.
    #[error("Must specify exactly one value in the '{field}' field (got {count}).")]
    FieldCardinality { field: String, count: usize },

    /// A path template has no page-number placeholder.
    #[error("Template '{template}' in field '{field}' must contain the '%d' page placeholder.")]
    MissingPlaceholder { field: String, template: String },

    /// A path template has more than one page-number placeholder.
    #[error("Template '{template}' in field '{field}' contains '%d' {count} times; exactly one is allowed.")]
    AmbiguousPlaceholder {
        field: String,
        template: String,
        count: usize,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Source document was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The rasteriser could not report how many pages the document has.
    #[error("Could not count pages of '{path}': {detail}")]
    PageCountFailed { path: PathBuf, detail: String },

    /// An external program could not be started or exited unsuccessfully.
    #[error("'{program}' failed: {detail}")]
    ProcessFailed { program: String, detail: String },

    /// In-process rasterisation failed for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    /// Resizing one image into another failed.
    #[error("Resize of '{src}' failed: {detail}")]
    ResizeFailed { src: PathBuf, detail: String },

    /// A local image that should be uploaded is absent or empty.
    #[error("Local image '{path}' is missing or empty")]
    MissingImage { path: PathBuf },

    /// Generic filesystem failure.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind to a pdfium library.
    #[error("Failed to bind to pdfium library: {0}\nSet PDFIUM_LIB_PATH or install libpdfium.")]
    PdfiumBindingFailed(String),

    // ── Remote errors ─────────────────────────────────────────────────────
    /// Reading an object from the store failed.
    #[error("Failed to fetch '{key}' from the object store: {detail}")]
    FetchFailed { key: String, detail: String },

    /// The store rejected a write.
    #[error("Failed to store '{key}' in the object store: {detail}")]
    StoreFailed { key: String, detail: String },

    // ── Outcome errors ────────────────────────────────────────────────────
    /// At least one worker stopped before finishing its range.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any page failure as an error.
    #[error("{failed} worker(s) stopped early; first error: {first_error}")]
    PartialFailure { failed: usize, first_error: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2JpegError {
    /// Classify the error for callers that map outcomes to responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Pdf2JpegError::MissingField { .. }
            | Pdf2JpegError::FieldCardinality { .. }
            | Pdf2JpegError::MissingPlaceholder { .. }
            | Pdf2JpegError::AmbiguousPlaceholder { .. }
            | Pdf2JpegError::InvalidConfig(_) => ErrorKind::Validation,
            Pdf2JpegError::FileNotFound { .. }
            | Pdf2JpegError::PermissionDenied { .. }
            | Pdf2JpegError::NotAPdf { .. }
            | Pdf2JpegError::PageCountFailed { .. }
            | Pdf2JpegError::ProcessFailed { .. }
            | Pdf2JpegError::RasterisationFailed { .. }
            | Pdf2JpegError::ResizeFailed { .. }
            | Pdf2JpegError::MissingImage { .. }
            | Pdf2JpegError::Io { .. }
            | Pdf2JpegError::PdfiumBindingFailed(_) => ErrorKind::Io,
            Pdf2JpegError::FetchFailed { .. } | Pdf2JpegError::StoreFailed { .. } => {
                ErrorKind::Remote
            }
            Pdf2JpegError::PartialFailure { .. } | Pdf2JpegError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Pdf2JpegError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal error that stopped one worker.
///
/// The worker's remaining pages are reported as skipped; sibling workers
/// are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Producing one variant of a page failed.
    #[error("Page {page}: {variant} conversion failed: {detail}")]
    Conversion {
        page: u32,
        variant: ImageVariant,
        detail: String,
    },

    /// Uploading one variant of a page failed.
    #[error("Page {page}: {variant} upload failed: {detail}")]
    Upload {
        page: u32,
        variant: ImageVariant,
        detail: String,
    },

    /// The worker task panicked or was cancelled.
    #[error("Worker for pages {range} panicked: {detail}")]
    WorkerPanicked { range: PageRange, detail: String },
}

impl PageError {
    /// Page the worker was on when it stopped, if known.
    pub fn page(&self) -> Option<u32> {
        match self {
            PageError::Conversion { page, .. } | PageError::Upload { page, .. } => Some(*page),
            PageError::WorkerPanicked { .. } => None,
        }
    }
}
