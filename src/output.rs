//! Job description and per-phase reports.
//!
//! A [`ConversionJob`] is built once the page count is known and is shared
//! read-only by every worker. Each worker hands back a [`WorkerReport`];
//! the coordinators fold them into a [`PhaseReport`] and the top-level
//! [`ConversionOutput`] carries both phases plus summary stats.

use crate::error::{PageError, Pdf2JpegError};
use crate::pipeline::partition::PageRange;
use crate::template::PathTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// One of the three JPEG derivatives produced per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageVariant {
    Small,
    Normal,
    Large,
}

impl ImageVariant {
    /// Order in which a page's variants are uploaded.
    pub const UPLOAD_ORDER: [ImageVariant; 3] =
        [ImageVariant::Normal, ImageVariant::Small, ImageVariant::Large];

    /// Bounding box `(width, height)`; `None` means raw rasterisation size.
    pub fn max_dimensions(self) -> Option<(u32, u32)> {
        match self {
            ImageVariant::Small => Some((300, 300)),
            ImageVariant::Normal => Some((800, 800)),
            ImageVariant::Large => None,
        }
    }

    /// Literal inserted after the page placeholder of the base template.
    pub fn suffix(self) -> &'static str {
        match self {
            ImageVariant::Small => "-small",
            ImageVariant::Normal => "",
            ImageVariant::Large => "-large",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageVariant::Small => "small",
            ImageVariant::Normal => "normal",
            ImageVariant::Large => "large",
        }
    }
}

impl fmt::Display for ImageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a worker needs to know about the document being converted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionJob {
    pub source_path: PathBuf,
    pub jpeg_template: PathTemplate,
    pub small_template: PathTemplate,
    pub large_template: PathTemplate,
    pub page_count: u32,
}

impl ConversionJob {
    /// Derive the variant templates from `base` and freeze the job.
    pub fn new(source_path: impl Into<PathBuf>, base: &PathTemplate, page_count: u32) -> Self {
        Self {
            source_path: source_path.into(),
            jpeg_template: base.with_suffix(ImageVariant::Normal.suffix()),
            small_template: base.with_suffix(ImageVariant::Small.suffix()),
            large_template: base.with_suffix(ImageVariant::Large.suffix()),
            page_count,
        }
    }

    pub fn template(&self, variant: ImageVariant) -> &PathTemplate {
        match variant {
            ImageVariant::Small => &self.small_template,
            ImageVariant::Normal => &self.jpeg_template,
            ImageVariant::Large => &self.large_template,
        }
    }

    /// Local scratch path of one variant of one page.
    pub fn local_path(&self, page: u32, variant: ImageVariant) -> PathBuf {
        self.template(variant).resolve_path(page)
    }
}

/// One file to publish: a page variant and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub page: u32,
    pub variant: ImageVariant,
    pub local_path: PathBuf,
    pub remote_key: String,
}

impl UploadTarget {
    pub fn new(
        page: u32,
        variant: ImageVariant,
        local_path: impl AsRef<Path>,
        remote: &PathTemplate,
    ) -> Self {
        Self {
            page,
            variant,
            local_path: local_path.as_ref().to_path_buf(),
            remote_key: remote.resolve(page),
        }
    }
}

/// What a single worker achieved over its range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReport {
    pub range: PageRange,
    /// Pages for which every variant was produced (or uploaded).
    pub completed_pages: Vec<u32>,
    /// Pages never attempted: after an early stop, or not converted.
    pub skipped_pages: Vec<u32>,
    /// Local paths written (conversion) or remote keys stored (upload).
    pub outputs: Vec<String>,
    /// First error encountered; the worker stopped there.
    pub error: Option<PageError>,
}

impl WorkerReport {
    pub fn new(range: PageRange) -> Self {
        Self {
            range,
            completed_pages: Vec::new(),
            skipped_pages: Vec::new(),
            outputs: Vec::new(),
            error: None,
        }
    }

    /// Record `error` at `page`: that page and the rest of the range are skipped.
    pub(crate) fn stop_at(&mut self, page: u32, error: PageError) {
        self.skipped_pages.extend(page..=self.range.last);
        self.error = Some(error);
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated outcome of one fan-out/join phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseReport {
    pub workers: Vec<WorkerReport>,
    pub duration_ms: u64,
}

impl PhaseReport {
    pub fn completed_pages(&self) -> BTreeSet<u32> {
        self.workers
            .iter()
            .flat_map(|w| w.completed_pages.iter().copied())
            .collect()
    }

    pub fn skipped_pages(&self) -> BTreeSet<u32> {
        self.workers
            .iter()
            .flat_map(|w| w.skipped_pages.iter().copied())
            .collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &PageError> {
        self.workers.iter().filter_map(|w| w.error.as_ref())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.workers
            .iter()
            .flat_map(|w| w.outputs.iter().map(String::as_str))
    }

    pub fn failed_workers(&self) -> usize {
        self.errors().count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_workers() == 0
    }
}

/// Summary numbers for a whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub page_count: u32,
    pub converted_pages: usize,
    pub uploaded_pages: usize,
    pub uploaded_objects: usize,
    pub failed_workers: usize,
    pub convert_duration_ms: u64,
    pub upload_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a request that got past validation and page counting.
///
/// Returned as `Ok` even when some workers stopped early; inspect
/// [`ConversionOutput::errors`] or call [`ConversionOutput::into_result`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub page_count: u32,
    pub conversion: PhaseReport,
    pub upload: PhaseReport,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Remote keys of every stored object.
    pub fn uploaded_keys(&self) -> Vec<&str> {
        self.upload.outputs().collect()
    }

    /// Every worker failure across both phases, conversion first.
    pub fn errors(&self) -> Vec<&PageError> {
        self.conversion.errors().chain(self.upload.errors()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.conversion.is_success() && self.upload.is_success()
    }

    /// Treat any worker failure as a fatal error.
    pub fn into_result(self) -> Result<Self, Pdf2JpegError> {
        let errors = self.errors();
        let failed = errors.len();
        let first_error = errors.first().map(|e| e.to_string());
        match first_error {
            None => Ok(self),
            Some(first_error) => Err(Pdf2JpegError::PartialFailure {
                failed,
                first_error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_derives_variant_templates() {
        let base = PathTemplate::parse("scratch", "/tmp/x/page%d.jpg").unwrap();
        let job = ConversionJob::new("/tmp/x/doc.pdf", &base, 4);
        assert_eq!(
            job.local_path(2, ImageVariant::Normal),
            PathBuf::from("/tmp/x/page2.jpg")
        );
        assert_eq!(
            job.local_path(2, ImageVariant::Small),
            PathBuf::from("/tmp/x/page2-small.jpg")
        );
        assert_eq!(
            job.local_path(2, ImageVariant::Large),
            PathBuf::from("/tmp/x/page2-large.jpg")
        );
    }

    #[test]
    fn variant_bounds() {
        assert_eq!(ImageVariant::Small.max_dimensions(), Some((300, 300)));
        assert_eq!(ImageVariant::Normal.max_dimensions(), Some((800, 800)));
        assert_eq!(ImageVariant::Large.max_dimensions(), None);
    }

    #[test]
    fn stop_at_skips_rest_of_range() {
        let mut report = WorkerReport::new(PageRange::new(4, 6));
        report.completed_pages.push(4);
        report.stop_at(
            5,
            PageError::Conversion {
                page: 5,
                variant: ImageVariant::Large,
                detail: "gs crashed".into(),
            },
        );
        assert_eq!(report.skipped_pages, vec![5, 6]);
        assert!(!report.is_success());
    }

    #[test]
    fn into_result_reports_first_error() {
        let mut failed = WorkerReport::new(PageRange::new(1, 1));
        failed.stop_at(
            1,
            PageError::Upload {
                page: 1,
                variant: ImageVariant::Normal,
                detail: "HTTP 500".into(),
            },
        );
        let output = ConversionOutput {
            page_count: 1,
            conversion: PhaseReport::default(),
            upload: PhaseReport {
                workers: vec![failed],
                duration_ms: 0,
            },
            stats: ConversionStats::default(),
        };
        assert!(!output.is_complete());
        let err = output.into_result().unwrap_err();
        assert!(err.to_string().contains("HTTP 500"), "got: {err}");
    }
}
