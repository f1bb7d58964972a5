//! Pipeline integration tests.
//!
//! These run the full convert → upload flow with an in-process backend that
//! writes small fake JPEGs and a [`MemoryObjectStore`], so they need neither
//! Ghostscript nor a bucket.

use async_trait::async_trait;
use pdf2jpeg::{
    convert, convert_request, ConversionConfig, FormFields, ImageVariant, MemoryObjectStore,
    ObjectStore, PageError, PathTemplate, Pdf2JpegError, RasterBackend, RemoteTemplates,
    ResizeSource, Visibility,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Backend that pretends every document has `pages` pages.
struct FakeBackend {
    pages: u32,
    fail_page: Option<u32>,
    slow_page: Option<u32>,
    resized_from: Mutex<Vec<PathBuf>>,
    /// Pages whose small variant has been written.
    finished: AtomicUsize,
}

impl FakeBackend {
    fn new(pages: u32) -> Self {
        Self {
            pages,
            fail_page: None,
            slow_page: None,
            resized_from: Mutex::new(Vec::new()),
            finished: AtomicUsize::new(0),
        }
    }

    fn slow_on(mut self, page: u32) -> Self {
        self.slow_page = Some(page);
        self
    }

    fn failing_on(mut self, page: u32) -> Self {
        self.fail_page = Some(page);
        self
    }
}

#[async_trait]
impl RasterBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn count_pages(&self, _doc: &Path) -> Result<u32, Pdf2JpegError> {
        Ok(self.pages)
    }

    async fn rasterize_page(&self, _doc: &Path, page: u32, out: &Path) -> Result<(), Pdf2JpegError> {
        if self.slow_page == Some(page) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        if self.fail_page == Some(page) {
            return Err(Pdf2JpegError::RasterisationFailed {
                page,
                detail: "corrupt page stream".into(),
            });
        }
        tokio::fs::write(out, format!("jpeg page {page}"))
            .await
            .map_err(|e| Pdf2JpegError::Internal(e.to_string()))
    }

    async fn resize(
        &self,
        src: &Path,
        max_w: u32,
        _max_h: u32,
        dst: &Path,
    ) -> Result<(), Pdf2JpegError> {
        self.resized_from
            .lock()
            .unwrap()
            .push(src.to_path_buf());
        let body = tokio::fs::read(src)
            .await
            .map_err(|e| Pdf2JpegError::Internal(e.to_string()))?;
        let mut resized = body.clone();
        resized.extend_from_slice(format!(" @{max_w}").as_bytes());
        tokio::fs::write(dst, resized)
            .await
            .map_err(|e| Pdf2JpegError::Internal(e.to_string()))?;
        if max_w == 300 {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Store that records how many pages the backend had finished at each write.
struct ObservingStore {
    inner: MemoryObjectStore,
    backend: Arc<FakeBackend>,
    seen_finished: Mutex<Vec<usize>>,
}

#[async_trait]
impl ObjectStore for ObservingStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, Pdf2JpegError> {
        self.inner.fetch(key).await
    }

    async fn store(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), Pdf2JpegError> {
        self.seen_finished
            .lock()
            .unwrap()
            .push(self.backend.finished.load(Ordering::SeqCst));
        self.inner.store(key, body, content_type, visibility).await
    }
}

fn remote(prefix: &str) -> RemoteTemplates {
    RemoteTemplates {
        normal: PathTemplate::parse("jpeg", format!("{prefix}%d.jpg")).unwrap(),
        small: PathTemplate::parse("jpeg_small", format!("{prefix}%d-small.jpg")).unwrap(),
        large: PathTemplate::parse("jpeg_large", format!("{prefix}%d-large.jpg")).unwrap(),
    }
}

fn config(backend: Arc<FakeBackend>, scratch: &Path) -> ConversionConfig {
    ConversionConfig::builder()
        .backend(backend)
        .scratch_dir(scratch)
        .build()
        .unwrap()
}

fn sample_pdf(dir: &Path) -> PathBuf {
    let path = dir.join("doc.pdf");
    std::fs::write(&path, b"%PDF-1.4\n%fake\n").unwrap();
    path
}

fn form(pairs: &[(&str, &str)]) -> FormFields {
    let mut form = FormFields::new();
    for (k, v) in pairs {
        form.entry(k.to_string()).or_default().push(v.to_string());
    }
    form
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn six_pages_produce_eighteen_public_objects() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = sample_pdf(dir.path());
    let backend = Arc::new(FakeBackend::new(6));
    let store = Arc::new(MemoryObjectStore::new());

    let output = convert(&pdf, &remote("prefix"), store.clone(), &config(backend, dir.path()))
        .await
        .unwrap();

    assert!(output.is_complete());
    assert_eq!(output.page_count, 6);
    assert_eq!(output.stats.uploaded_objects, 18);
    assert_eq!(output.stats.uploaded_pages, 6);

    let keys = store.keys();
    assert_eq!(keys.len(), 18);
    for page in 1..=6 {
        for suffix in ["", "-small", "-large"] {
            let key = format!("prefix{page}{suffix}.jpg");
            let obj = store.get(&key).unwrap_or_else(|| panic!("missing {key}"));
            assert_eq!(obj.content_type, "image/jpeg");
            assert_eq!(obj.visibility, Visibility::PublicRead);
            assert!(!obj.body.is_empty());
        }
    }
    // Large is the rasterised original, normal and small derive from it.
    assert_eq!(store.get("prefix3-large.jpg").unwrap().body, b"jpeg page 3");
    assert_eq!(store.get("prefix3.jpg").unwrap().body, b"jpeg page 3 @800");
    assert_eq!(store.get("prefix3-small.jpg").unwrap().body, b"jpeg page 3 @800 @300");
}

#[tokio::test]
async fn small_can_be_resized_from_large() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = sample_pdf(dir.path());
    let backend = Arc::new(FakeBackend::new(1));
    let store = Arc::new(MemoryObjectStore::new());
    let config = ConversionConfig::builder()
        .backend(backend.clone())
        .small_source(ResizeSource::Large)
        .scratch_dir(dir.path())
        .build()
        .unwrap();

    convert(&pdf, &remote("p"), store.clone(), &config).await.unwrap();

    assert_eq!(store.get("p1-small.jpg").unwrap().body, b"jpeg page 1 @300");
    let sources = backend.resized_from.lock().unwrap();
    assert!(sources.iter().all(|p| p.to_string_lossy().ends_with("-large.jpg")));
}

#[tokio::test]
async fn failing_page_stops_only_its_worker() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = sample_pdf(dir.path());
    // 6 pages, 2 workers: [1-3] and [4-6]. Page 2 fails.
    let backend = Arc::new(FakeBackend::new(6).failing_on(2));
    let store = Arc::new(MemoryObjectStore::new());

    let output = convert(&pdf, &remote("d/"), store.clone(), &config(backend, dir.path()))
        .await
        .unwrap();

    assert!(!output.is_complete());
    let converted: Vec<u32> = output.conversion.completed_pages().into_iter().collect();
    assert_eq!(converted, vec![1, 4, 5, 6]);
    let skipped: Vec<u32> = output.conversion.skipped_pages().into_iter().collect();
    assert_eq!(skipped, vec![2, 3]);

    let errors = output.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        PageError::Conversion { page: 2, variant: ImageVariant::Large, .. }
    ));

    // Only fully converted pages are published.
    assert_eq!(output.stats.uploaded_objects, 12);
    assert!(store.get("d/1.jpg").is_some());
    assert!(store.get("d/2.jpg").is_none());
    assert!(store.get("d/3-large.jpg").is_none());
    assert!(store.get("d/6-small.jpg").is_some());

    let err = output.into_result().unwrap_err();
    assert!(matches!(err, Pdf2JpegError::PartialFailure { failed: 1, .. }));
}

#[tokio::test]
async fn failure_on_first_page_of_range_skips_that_range() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = sample_pdf(dir.path());
    // 6 pages, 2 workers: [1-3] and [4-6]. Page 4 opens the second range.
    let backend = Arc::new(FakeBackend::new(6).failing_on(4));
    let store = Arc::new(MemoryObjectStore::new());

    let output = convert(&pdf, &remote("f/"), store.clone(), &config(backend, dir.path()))
        .await
        .unwrap();

    let converted: Vec<u32> = output.conversion.completed_pages().into_iter().collect();
    assert_eq!(converted, vec![1, 2, 3]);
    let skipped: Vec<u32> = output.conversion.skipped_pages().into_iter().collect();
    assert_eq!(skipped, vec![4, 5, 6]);
    assert_eq!(output.conversion.failed_workers(), 1);

    assert_eq!(output.stats.uploaded_objects, 9);
    assert!(store.get("f/3-large.jpg").is_some());
    assert!(store.keys().iter().all(|k| !k.starts_with("f/4")
        && !k.starts_with("f/5")
        && !k.starts_with("f/6")));
}

#[tokio::test]
async fn uploads_wait_for_every_conversion_worker() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = sample_pdf(dir.path());
    // The second conversion worker stalls on its last page while the first
    // one has long finished.
    let backend = Arc::new(FakeBackend::new(6).slow_on(6));
    let store = Arc::new(ObservingStore {
        inner: MemoryObjectStore::new(),
        backend: Arc::clone(&backend),
        seen_finished: Mutex::new(Vec::new()),
    });

    let output = convert(&pdf, &remote("b/"), store.clone(), &config(backend, dir.path()))
        .await
        .unwrap();

    assert!(output.is_complete());
    let seen = store.seen_finished.lock().unwrap();
    assert_eq!(seen.len(), 18);
    assert!(seen.iter().all(|&n| n == 6), "store written mid-conversion: {seen:?}");
}

#[tokio::test]
async fn rejected_upload_stops_only_its_worker() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = sample_pdf(dir.path());
    let backend = Arc::new(FakeBackend::new(4));
    let store = Arc::new(MemoryObjectStore::new());
    store.reject_key("u/1-small.jpg");
    let config = ConversionConfig::builder()
        .backend(backend)
        .upload_workers(2)
        .scratch_dir(dir.path())
        .build()
        .unwrap();

    let output = convert(&pdf, &remote("u/"), store.clone(), &config).await.unwrap();

    assert!(output.conversion.is_success());
    assert_eq!(output.upload.failed_workers(), 1);
    // The normal variant of page 1 went out before the small one failed.
    assert!(store.get("u/1.jpg").is_some());
    assert!(store.get("u/1-large.jpg").is_none());
    assert!(store.get("u/2.jpg").is_none());
    assert!(store.get("u/3.jpg").is_some());
    assert!(store.get("u/4-large.jpg").is_some());
    assert!(matches!(
        output.errors()[0],
        PageError::Upload { page: 1, variant: ImageVariant::Small, .. }
    ));
}

#[tokio::test]
async fn request_fetches_source_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FakeBackend::new(2));
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("in/exam.pdf", b"%PDF-1.7 exam".to_vec(), "application/pdf");

    let form = form(&[
        ("pdf", "in/exam.pdf"),
        ("jpeg", "out/page%d.jpg"),
        ("jpeg_small", "out/page%d-small.jpg"),
        ("jpeg_large", "out/page%d-large.jpg"),
    ]);
    let output = convert_request(&form, store.clone(), &config(backend, dir.path()))
        .await
        .unwrap();

    assert!(output.is_complete());
    // 1 fetch + 6 stores.
    assert_eq!(store.call_count(), 7);
    assert!(store.get("out/page2-small.jpg").is_some());
}

#[tokio::test]
async fn invalid_request_fails_before_store_io() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FakeBackend::new(2));
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("in/exam.pdf", b"%PDF-1.7".to_vec(), "application/pdf");

    let cases = [
        form(&[
            ("pdf", "in/exam.pdf"),
            ("jpeg", "out/page.jpg"),
            ("jpeg_small", "out/page%d-small.jpg"),
            ("jpeg_large", "out/page%d-large.jpg"),
        ]),
        form(&[
            ("jpeg", "out/page%d.jpg"),
            ("jpeg_small", "out/page%d-small.jpg"),
            ("jpeg_large", "out/page%d-large.jpg"),
        ]),
        form(&[
            ("pdf", "in/exam.pdf"),
            ("pdf", "in/other.pdf"),
            ("jpeg", "out/page%d.jpg"),
            ("jpeg_small", "out/page%d-small.jpg"),
            ("jpeg_large", "out/page%d-large.jpg"),
        ]),
    ];
    for form in &cases {
        let err = convert_request(form, store.clone(), &config(backend.clone(), dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), pdf2jpeg::ErrorKind::Validation, "{err}");
    }
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn non_pdf_source_is_rejected_before_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FakeBackend::new(2));
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("in/exam.pdf", b"PK\x03\x04zip".to_vec(), "application/zip");

    let form = form(&[
        ("pdf", "in/exam.pdf"),
        ("jpeg", "out/page%d.jpg"),
        ("jpeg_small", "out/page%d-small.jpg"),
        ("jpeg_large", "out/page%d-large.jpg"),
    ]);
    let err = convert_request(&form, store.clone(), &config(backend, dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2JpegError::NotAPdf { .. }));
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn empty_document_uploads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = sample_pdf(dir.path());
    let backend = Arc::new(FakeBackend::new(0));
    let store = Arc::new(MemoryObjectStore::new());

    let output = convert(&pdf, &remote("e/"), store.clone(), &config(backend, dir.path()))
        .await
        .unwrap();

    assert!(output.is_complete());
    assert_eq!(output.page_count, 0);
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn scratch_files_are_removed_after_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let pdf = sample_pdf(dir.path());
    let backend = Arc::new(FakeBackend::new(3));
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());

    convert(&pdf, &remote("s/"), store, &config(backend, &scratch))
        .await
        .unwrap();

    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}
