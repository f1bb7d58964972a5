//! CLI binary for pdf2jpeg.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, picks an object store and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2jpeg::{
    convert, convert_request, inspect, BackendKind, ConversionConfig, ConversionOutput,
    FormFields, HttpObjectStore, LocalObjectStore, ObjectStore, RemoteTemplates, RenderProfile,
    ResizeSource,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a local PDF into a directory-backed bucket
  pdf2jpeg exam.pdf --store-dir ./bucket \
      --jpeg 'exams/7/page%d.jpg' \
      --jpeg-small 'exams/7/page%d-small.jpg' \
      --jpeg-large 'exams/7/page%d-large.jpg'

  # The PDF is already in the store: fetch it by key first
  pdf2jpeg uploads/exam.pdf --from-store --store-url https://bucket.example.com ...

  # Lower resolution, small variant taken from the large image
  pdf2jpeg exam.pdf --profile compact ...

  # Page count only
  pdf2jpeg --inspect-only exam.pdf

TEMPLATES:
  Every template must contain the literal %d exactly once; it is replaced by
  the 1-based page number. Each page produces three objects.

ENVIRONMENT VARIABLES:
  PDF2JPEG_STORE_DIR      Directory used as the bucket
  PDF2JPEG_STORE_URL      S3-compatible endpoint (PUT/GET with x-amz-acl)
  PDF2JPEG_BACKEND        ghostscript (default) or pdfium
  PDFIUM_LIB_PATH         Path to libpdfium for the pdfium backend
"#;

/// Convert PDF pages to JPEG variants and publish them to an object store.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2jpeg",
    version,
    about = "Convert PDF pages to small/normal/large JPEGs and upload them",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF path, or a store key with --from-store.
    input: String,

    /// Treat INPUT as a key in the object store and fetch it first.
    #[arg(long, env = "PDF2JPEG_FROM_STORE")]
    from_store: bool,

    /// Remote template of the normal (≤ 800 px) variant.
    #[arg(long, env = "PDF2JPEG_JPEG", required_unless_present = "inspect_only")]
    jpeg: Option<String>,

    /// Remote template of the small (≤ 300 px) variant.
    #[arg(long, env = "PDF2JPEG_JPEG_SMALL", required_unless_present = "inspect_only")]
    jpeg_small: Option<String>,

    /// Remote template of the large (full resolution) variant.
    #[arg(long, env = "PDF2JPEG_JPEG_LARGE", required_unless_present = "inspect_only")]
    jpeg_large: Option<String>,

    /// Directory used as the bucket.
    #[arg(long, env = "PDF2JPEG_STORE_DIR", conflicts_with = "store_url")]
    store_dir: Option<PathBuf>,

    /// Base URL of an S3-compatible bucket.
    #[arg(long, env = "PDF2JPEG_STORE_URL")]
    store_url: Option<String>,

    /// HTTP timeout for store requests, in seconds.
    #[arg(long, env = "PDF2JPEG_STORE_TIMEOUT", default_value_t = 120)]
    store_timeout: u64,

    /// Rasteriser implementation.
    #[arg(long, env = "PDF2JPEG_BACKEND", value_enum, default_value = "ghostscript")]
    backend: BackendArg,

    /// Deployment preset: standard (300 DPI) or compact (200 DPI).
    #[arg(long, env = "PDF2JPEG_PROFILE", value_enum)]
    profile: Option<ProfileArg>,

    /// Rendering DPI (72–600); overrides the profile.
    #[arg(long, env = "PDF2JPEG_DPI",
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: Option<u32>,

    /// Image the small variant is resized from; overrides the profile.
    #[arg(long, env = "PDF2JPEG_SMALL_FROM", value_enum)]
    small_from: Option<SmallFromArg>,

    /// JPEG quality of the rasterised page (1–100).
    #[arg(long, env = "PDF2JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Number of concurrent conversion workers.
    #[arg(long, env = "PDF2JPEG_CONVERSION_WORKERS", default_value_t = 2)]
    conversion_workers: usize,

    /// Number of concurrent upload workers.
    #[arg(long, env = "PDF2JPEG_UPLOAD_WORKERS", default_value_t = 10)]
    upload_workers: usize,

    /// Ghostscript executable.
    #[arg(long = "gs", env = "PDF2JPEG_GS", default_value = "gs")]
    ghostscript: String,

    /// ImageMagick resize executable.
    #[arg(long, env = "PDF2JPEG_RESIZE_PROGRAM", default_value = "convert")]
    resize_program: String,

    /// Parent directory for per-run scratch directories.
    #[arg(long, env = "PDF2JPEG_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Print the page count of a local PDF only, no conversion.
    #[arg(long, conflicts_with = "from_store")]
    inspect_only: bool,

    /// Output structured JSON (ConversionOutput) instead of a summary.
    #[arg(long, env = "PDF2JPEG_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2JPEG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2JPEG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Ghostscript,
    Pdfium,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Ghostscript => BackendKind::Ghostscript,
            BackendArg::Pdfium => BackendKind::Pdfium,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProfileArg {
    Standard,
    Compact,
}

impl From<ProfileArg> for RenderProfile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Standard => RenderProfile::Standard,
            ProfileArg::Compact => RenderProfile::Compact,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SmallFromArg {
    Normal,
    Large,
}

impl From<SmallFromArg> for ResizeSource {
    fn from(v: SmallFromArg) -> Self {
        match v {
            SmallFromArg::Normal => ResizeSource::Normal,
            SmallFromArg::Large => ResizeSource::Large,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let pages = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;
        if cli.json {
            println!("{}", serde_json::json!({ "file": cli.input, "pages": pages }));
        } else {
            println!("File:   {}", cli.input);
            println!("Pages:  {}", pages);
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let store = build_store(&cli).await?;
    let output = if cli.from_store {
        convert_request(&request_form(&cli), store, &config)
            .await
            .context("Conversion failed")?
    } else {
        let remote =
            RemoteTemplates::from_form(&request_form(&cli)).context("Invalid templates")?;
        convert(&cli.input, &remote, store, &config)
            .await
            .context("Conversion failed")?
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }

    output
        .into_result()
        .map(|_| ())
        .context("Some pages were not published")
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder();
    if let Some(profile) = cli.profile {
        builder = builder.profile(profile.into());
    }
    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(from) = cli.small_from {
        builder = builder.small_source(from.into());
    }
    let mut builder = builder
        .jpeg_quality(cli.quality)
        .conversion_workers(cli.conversion_workers)
        .upload_workers(cli.upload_workers)
        .backend_kind(cli.backend.into())
        .ghostscript_program(&cli.ghostscript)
        .resize_program(&cli.resize_program);
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    builder.build().context("Invalid configuration")
}

async fn build_store(cli: &Cli) -> Result<Arc<dyn ObjectStore>> {
    if let Some(ref url) = cli.store_url {
        let store = HttpObjectStore::new(url, cli.store_timeout)
            .with_context(|| format!("Invalid store URL {url}"))?;
        return Ok(Arc::new(store));
    }
    let Some(ref dir) = cli.store_dir else {
        anyhow::bail!("No object store configured: pass --store-dir or --store-url");
    };
    let store = LocalObjectStore::new(dir)
        .await
        .with_context(|| format!("Failed to open store directory {}", dir.display()))?;
    Ok(Arc::new(store))
}

/// The flags as the form fields a request would carry.
fn request_form(cli: &Cli) -> FormFields {
    let mut form = FormFields::new();
    let fields = [
        ("pdf", Some(&cli.input)),
        ("jpeg", cli.jpeg.as_ref()),
        ("jpeg_small", cli.jpeg_small.as_ref()),
        ("jpeg_large", cli.jpeg_large.as_ref()),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            form.insert(name.to_string(), vec![value.clone()]);
        }
    }
    form
}

fn print_summary(output: &ConversionOutput) {
    let stats = &output.stats;
    eprintln!(
        "{}  {}/{} pages converted, {} uploaded ({} objects)  {}ms",
        if output.is_complete() { "✔" } else { "⚠" },
        stats.converted_pages,
        stats.page_count,
        stats.uploaded_pages,
        stats.uploaded_objects,
        stats.total_duration_ms,
    );
    for error in output.errors() {
        eprintln!("  {error}");
    }
}
