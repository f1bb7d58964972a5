//! Ghostscript + ImageMagick backend.
//!
//! Each call spawns one external process through `tokio::process`, so a
//! worker waiting on `gs` parks its task instead of a runtime thread.
//! There is no timeout: a hung process stalls its worker, and the phase
//! barrier with it.

use super::RasterBackend;
use crate::config::ConversionConfig;
use crate::error::Pdf2JpegError;
use crate::pipeline::count::parse_page_count;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Drives `gs` for counting/rasterising and `convert` for resizing.
#[derive(Debug, Clone)]
pub struct GhostscriptBackend {
    gs_program: String,
    resize_program: String,
    dpi: u32,
    jpeg_quality: u8,
}

impl GhostscriptBackend {
    pub fn new(
        gs_program: impl Into<String>,
        resize_program: impl Into<String>,
        dpi: u32,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            gs_program: gs_program.into(),
            resize_program: resize_program.into(),
            dpi,
            jpeg_quality,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(
            config.ghostscript_program.clone(),
            config.resize_program.clone(),
            config.dpi,
            config.jpeg_quality,
        )
    }

    /// Arguments for the metadata-only page-count query.
    pub fn count_args(doc: &Path) -> Vec<OsString> {
        let doc = doc.display().to_string();
        vec![
            "-q".into(),
            "-dNODISPLAY".into(),
            format!("--permit-file-read={doc}").into(),
            "-c".into(),
            format!(
                "({}) (r) file runpdfbegin pdfpagecount = quit",
                postscript_escape(&doc)
            )
            .into(),
        ]
    }

    /// Arguments rendering exactly one page to a JPEG.
    pub fn rasterize_args(&self, doc: &Path, page: u32, out: &Path) -> Vec<OsString> {
        let mut output_file = OsString::from("-sOutputFile=");
        output_file.push(out.as_os_str());
        vec![
            "-dNOPAUSE".into(),
            "-dBATCH".into(),
            "-sDEVICE=jpeg".into(),
            format!("-dFirstPage={page}").into(),
            format!("-dLastPage={page}").into(),
            output_file,
            format!("-dJPEGQ={}", self.jpeg_quality).into(),
            format!("-r{}", self.dpi).into(),
            "-q".into(),
            doc.as_os_str().to_owned(),
        ]
    }

    /// ImageMagick arguments; `>` only ever shrinks.
    pub fn resize_args(&self, src: &Path, max_w: u32, max_h: u32, dst: &Path) -> Vec<OsString> {
        vec![
            src.as_os_str().to_owned(),
            "-resize".into(),
            format!("{max_w}x{max_h}>").into(),
            "-quality".into(),
            self.jpeg_quality.to_string().into(),
            dst.as_os_str().to_owned(),
        ]
    }

    async fn run(&self, program: &str, args: Vec<OsString>) -> Result<Output, Pdf2JpegError> {
        debug!("Running {} {:?}", program, args);
        let output = Command::new(program)
            .args(&args)
            .output()
            .await
            .map_err(|e| Pdf2JpegError::ProcessFailed {
                program: program.to_string(),
                detail: format!("could not start: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Pdf2JpegError::ProcessFailed {
                program: program.to_string(),
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Ok(output)
    }
}

/// Escape `s` for use inside a PostScript `( … )` string literal.
fn postscript_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl RasterBackend for GhostscriptBackend {
    fn name(&self) -> &str {
        "ghostscript"
    }

    async fn count_pages(&self, doc: &Path) -> Result<u32, Pdf2JpegError> {
        let output = self
            .run(&self.gs_program, Self::count_args(doc))
            .await
            .map_err(|e| Pdf2JpegError::PageCountFailed {
                path: doc.to_path_buf(),
                detail: e.to_string(),
            })?;
        parse_page_count(doc, &String::from_utf8_lossy(&output.stdout))
    }

    async fn rasterize_page(
        &self,
        doc: &Path,
        page: u32,
        out: &Path,
    ) -> Result<(), Pdf2JpegError> {
        self.run(&self.gs_program, self.rasterize_args(doc, page, out))
            .await
            .map(|_| ())
    }

    async fn resize(
        &self,
        src: &Path,
        max_w: u32,
        max_h: u32,
        dst: &Path,
    ) -> Result<(), Pdf2JpegError> {
        self.run(&self.resize_program, self.resize_args(src, max_w, max_h, dst))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn rasterize_args_pin_one_page() {
        let gs = GhostscriptBackend::new("gs", "convert", 300, 90);
        let args = strings(gs.rasterize_args(
            &PathBuf::from("/tmp/doc.pdf"),
            7,
            &PathBuf::from("/tmp/page7-large.jpg"),
        ));
        assert!(args.contains(&"-dFirstPage=7".to_string()));
        assert!(args.contains(&"-dLastPage=7".to_string()));
        assert!(args.contains(&"-sOutputFile=/tmp/page7-large.jpg".to_string()));
        assert!(args.contains(&"-r300".to_string()));
        assert!(args.contains(&"-dJPEGQ=90".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/doc.pdf"));
    }

    #[test]
    fn resize_never_upscales() {
        let gs = GhostscriptBackend::new("gs", "magick", 200, 85);
        let args = strings(gs.resize_args(
            &PathBuf::from("a.jpg"),
            800,
            800,
            &PathBuf::from("b.jpg"),
        ));
        assert_eq!(args, vec!["a.jpg", "-resize", "800x800>", "-quality", "85", "b.jpg"]);
    }

    #[test]
    fn count_args_are_metadata_only() {
        let args = strings(GhostscriptBackend::count_args(&PathBuf::from("/tmp/d.pdf")));
        assert!(args.contains(&"-dNODISPLAY".to_string()));
        assert!(args.iter().any(|a| a.contains("pdfpagecount")));
        assert!(!args.iter().any(|a| a.starts_with("-sOutputFile")));
    }

    #[test]
    fn count_args_escape_postscript_string() {
        let args = strings(GhostscriptBackend::count_args(&PathBuf::from(
            r"/data/scan(1.pdf",
        )));
        assert!(args.contains(&r"--permit-file-read=/data/scan(1.pdf".to_string()));
        assert_eq!(
            args.last().map(String::as_str),
            Some(r"(/data/scan\(1.pdf) (r) file runpdfbegin pdfpagecount = quit")
        );

        assert_eq!(postscript_escape(r"C:\tmp\a (b).pdf"), r"C:\\tmp\\a \(b\).pdf");
    }

    #[tokio::test]
    async fn missing_program_is_process_failure() {
        let gs = GhostscriptBackend::new("pdf2jpeg-no-such-gs", "convert", 300, 90);
        let err = gs
            .rasterize_page(Path::new("x.pdf"), 1, Path::new("x.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2JpegError::ProcessFailed { ref program, .. } if program == "pdf2jpeg-no-such-gs"));

        let err = gs.count_pages(Path::new("x.pdf")).await.unwrap_err();
        assert!(matches!(err, Pdf2JpegError::PageCountFailed { .. }));
    }
}
