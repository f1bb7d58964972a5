//! Source resolution: turn a local path or a store key into a PDF on disk.
//!
//! Both backends need a file-system path, so a PDF fetched from the object
//! store is written into a uniquely named `TempDir` that lives as long as the
//! [`ResolvedInput`]. The `%PDF` magic bytes are checked before returning so
//! a bad upload fails here rather than inside Ghostscript.

use crate::error::Pdf2JpegError;
use crate::store::ObjectStore;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// File name given to a fetched source inside its scratch directory.
const FETCHED_NAME: &str = "source.pdf";

/// The resolved source: a caller-owned file or a fetched temp copy.
pub enum ResolvedInput {
    Local(PathBuf),
    /// The `TempDir` is held so the file survives until processing ends.
    Fetched { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Fetched { path, .. } => path,
        }
    }
}

/// Validate a local path: it must exist, be readable and start with `%PDF`.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<ResolvedInput, Pdf2JpegError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Pdf2JpegError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != PDF_MAGIC {
                return Err(Pdf2JpegError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2JpegError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2JpegError::FileNotFound { path }),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Fetch `key` from `store` into a fresh temp directory.
///
/// `scratch_root` picks the parent of that directory; `None` uses the
/// system temp dir.
pub async fn fetch_source(
    store: &dyn ObjectStore,
    key: &str,
    scratch_root: Option<&Path>,
) -> Result<ResolvedInput, Pdf2JpegError> {
    info!("Fetching source PDF: {}", key);
    let bytes = store.fetch(key).await?;

    let temp_dir = scratch_tempdir(scratch_root)?;
    let path = temp_dir.path().join(FETCHED_NAME);

    if !bytes.starts_with(PDF_MAGIC) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(Pdf2JpegError::NotAPdf { path, magic });
    }

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| Pdf2JpegError::io(&path, e))?;
    debug!("Fetched {} bytes to {}", bytes.len(), path.display());

    Ok(ResolvedInput::Fetched {
        path,
        _temp_dir: temp_dir,
    })
}

/// A uniquely named directory under `root`, or under the system temp dir.
pub fn scratch_tempdir(root: Option<&Path>) -> Result<TempDir, Pdf2JpegError> {
    let dir = match root {
        Some(root) => tempfile::Builder::new().prefix("pdf2jpeg-").tempdir_in(root),
        None => tempfile::Builder::new().prefix("pdf2jpeg-").tempdir(),
    };
    dir.map_err(|e| Pdf2JpegError::Internal(format!("scratch directory: {e}")))
}
