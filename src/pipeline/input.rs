//! Input resolution: turn a path, URL or byte buffer into a local PDF file.
//!
//! pdfium opens documents from the file system, so URLs and in-memory
//! buffers are written to a temporary location that lives exactly as long
//! as the returned [`ResolvedInput`]. The `%PDF` magic is checked up front
//! so a wrong file type fails with [`Prd2BoardError::NotAPdf`] instead of an
//! opaque pdfium error.

use crate::error::Prd2BoardError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF that can be opened by path for as long as this value lives.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL, downloaded into a temporary directory.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was a byte buffer, spilled to a temporary file.
    Buffered(NamedTempFile),
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Buffered(file) => file.path(),
        }
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or `http(s)://` URL to a local PDF.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Prd2BoardError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Write `bytes` to a temporary file after checking the PDF magic.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, Prd2BoardError> {
    let label = PathBuf::from("<bytes>");
    check_magic(&label, bytes)?;

    let mut tmp = NamedTempFile::new()
        .map_err(|e| Prd2BoardError::Internal(format!("Failed to create temp file: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| Prd2BoardError::Internal(format!("Failed to write temp file: {e}")))?;

    debug!("Buffered {} bytes to {}", bytes.len(), tmp.path().display());
    Ok(ResolvedInput::Buffered(tmp))
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, Prd2BoardError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Prd2BoardError::FileNotFound { path });
    }

    let mut head = Vec::with_capacity(4);
    match std::fs::File::open(&path) {
        Ok(f) => {
            f.take(4).read_to_end(&mut head).map_err(|e| Prd2BoardError::CorruptPdf {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Prd2BoardError::PermissionDenied { path });
        }
        Err(_) => return Err(Prd2BoardError::FileNotFound { path }),
    }
    check_magic(&path, &head)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), Prd2BoardError> {
    if bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(Prd2BoardError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Prd2BoardError> {
    info!("Downloading PRD from: {}", url);

    let failed = |reason: String| Prd2BoardError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Prd2BoardError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| Prd2BoardError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));
    check_magic(&file_path, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Prd2BoardError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of `url` when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "prd.pdf".to_string())
}
