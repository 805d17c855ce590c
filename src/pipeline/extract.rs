//! PDF text extraction via pdfium.
//!
//! pdfium keeps thread-local state and blocks on I/O, so extraction runs
//! inside `tokio::task::spawn_blocking`. Pages are joined with a blank line
//! so the chunker can treat page breaks as paragraph breaks.

use crate::error::Prd2BoardError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Text of a whole document, one entry per page.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub pages: Vec<String>,
}

impl ExtractedText {
    /// All pages joined by a blank line, with empty pages dropped.
    pub fn joined(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Extract the text layer of every page.
///
/// # Errors
/// [`Prd2BoardError::EmptyDocument`] when no page carries any text (for
/// example a scanned PRD without OCR).
pub async fn extract_text(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<ExtractedText, Prd2BoardError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_text_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| Prd2BoardError::Internal(format!("Extraction task panicked: {e}")))?
}

fn extract_text_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<ExtractedText, Prd2BoardError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| map_load_error(pdf_path, password.is_some(), e))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut out = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map(|t| t.all())
            .map_err(|e| Prd2BoardError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
        debug!("Page {}: {} chars", idx + 1, text.chars().count());
        out.push(text);
    }

    let extracted = ExtractedText { pages: out };
    if extracted.pages.iter().all(|p| p.trim().is_empty()) {
        return Err(Prd2BoardError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }
    Ok(extracted)
}

/// Bind to `PDFIUM_LIB_PATH`, then a library in the working directory,
/// then the system library.
fn bind_pdfium() -> Result<Pdfium, Prd2BoardError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| Prd2BoardError::PdfiumBindingFailed(format!("{path}: {e:?}")));
    }
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| Prd2BoardError::PdfiumBindingFailed(format!("{e:?}")))
}

fn map_load_error(path: &Path, had_password: bool, e: PdfiumError) -> Prd2BoardError {
    let detail = format!("{e:?}");
    if detail.to_lowercase().contains("password") {
        if had_password {
            Prd2BoardError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Prd2BoardError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Prd2BoardError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_skips_blank_pages() {
        let t = ExtractedText {
            pages: vec![" Intro ".into(), "\n".into(), "Scope".into()],
        };
        assert_eq!(t.joined(), "Intro\n\nScope");
    }

    #[test]
    fn password_errors_are_classified() {
        let path = Path::new("prd.pdf");
        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);
        assert!(matches!(
            map_load_error(path, false, e),
            Prd2BoardError::PasswordRequired { .. }
        ));
        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);
        assert!(matches!(
            map_load_error(path, true, e),
            Prd2BoardError::WrongPassword { .. }
        ));
        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError);
        assert!(matches!(
            map_load_error(path, false, e),
            Prd2BoardError::CorruptPdf { .. }
        ));
    }
}
