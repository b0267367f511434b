//! Text extraction: turn PDF bytes into plain text via pdfium.
//!
//! pdfium is not async-safe, so both entry points move the work onto the
//! blocking pool with `tokio::task::spawn_blocking`.
//!
//! The extractor concatenates each page's text layer in page order without
//! inserting separators. Pages that carry no text layer (scanned images)
//! contribute an empty string; that is not an error.

use crate::error::ReviewError;
use crate::output::DocumentMetadata;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Env var pointing at a pdfium library file or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Plain text of a whole document, immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    text: String,
    page_count: usize,
}

impl DocumentText {
    /// Wrap already-extracted text (e.g. from a `.txt` file or a test).
    pub fn new(text: impl Into<String>, page_count: usize) -> Self {
        Self {
            text: text.into(),
            page_count,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True when the text holds nothing but whitespace (e.g. scanned pages).
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl AsRef<str> for DocumentText {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// How far into the file the `%PDF-` header may start. Readers tolerate
/// leading junk (BOM, whitespace, mail headers) before it.
pub const PDF_HEADER_SEARCH_WINDOW: usize = 1024;

/// Reject input with no `%PDF-` header in its first
/// [`PDF_HEADER_SEARCH_WINDOW`] bytes.
///
/// Runs before pdfium is bound, so obviously wrong inputs fail fast even on
/// hosts without the library.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), ReviewError> {
    let window = &bytes[..bytes.len().min(PDF_HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }
    Err(ReviewError::NotAPdf {
        magic: bytes.iter().take(4).copied().collect(),
    })
}

/// Extract the text of every page, concatenated in page order.
pub async fn extract_text(
    bytes: Vec<u8>,
    password: Option<&str>,
) -> Result<DocumentText, ReviewError> {
    extract_document(bytes, password).await.map(|(text, _)| text)
}

/// Extract text and metadata with a single pdfium load.
pub async fn extract_document(
    bytes: Vec<u8>,
    password: Option<&str>,
) -> Result<(DocumentText, DocumentMetadata), ReviewError> {
    check_pdf_magic(&bytes)?;
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_document_blocking(&bytes, pwd.as_deref()))
        .await
        .map_err(|e| ReviewError::Internal(format!("Extraction task panicked: {e}")))?
}

/// Read document metadata without extracting text.
pub async fn extract_metadata(
    bytes: Vec<u8>,
    password: Option<&str>,
) -> Result<DocumentMetadata, ReviewError> {
    check_pdf_magic(&bytes)?;
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&bytes, pwd.as_deref()))
        .await
        .map_err(|e| ReviewError::Internal(format!("Metadata task panicked: {e}")))?
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory,
/// then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, ReviewError> {
    let from_env = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(|p| {
            let path = PathBuf::from(&p);
            if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(p.as_str())
            } else {
                path
            }
        });

    let bindings = match from_env {
        Some(path) => {
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(path)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ReviewError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn open_error(err: PdfiumError, password: Option<&str>) -> ReviewError {
    let err_str = format!("{err:?}");
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            ReviewError::WrongPassword
        } else {
            ReviewError::PasswordRequired
        }
    } else {
        ReviewError::CorruptPdf { detail: err_str }
    }
}

fn extract_document_blocking(
    bytes: &[u8],
    password: Option<&str>,
) -> Result<(DocumentText, DocumentMetadata), ReviewError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| open_error(e, password))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let mut text = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page_text = page
            .text()
            .map_err(|e| ReviewError::PageTextFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, page_text.len());
        text.push_str(&page_text);
    }

    let text = DocumentText::new(text, page_count);
    if text.is_blank() {
        warn!("No extractable text layer found ({} pages); image-only PDF?", page_count);
    }

    Ok((text, read_metadata(&document)))
}

fn extract_metadata_blocking(
    bytes: &[u8],
    password: Option<&str>,
) -> Result<DocumentMetadata, ReviewError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| open_error(e, password))?;
    Ok(read_metadata(&document))
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}
