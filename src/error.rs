//! Error types for the edgequake-paper-review library.
//!
//! A single enum, [`ReviewError`], covers every way a request can fail.
//! There is no page-level or stage-level partial result: the first failure
//! aborts the request and propagates unchanged to the caller.
//!
//! Variants fall into three families that matter to callers:
//!
//! * **Extraction**: the PDF could not be turned into text (not a PDF,
//!   corrupt, encrypted, pdfium unavailable).
//! * **Authentication**: the remote service rejected the credential.
//! * **Generation**: any other remote failure (rate limit, malformed
//!   response, network fault, empty completion).
//!
//! [`ReviewError::kind`] maps each variant to its [`ErrorKind`] so callers
//! can branch on the family without matching every variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-paper-review library.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but could not be read (a directory, an I/O fault).
    #[error("Cannot read '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The bytes were read, but they are not a PDF.
    #[error("Input is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// pdfium failed while reading the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    PageTextFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No client could be built (missing API key, unknown provider, ...).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The remote service rejected the credential (401/403, invalid key).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// Remote API returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Generation call did not complete before the transport timeout.
    #[error("API call to '{provider}' timed out after {elapsed_ms}ms")]
    ApiTimeout { provider: String, elapsed_ms: u64 },

    /// Any other remote failure: HTTP error, network fault, bad JSON.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The call succeeded but carried no text (safety block, empty candidate list).
    #[error("Provider '{provider}' returned no text: {reason}")]
    EmptyCompletion { provider: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or request validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure family of a [`ReviewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The document could not be located or downloaded.
    Input,
    /// The document was read but text could not be extracted.
    Extraction,
    /// The credential was rejected by the remote service.
    Authentication,
    /// Any other failure of the remote generation call.
    Generation,
    /// The result could not be written.
    Output,
    /// The request or configuration was invalid.
    Config,
    /// Bug or runtime failure inside the library.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Input => "input",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Generation => "generation",
            ErrorKind::Output => "output",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl ReviewError {
    /// Classify this error into its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::FileNotFound { .. }
            | ReviewError::PermissionDenied { .. }
            | ReviewError::InputUnreadable { .. }
            | ReviewError::DownloadFailed { .. }
            | ReviewError::DownloadTimeout { .. } => ErrorKind::Input,

            ReviewError::NotAPdf { .. }
            | ReviewError::CorruptPdf { .. }
            | ReviewError::PasswordRequired
            | ReviewError::WrongPassword
            | ReviewError::PageTextFailed { .. }
            | ReviewError::PdfiumBindingFailed(_) => ErrorKind::Extraction,

            ReviewError::AuthError { .. } => ErrorKind::Authentication,

            ReviewError::ProviderNotConfigured { .. }
            | ReviewError::RateLimitExceeded { .. }
            | ReviewError::ApiTimeout { .. }
            | ReviewError::LlmApiError { .. }
            | ReviewError::EmptyCompletion { .. } => ErrorKind::Generation,

            ReviewError::OutputWriteFailed { .. } => ErrorKind::Output,
            ReviewError::InvalidConfig(_) => ErrorKind::Config,
            ReviewError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::Authentication`.
    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_display() {
        let e = ReviewError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: Some(60),
        };
        assert!(e.to_string().contains("gemini"));
        assert_eq!(e.kind(), ErrorKind::Generation);
    }

    #[test]
    fn auth_error_display_and_kind() {
        let e = ReviewError::AuthError {
            provider: "gemini".into(),
            detail: "API key not valid".into(),
        };
        assert!(e.to_string().contains("gemini"));
        assert!(e.to_string().contains("API key not valid"));
        assert!(e.is_auth());
    }

    #[test]
    fn extraction_family() {
        let errors = [
            ReviewError::NotAPdf {
                magic: b"GIF8".to_vec(),
            },
            ReviewError::CorruptPdf {
                detail: "bad xref".into(),
            },
            ReviewError::PasswordRequired,
            ReviewError::WrongPassword,
            ReviewError::PdfiumBindingFailed("missing".into()),
        ];
        for e in errors {
            assert_eq!(e.kind(), ErrorKind::Extraction, "{e}");
        }
    }

    #[test]
    fn api_timeout_display() {
        let e = ReviewError::ApiTimeout {
            provider: "openai".into(),
            elapsed_ms: 5000,
        };
        assert!(e.to_string().contains("5000ms"));
        assert!(!e.is_auth());
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(ErrorKind::Authentication.to_string(), "authentication");
        assert_eq!(ErrorKind::Extraction.to_string(), "extraction");
    }
}
