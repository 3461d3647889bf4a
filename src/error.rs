//! Error types for the bol-billing library.
//!
//! Three tiers of "something went wrong", from loudest to quietest:
//!
//! * [`BolError`] (**Fatal**): the batch cannot proceed at all (no source
//!   document, bytes that are not a PDF, provider not configured). Returned as
//!   `Err(BolError)` from the top-level `process*` functions.
//!
//! * [`PageError`] (**Non-fatal**): a single page failed (the extraction call
//!   errored or timed out, the reply held no usable JSON) but every other page
//!   is unaffected. Stored inside [`crate::output::PageOutcome`].
//!
//! * [`NormalizationWarning`] (**Informational**): a field came back outside
//!   its vocabulary and a safe default was substituted. The page is still
//!   priced; the warning rides along with the outcome.
//!
//! An unknown delivery zone is none of these: it prices as
//! [`crate::pricing::Charge::QuoteRequired`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bol-billing library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BolError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The batch request carried no source document.
    #[error("No PDF data provided")]
    MissingDocument,

    /// The request's document payload is not valid base64.
    #[error("PDF payload for '{filename}' is not valid base64: {detail}")]
    InvalidEncoding { filename: String, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes could not be parsed as a paged document. Aborts the batch.
    #[error("'{filename}' is not a readable PDF: {detail}")]
    DocumentFormat { filename: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
PDFium is normally downloaded automatically on first run.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumBindingFailed(String),

    // ── Extraction provider errors ────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A rate table file could not be read or parsed.
    #[error("Failed to load rate table '{path}': {detail}")]
    RateTable { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The batch continues; the page is reported as a failure in its
/// [`crate::output::PageOutcome`].
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PageError {
    /// The extraction call itself failed (transport or service error).
    #[error("Page {page}: extraction call failed: {detail}")]
    ExtractionCall { page: usize, detail: String },

    /// The extraction call did not answer within the configured timeout.
    #[error("Page {page}: extraction call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The page could not be rasterised for the vision model.
    #[error("Page {page}: rasterisation failed: {detail}")]
    Render { page: usize, detail: String },

    /// The reply did not contain a single parseable JSON object.
    #[error("Page {page}: could not parse response: {detail}")]
    ExtractionParse { page: usize, detail: String },

    /// The batch was cancelled before this page was attempted.
    #[error("Page {page}: batch cancelled before this page was processed")]
    Cancelled { page: usize },
}

impl PageError {
    /// The 1-based page number this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::ExtractionCall { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::Render { page, .. }
            | PageError::ExtractionParse { page, .. }
            | PageError::Cancelled { page } => *page,
        }
    }
}

/// A field was replaced with its safe default during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationWarning {
    /// Name of the field as it appears in the extraction reply (e.g. `zone`).
    pub field: String,
    /// The offending raw value, rendered as JSON text.
    pub value: String,
    /// What was wrong and what was substituted.
    pub reason: String,
}

impl std::fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}: {}", self.field, self.value, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_format_display() {
        let e = BolError::DocumentFormat {
            filename: "bol.pdf".into(),
            detail: "missing %PDF header".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("bol.pdf"), "got: {msg}");
        assert!(msg.contains("%PDF"), "got: {msg}");
    }

    #[test]
    fn missing_document_display() {
        assert_eq!(BolError::MissingDocument.to_string(), "No PDF data provided");
    }

    #[test]
    fn timeout_display() {
        let e = PageError::Timeout { page: 3, secs: 60 };
        assert!(e.to_string().contains("60s"));
        assert!(e.to_string().contains("Page 3"));
    }

    #[test]
    fn page_accessor_covers_every_variant() {
        let errors = [
            PageError::ExtractionCall { page: 1, detail: "503".into() },
            PageError::Timeout { page: 2, secs: 5 },
            PageError::Render { page: 3, detail: "bitmap".into() },
            PageError::ExtractionParse { page: 4, detail: "no json".into() },
            PageError::Cancelled { page: 5 },
        ];
        let pages: Vec<usize> = errors.iter().map(PageError::page).collect();
        assert_eq!(pages, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn warning_display() {
        let w = NormalizationWarning {
            field: "zone".into(),
            value: "\"Z\"".into(),
            reason: "not one of A-L".into(),
        };
        assert_eq!(w.to_string(), "zone = \"Z\": not one of A-L");
    }
}
