//! Document splitting: one multi-page PDF → N standalone single-page PDFs.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and CPU-heavy parsing.
//! [`split_document`] moves the work onto tokio's blocking pool so the
//! extraction calls already in flight elsewhere are not stalled.
//!
//! A split failure aborts the whole batch: no page can be attributed if the
//! page structure itself is unreadable.

use crate::error::BolError;
use crate::output::{PageDocument, SourceDocument};
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Decomposes a source document into ordered single-page documents.
///
/// Implementations are synchronous; the pipeline calls them from a blocking
/// thread. Page numbers must run 1..=N without gaps.
pub trait PageSplitter: Send + Sync {
    fn split(&self, document: &SourceDocument) -> Result<Vec<PageDocument>, BolError>;
}

/// Reject payloads that do not start with the `%PDF` magic.
///
/// Runs before pdfium is bound, so garbage input fails fast and without the
/// native library.
pub fn check_pdf_magic(document: &SourceDocument) -> Result<(), BolError> {
    let bytes = document.bytes();
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let shown = &bytes[..bytes.len().min(4)];
        return Err(BolError::DocumentFormat {
            filename: document.filename().to_string(),
            detail: format!("missing %PDF header (starts with {:02x?})", shown),
        });
    }
    Ok(())
}

/// Splits with pdfium: each page is copied into a fresh document and saved.
#[derive(Debug, Clone, Default)]
pub struct PdfiumSplitter {
    password: Option<String>,
}

impl PdfiumSplitter {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

impl PageSplitter for PdfiumSplitter {
    fn split(&self, document: &SourceDocument) -> Result<Vec<PageDocument>, BolError> {
        check_pdf_magic(document)?;

        let pdfium = pdfium_auto::bind_pdfium_silent()
            .map_err(|e| BolError::PdfiumBindingFailed(e.to_string()))?;

        let format_err = |detail: String| BolError::DocumentFormat {
            filename: document.filename().to_string(),
            detail,
        };

        let source = pdfium
            .load_pdf_from_byte_slice(document.bytes(), self.password.as_deref())
            .map_err(|e| format_err(format!("{:?}", e)))?;

        let total = source.pages().len() as usize;
        if total == 0 {
            return Err(format_err("document has no pages".into()));
        }
        info!("PDF loaded: {} pages", total);

        let mut pages = Vec::with_capacity(total);
        for idx in 0..total {
            let mut single = pdfium
                .create_new_pdf()
                .map_err(|e| format_err(format!("page {}: {:?}", idx + 1, e)))?;
            single
                .pages_mut()
                .copy_page_from_document(&source, idx as PdfPageIndex, 0)
                .map_err(|e| format_err(format!("page {}: {:?}", idx + 1, e)))?;
            let bytes = single
                .save_to_bytes()
                .map_err(|e| format_err(format!("page {}: {:?}", idx + 1, e)))?;

            debug!("Split page {} → {} bytes", idx + 1, bytes.len());
            pages.push(PageDocument::new(idx + 1, bytes));
        }

        Ok(pages)
    }
}

/// Split `document` on the blocking pool.
///
/// Consumes the source document; only its pages outlive this call.
pub async fn split_document(
    splitter: Arc<dyn PageSplitter>,
    document: SourceDocument,
) -> Result<Vec<PageDocument>, BolError> {
    let pages = tokio::task::spawn_blocking(move || splitter.split(&document))
        .await
        .map_err(|e| BolError::Internal(format!("Split task panicked: {}", e)))??;

    let in_order = pages
        .iter()
        .enumerate()
        .all(|(i, p)| p.page_number() == i + 1);
    if !in_order {
        return Err(BolError::Internal(
            "splitter returned pages out of order".into(),
        ));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_check_accepts_pdf_header() {
        let doc = SourceDocument::new("a.pdf", b"%PDF-1.7\n...".to_vec());
        assert!(check_pdf_magic(&doc).is_ok());
    }

    #[test]
    fn magic_check_rejects_other_bytes() {
        let doc = SourceDocument::new("a.pdf", b"PK\x03\x04zip".to_vec());
        let err = check_pdf_magic(&doc).unwrap_err();
        assert!(matches!(err, BolError::DocumentFormat { .. }));
        assert!(err.to_string().contains("a.pdf"));
    }

    #[test]
    fn magic_check_rejects_short_payload() {
        let doc = SourceDocument::new("tiny.pdf", b"%P".to_vec());
        assert!(check_pdf_magic(&doc).is_err());
    }

    #[test]
    fn pdfium_splitter_rejects_non_pdf_before_binding() {
        let doc = SourceDocument::new("notes.txt", b"hello".to_vec());
        let err = PdfiumSplitter::default().split(&doc).unwrap_err();
        assert!(matches!(err, BolError::DocumentFormat { .. }));
    }

    struct Shuffled;

    impl PageSplitter for Shuffled {
        fn split(&self, _document: &SourceDocument) -> Result<Vec<PageDocument>, BolError> {
            Ok(vec![PageDocument::new(2, vec![]), PageDocument::new(1, vec![])])
        }
    }

    #[tokio::test]
    async fn split_document_rejects_unordered_pages() {
        let doc = SourceDocument::new("a.pdf", b"%PDF".to_vec());
        let err = split_document(Arc::new(Shuffled), doc).await.unwrap_err();
        assert!(matches!(err, BolError::Internal(_)));
    }
}
