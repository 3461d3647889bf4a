//! Eager batch entry points: wait for every page, then return.
//!
//! A batch is split once, then every page goes through
//! [`extract_page`] either one at a time (`concurrency = 1`) or with up to
//! `concurrency` extraction calls in flight. Either way the returned
//! [`BatchResult`] lists pages in ascending order and has exactly one
//! outcome per page. Use [`crate::stream::process_stream`] to receive
//! outcomes as they complete instead.

use crate::cancel::CancellationFlag;
use crate::config::BatchConfig;
use crate::error::{BolError, PageError};
use crate::output::{BatchRequest, BatchResult, BatchStats, PageDocument, PageOutcome, SourceDocument};
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::extract::extract_page;
use crate::pipeline::input;
use crate::pipeline::reader::{resolve_reader, DocumentReader};
use crate::pipeline::split::{split_document, PageSplitter, PdfiumSplitter};
use crate::pricing::RateConfig;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_EXTRACTION_INSTRUCTION;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Filename used when a request does not name its document.
const UNNAMED_DOCUMENT: &str = "document.pdf";

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Process a local PDF file or URL.
///
/// # Errors
/// Returns `Err(BolError)` only for fatal errors: the input cannot be read,
/// the bytes are not a paged PDF, or no extraction provider is configured.
/// Failed pages are reported inside the [`BatchResult`].
pub async fn process_file(
    input_str: impl AsRef<str>,
    config: &BatchConfig,
) -> Result<BatchResult, BolError> {
    let document = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    process_document(document, config).await
}

/// Process a `{ pdfBase64, filename }` request.
///
/// Missing payload → [`BolError::MissingDocument`]; undecodable base64 →
/// [`BolError::InvalidEncoding`].
pub async fn process_request(
    request: BatchRequest,
    config: &BatchConfig,
) -> Result<BatchResult, BolError> {
    let document = decode_request(request)?;
    process_document(document, config).await
}

/// Synchronous wrapper around [`process_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    input_str: impl AsRef<str>,
    config: &BatchConfig,
) -> Result<BatchResult, BolError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BolError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_file(input_str, config))
}

/// Decode a request into the source document.
///
/// A `data:application/pdf;base64,` prefix, embedded whitespace (line-wrapped
/// bodies) and missing `=` padding are all tolerated.
pub fn decode_request(request: BatchRequest) -> Result<SourceDocument, BolError> {
    let filename = request
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| UNNAMED_DOCUMENT.to_string());

    let payload = request
        .pdf_base64
        .filter(|p| !p.trim().is_empty())
        .ok_or(BolError::MissingDocument)?;

    let payload = payload.trim();
    let payload = match payload.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, b64)| b64).unwrap_or(rest),
        None => payload,
    };

    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = LENIENT_BASE64
        .decode(&payload)
        .map_err(|e| BolError::InvalidEncoding {
            filename: filename.clone(),
            detail: e.to_string(),
        })?;

    Ok(SourceDocument::new(filename, bytes))
}

/// Process an in-memory source document.
///
/// This is the core entry point; the others only produce the document.
pub async fn process_document(
    document: SourceDocument,
    config: &BatchConfig,
) -> Result<BatchResult, BolError> {
    let total_start = Instant::now();
    let filename = document.filename().to_string();
    info!("Starting batch: {} ({} bytes)", filename, document.bytes().len());

    // ── Step 1: Split ────────────────────────────────────────────────────
    let split_start = Instant::now();
    let pages = split_document(default_splitter(config), document).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;
    let page_count = pages.len();
    info!("Split {} into {} pages in {}ms", filename, page_count, split_duration_ms);

    // ── Step 2: Snapshot everything the pages share ──────────────────────
    let ctx = BatchContext::new(config, page_count)?;
    if let Some(ref cb) = ctx.progress {
        cb.on_batch_start(page_count);
    }

    // ── Step 3: Extract, normalize and price each page ───────────────────
    let extraction_start = Instant::now();
    let (outcomes, cancelled) = if config.concurrency <= 1 {
        process_sequential(&ctx, &pages).await
    } else {
        process_concurrent(&ctx, &pages, config.concurrency).await
    };
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 4: Aggregate ────────────────────────────────────────────────
    let stats = BatchStats {
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        split_duration_ms,
        extraction_duration_ms,
        ..Default::default()
    };
    let result = aggregate(&filename, page_count, outcomes, cancelled, stats);

    info!(
        "Batch complete: {}/{} pages priced, {}ms total{}",
        result.succeeded,
        page_count,
        result.stats.total_duration_ms,
        if cancelled { " (cancelled)" } else { "" }
    );

    if let Some(ref cb) = ctx.progress {
        cb.on_batch_complete(page_count, result.succeeded);
    }

    Ok(result)
}

pub(crate) fn default_splitter(config: &BatchConfig) -> Arc<dyn PageSplitter> {
    match config.splitter {
        Some(ref s) => Arc::clone(s),
        None => Arc::new(PdfiumSplitter::new(config.password.clone())),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Per-batch state shared by every page. Built once at batch start, so the
/// rate table a batch prices with cannot change under it.
#[derive(Clone)]
pub(crate) struct BatchContext {
    pub reader: Arc<dyn DocumentReader>,
    pub rates: Arc<RateConfig>,
    pub instruction: Arc<str>,
    pub timeout_secs: u64,
    pub total_pages: usize,
    pub progress: Option<ProgressCallback>,
    pub cancellation: Option<CancellationFlag>,
}

impl BatchContext {
    pub fn new(config: &BatchConfig, total_pages: usize) -> Result<Self, BolError> {
        Ok(Self {
            reader: resolve_reader(config)?,
            rates: Arc::new(config.rates.clone()),
            instruction: Arc::from(
                config
                    .instruction
                    .as_deref()
                    .unwrap_or(DEFAULT_EXTRACTION_INSTRUCTION),
            ),
            timeout_secs: config.api_timeout_secs,
            total_pages,
            progress: config.progress_callback.clone(),
            cancellation: config.cancellation.clone(),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationFlag::is_cancelled)
    }

    /// Run one page, reporting progress around it.
    pub async fn run_page(&self, page: &PageDocument) -> PageOutcome {
        let page_num = page.page_number();
        if let Some(ref cb) = self.progress {
            cb.on_page_start(page_num, self.total_pages);
        }

        let outcome = extract_page(
            self.reader.as_ref(),
            page,
            &self.instruction,
            &self.rates,
            self.timeout_secs,
        )
        .await;

        debug!(
            "Page {}: {} in {}ms",
            page_num,
            if outcome.is_success() { "priced" } else { "failed" },
            outcome.duration_ms
        );

        if let Some(ref cb) = self.progress {
            match outcome.error() {
                None => cb.on_page_complete(page_num, self.total_pages),
                Some(e) => cb.on_page_error(page_num, self.total_pages, &e.to_string()),
            }
        }
        outcome
    }

    /// Like [`Self::run_page`], but a page reached after cancellation is
    /// reported as cancelled without calling the reader.
    pub async fn run_page_unless_cancelled(&self, page: &PageDocument) -> PageOutcome {
        if self.is_cancelled() {
            let page_num = page.page_number();
            return PageOutcome::failed(page_num, PageError::Cancelled { page: page_num }, 0);
        }
        self.run_page(page).await
    }
}

/// Process pages one at a time, in page order.
async fn process_sequential(ctx: &BatchContext, pages: &[PageDocument]) -> (Vec<PageOutcome>, bool) {
    let mut outcomes = Vec::with_capacity(pages.len());
    for page in pages {
        if ctx.is_cancelled() {
            info!("Batch cancelled after {} of {} pages", outcomes.len(), pages.len());
            return (outcomes, true);
        }
        outcomes.push(ctx.run_page(page).await);
    }
    (outcomes, false)
}

/// Process up to `concurrency` pages at once. Outcomes come back in
/// completion order; the aggregator restores page order.
async fn process_concurrent(
    ctx: &BatchContext,
    pages: &[PageDocument],
    concurrency: usize,
) -> (Vec<PageOutcome>, bool) {
    let outcomes: Vec<PageOutcome> = stream::iter(pages.iter().map(|page| async move {
        if ctx.is_cancelled() {
            None
        } else {
            Some(ctx.run_page(page).await)
        }
    }))
    .buffer_unordered(concurrency)
    .filter_map(|o| async move { o })
    .collect()
    .await;

    let cancelled = outcomes.len() < pages.len();
    if cancelled {
        info!("Batch cancelled after {} of {} pages", outcomes.len(), pages.len());
    }
    (outcomes, cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

    #[test]
    fn missing_payload_is_missing_document() {
        let err = decode_request(BatchRequest::default()).unwrap_err();
        assert!(matches!(err, BolError::MissingDocument));

        let blank = BatchRequest {
            pdf_base64: Some("   ".into()),
            filename: Some("a.pdf".into()),
        };
        assert!(matches!(decode_request(blank), Err(BolError::MissingDocument)));
    }

    #[test]
    fn bad_base64_is_invalid_encoding() {
        let req = BatchRequest {
            pdf_base64: Some("not base64!!".into()),
            filename: Some("a.pdf".into()),
        };
        match decode_request(req) {
            Err(BolError::InvalidEncoding { filename, .. }) => assert_eq!(filename, "a.pdf"),
            other => panic!("expected InvalidEncoding, got {other:?}"),
        }
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let req = BatchRequest {
            pdf_base64: Some(format!("data:application/pdf;base64,{}", STANDARD.encode(b"%PDF-1.4"))),
            filename: None,
        };
        let doc = decode_request(req).unwrap();
        assert_eq!(doc.bytes(), b"%PDF-1.4");
        assert_eq!(doc.filename(), UNNAMED_DOCUMENT);
    }

    #[test]
    fn line_wrapped_payload_is_accepted() {
        let pdf = [b'%'; 200];
        let encoded = STANDARD.encode(pdf);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        assert!(wrapped.contains('\n'));

        let req = BatchRequest {
            pdf_base64: Some(wrapped),
            filename: Some("wrapped.pdf".into()),
        };
        let doc = decode_request(req).unwrap();
        assert_eq!(doc.bytes(), &pdf[..]);
    }

    #[test]
    fn unpadded_payload_is_accepted() {
        let encoded = STANDARD_NO_PAD.encode(b"%PDF-1.7");
        assert!(!encoded.ends_with('='));

        let req = BatchRequest {
            pdf_base64: Some(encoded),
            filename: None,
        };
        assert_eq!(decode_request(req).unwrap().bytes(), b"%PDF-1.7");
    }
}
