//! Streaming batch API: emit page outcomes as they complete.
//!
//! Unlike [`crate::batch::process_document`], which returns only after every
//! page is priced, [`process_stream`] yields each [`PageOutcome`] as soon as
//! its extraction call returns. With `concurrency > 1` outcomes arrive in
//! completion order; sort by `page_number` if order matters, or feed the
//! collected outcomes to [`crate::pipeline::aggregate::aggregate`].
//!
//! Every page yields exactly one outcome. Pages reached after the
//! cancellation flag is raised yield [`crate::PageError::Cancelled`].
//! A progress callback sees `on_batch_complete` once the last outcome has
//! been yielded.

use crate::batch::{decode_request, default_splitter, BatchContext};
use crate::config::BatchConfig;
use crate::error::BolError;
use crate::output::{BatchRequest, PageOutcome, SourceDocument};
use crate::pipeline::input;
use crate::pipeline::split::split_document;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page outcomes.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = PageOutcome> + Send>>;

/// A split document ready to stream.
pub struct PageStream {
    pub filename: String,
    pub page_count: usize,
    pub outcomes: OutcomeStream,
}

/// Split a local PDF file or URL, then stream its page outcomes.
///
/// # Errors
/// Fatal errors (unreadable input, not a PDF, no provider) are returned
/// before the stream is built.
pub async fn process_stream(
    input_str: impl AsRef<str>,
    config: &BatchConfig,
) -> Result<PageStream, BolError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming batch: {}", input_str);
    let document = input::resolve_input(input_str, config.download_timeout_secs).await?;
    process_document_stream(document, config).await
}

/// Streaming equivalent of [`crate::batch::process_request`].
pub async fn process_request_stream(
    request: BatchRequest,
    config: &BatchConfig,
) -> Result<PageStream, BolError> {
    process_document_stream(decode_request(request)?, config).await
}

/// Streaming equivalent of [`crate::batch::process_document`].
///
/// # Example
/// ```rust,no_run
/// use bol_billing::{process_document_stream, BatchConfig, SourceDocument};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("John_Smith.pdf")?;
/// let config = BatchConfig::builder().concurrency(4).build()?;
/// let mut pages = process_document_stream(SourceDocument::new("John_Smith.pdf", bytes), &config).await?;
/// while let Some(outcome) = pages.outcomes.next().await {
///     match outcome.result {
///         Ok(p) => println!("Page {}: {} → {}", outcome.page_number, p.shipment.job_id, p.billing.total),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn process_document_stream(
    document: SourceDocument,
    config: &BatchConfig,
) -> Result<PageStream, BolError> {
    let filename = document.filename().to_string();
    let pages = split_document(default_splitter(config), document).await?;
    let page_count = pages.len();
    info!("Streaming {} pages of {}", page_count, filename);

    let ctx = Arc::new(BatchContext::new(config, page_count)?);
    if let Some(ref cb) = ctx.progress {
        cb.on_batch_start(page_count);
    }
    let concurrency = config.concurrency.max(1);
    let succeeded = Arc::new(AtomicUsize::new(0));

    // Runs once the page stream is exhausted.
    let finish = {
        let ctx = Arc::clone(&ctx);
        let succeeded = Arc::clone(&succeeded);
        stream::once(async move {
            let succeeded = succeeded.load(Ordering::SeqCst);
            info!("Stream complete: {}/{} pages priced", succeeded, page_count);
            if let Some(ref cb) = ctx.progress {
                cb.on_batch_complete(page_count, succeeded);
            }
        })
        .filter_map(|()| async { None::<PageOutcome> })
    };

    let outcomes = stream::iter(pages.into_iter().map(move |page| {
        let ctx = Arc::clone(&ctx);
        async move { ctx.run_page_unless_cancelled(&page).await }
    }))
    .buffer_unordered(concurrency)
    .inspect(move |outcome| {
        if outcome.is_success() {
            succeeded.fetch_add(1, Ordering::SeqCst);
        }
    })
    .chain(finish);

    Ok(PageStream {
        filename,
        page_count,
        outcomes: Box::pin(outcomes),
    })
}
