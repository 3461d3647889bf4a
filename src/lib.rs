//! # bol-billing
//!
//! Extract shipment data from bill-of-lading (BOL) PDFs with a Vision
//! Language Model and price every page against a tiered freight tariff.
//!
//! A driver's day of deliveries arrives as one scanned PDF, one BOL per
//! page. Each page is cut out, read by a VLM into a 13-field JSON record,
//! normalized into a typed [`NormalizedShipment`], and priced into a
//! [`BillingLine`]. One unreadable page never costs the others.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Split      one single-page PDF per BOL (pdfium, spawn_blocking)
//!  ├─ 3. Read       rasterise + ask the VLM for the 13 fields
//!  ├─ 4. Normalize  untrusted JSON → NormalizedShipment (+ warnings)
//!  ├─ 5. Price      zone tariff, fuel surcharge, accessorials
//!  └─ 6. Aggregate  ordered PageOutcomes + counts
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bol_billing::{process_file, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from ANTHROPIC_API_KEY / OPENAI_API_KEY / ...
//!     let config = BatchConfig::default();
//!     let result = process_file("John_Smith.pdf", &config).await?;
//!     for (page, priced) in result.billing_lines() {
//!         println!("{page}: {} {}", priced.shipment.job_id, priced.billing.total);
//!     }
//!     for failure in result.failures() {
//!         eprintln!("{}: {}", failure.page_number, failure.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The pricing engine is usable on its own:
//!
//! ```rust
//! use bol_billing::{price_shipment, Flag, NormalizedShipment, RateConfig, Zone};
//!
//! let shipment = NormalizedShipment {
//!     job_id: "PRO-1".into(),
//!     zone: Some(Zone::A),
//!     actual_weight: 1000.0,
//!     liftgate: Flag::Yes,
//!     ..Default::default()
//! };
//! let line = price_shipment(&shipment, &RateConfig::default());
//! assert!(line.total.is_priced());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `bol2bill` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embeds the pdfium shared library in the binary |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! bol-billing = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod cancel;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod pricing;
pub mod progress;
pub mod prompts;
pub mod shipment;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{decode_request, process_document, process_file, process_request, process_sync};
pub use cancel::CancellationFlag;
pub use config::{BatchConfig, BatchConfigBuilder};
pub use error::{BolError, NormalizationWarning, PageError};
pub use output::{
    BatchRequest, BatchResponse, BatchResult, BatchStats, PageData, PageDocument, PageFailure,
    PageOutcome, PageView, PricedShipment, SourceDocument,
};
pub use pipeline::reader::{DocumentReader, LlmDocumentReader, ReaderReply};
pub use pipeline::split::{PageSplitter, PdfiumSplitter};
pub use pricing::{price_shipment, price_shipment_with_extras, BillingLine, Charge, RateConfig};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use shipment::{Flag, NormalizedShipment, OverLengthBucket, TimeSpecificKind, Zone};
pub use stream::{process_document_stream, process_request_stream, process_stream, OutcomeStream, PageStream};
