//! Pipeline stages for BOL extraction and billing.
//!
//! Each submodule implements one step, so stages can be tested alone and
//! the external ones (splitting, reading) swapped behind their traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ extract ──────────────────────▶ aggregate
//! (URL/path) (pdfium)   │ reader (raster + VLM)         (ordered BatchResult)
//!                       │ normalize (untrusted JSON)
//!                       └ pricing (tariff)
//! ```
//!
//! 1. [`input`]     load the path or URL into a `SourceDocument`
//! 2. [`split`]     cut it into single-page PDFs; runs in `spawn_blocking`
//! 3. [`reader`]    ask the document-understanding service about one page;
//!    [`raster`] turns the page into a PNG for the vision model
//! 4. [`extract`]   bound the call with a timeout, find the JSON object,
//!    run [`normalize`] and price the shipment
//! 5. [`aggregate`] order the outcomes and count successes

pub mod aggregate;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod raster;
pub mod reader;
pub mod split;
