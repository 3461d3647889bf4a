//! Data carried through and out of the pipeline.
//!
//! Internal types ([`PageOutcome`], [`BatchResult`]) keep full precision and
//! real Rust types. The response types ([`BatchResponse`], [`PageView`],
//! [`PageData`]) are the wire shape: camelCase keys, amounts rounded to
//! cents, `"Quote Required"` in place of unpriced charges.

use crate::error::{NormalizationWarning, PageError};
use crate::pricing::{BillingLine, Charge};
use crate::shipment::NormalizedShipment;
use serde::{Deserialize, Serialize};

/// The multi-page document submitted for a batch.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    filename: String,
    bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One page cut out of a [`SourceDocument`], as a standalone document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    page_number: usize,
    bytes: Vec<u8>,
}

impl PageDocument {
    /// `page_number` is 1-based.
    pub fn new(page_number: usize, bytes: Vec<u8>) -> Self {
        Self { page_number, bytes }
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A normalized shipment together with its billing line.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedShipment {
    pub shipment: NormalizedShipment,
    pub billing: BillingLine,
}

/// Result of processing one page.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// 1-based page number.
    pub page_number: usize,
    pub result: Result<PricedShipment, PageError>,
    /// Substitutions made while normalizing; empty on failure.
    pub warnings: Vec<NormalizationWarning>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

impl PageOutcome {
    pub fn failed(page_number: usize, error: PageError, duration_ms: u64) -> Self {
        Self {
            page_number,
            result: Err(error),
            warnings: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&PageError> {
        self.result.as_ref().err()
    }
}

/// A failed page, as listed in [`BatchResult::failures`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFailure {
    pub page_number: usize,
    pub message: String,
}

/// Timing and usage totals for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total_duration_ms: u64,
    pub split_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

/// Everything a batch produced.
///
/// `outcomes.len() == page_count` always holds, in page order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub filename: String,
    /// Driver name derived from the filename.
    pub driver: String,
    pub page_count: usize,
    pub outcomes: Vec<PageOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    /// The caller cancelled the batch; unattempted pages are `PageError::Cancelled`.
    pub cancelled: bool,
    pub stats: BatchStats,
}

impl BatchResult {
    /// Successful pages in page order.
    pub fn billing_lines(&self) -> impl Iterator<Item = (usize, &PricedShipment)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|p| (o.page_number, p)))
    }

    /// Failed pages in page order.
    pub fn failures(&self) -> Vec<PageFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.error().map(|e| PageFailure {
                    page_number: o.page_number,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Convert into the wire response, rounding amounts to cents.
    pub fn to_response(&self) -> BatchResponse {
        BatchResponse {
            success: true,
            filename: self.filename.clone(),
            page_count: self.page_count,
            cancelled: self.cancelled,
            results: self.outcomes.iter().map(PageView::from).collect(),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Incoming batch request: base64 PDF plus its filename.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub pdf_base64: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Outgoing batch response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success: bool,
    pub filename: String,
    pub page_count: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
    pub results: Vec<PageView>,
}

/// One page in a [`BatchResponse`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page_number: usize,
    pub success: bool,
    pub data: Option<PageData>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NormalizationWarning>,
}

impl From<&PageOutcome> for PageView {
    fn from(outcome: &PageOutcome) -> Self {
        match &outcome.result {
            Ok(priced) => PageView {
                page_number: outcome.page_number,
                success: true,
                data: Some(PageData::new(&priced.shipment, &priced.billing)),
                error: None,
                warnings: outcome.warnings.clone(),
            },
            Err(e) => PageView {
                page_number: outcome.page_number,
                success: false,
                data: None,
                error: Some(e.to_string()),
                warnings: Vec::new(),
            },
        }
    }
}

/// The 13 extracted fields plus derived billing amounts, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub pro: String,
    /// `"?"` when the zone was not a valid letter.
    pub zone: String,
    pub weight: f64,
    pub volume: f64,
    pub liftgate: String,
    pub inside: String,
    pub residential: String,
    pub over_length: String,
    pub pallet_count: u32,
    pub has_debris_section: bool,
    pub is_lakeshore: bool,
    pub time_specific: String,
    pub detention: u32,

    pub chargeable_weight: f64,
    pub applicable_weight: f64,
    pub base_freight: Charge,
    pub fuel_surcharge: Charge,
    pub debris_removal: Option<f64>,
    pub liftgate_fee: Option<f64>,
    pub inside_delivery_fee: Option<f64>,
    pub over_length_fee: Option<f64>,
    pub residential_fee: Option<f64>,
    pub time_specific_fee: Option<f64>,
    pub detention_fee: Option<f64>,
    pub extras: f64,
    pub total: Charge,
}

impl PageData {
    pub fn new(shipment: &NormalizedShipment, billing: &BillingLine) -> Self {
        let fees = billing.accessorials;
        let fee = |pick: fn(&crate::pricing::Accessorials) -> f64| fees.as_ref().map(|a| round_cents(pick(a)));
        Self {
            pro: shipment.job_id.clone(),
            zone: shipment
                .zone
                .map(|z| z.to_string())
                .unwrap_or_else(|| "?".to_string()),
            weight: shipment.actual_weight,
            volume: shipment.volume,
            liftgate: shipment.liftgate.label().to_string(),
            inside: shipment.inside.label().to_string(),
            residential: shipment.residential.label().to_string(),
            over_length: shipment
                .over_length
                .map(|b| b.label().to_string())
                .unwrap_or_default(),
            pallet_count: shipment.pallet_count,
            has_debris_section: shipment.has_debris_section,
            is_lakeshore: shipment.is_lakeshore_client,
            time_specific: shipment
                .time_specific
                .map(|k| k.label().to_string())
                .unwrap_or_default(),
            detention: shipment.detention_minutes,

            chargeable_weight: round_cents(billing.chargeable_weight),
            applicable_weight: round_cents(billing.applicable_weight),
            base_freight: billing.base_freight.map(round_cents),
            fuel_surcharge: billing.fuel_surcharge.map(round_cents),
            debris_removal: fee(|a| a.debris_removal),
            liftgate_fee: fee(|a| a.liftgate),
            inside_delivery_fee: fee(|a| a.inside_delivery),
            over_length_fee: fee(|a| a.over_length),
            residential_fee: fee(|a| a.residential),
            time_specific_fee: fee(|a| a.time_specific),
            detention_fee: fee(|a| a.detention),
            extras: round_cents(billing.extras),
            total: billing.total.map(round_cents),
        }
    }
}

/// Round half away from zero to two decimals.
pub fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Driver name from a BOL filename: `John_Smith.pdf` → `John Smith`.
pub fn driver_from_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem = base
        .strip_suffix(".pdf")
        .or_else(|| base.strip_suffix(".PDF"))
        .unwrap_or(base);
    stem.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{price_shipment, RateConfig};
    use crate::shipment::{Flag, Zone};

    #[test]
    fn driver_name_from_filename() {
        assert_eq!(driver_from_filename("John_Smith.pdf"), "John Smith");
        assert_eq!(driver_from_filename("/tmp/scans/Ana_M_Lopez.PDF"), "Ana M Lopez");
        assert_eq!(driver_from_filename("plain"), "plain");
    }

    #[test]
    fn round_cents_half_away_from_zero() {
        assert_eq!(round_cents(1.234), 1.23);
        assert_eq!(round_cents(2.5), 2.5);
        assert_eq!(round_cents(9.999), 10.0);
    }

    #[test]
    fn page_data_rounds_and_labels() {
        let shipment = NormalizedShipment {
            job_id: "PRO-1".into(),
            zone: Some(Zone::H),
            actual_weight: 100.0,
            volume: 44.44,
            liftgate: Flag::Yes,
            ..Default::default()
        };
        let billing = price_shipment(&shipment, &RateConfig::default());
        let data = PageData::new(&shipment, &billing);

        assert_eq!(data.zone, "H");
        assert_eq!(data.liftgate, "Yes");
        assert_eq!(data.inside, "");
        assert_eq!(data.liftgate_fee, Some(20.0));
        // 44.44 ft³ → 667.759… lb
        assert_eq!(data.chargeable_weight, 667.76);
        assert_eq!(data.applicable_weight, 667.76);
    }

    #[test]
    fn page_data_for_unpriced_zone() {
        let shipment = NormalizedShipment::default();
        let billing = price_shipment(&shipment, &RateConfig::default());
        let data = PageData::new(&shipment, &billing);

        assert_eq!(data.zone, "?");
        assert_eq!(data.total, Charge::QuoteRequired);
        assert_eq!(data.liftgate_fee, None);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["total"], "Quote Required");
        assert_eq!(json["baseFreight"], "Quote Required");
        assert!(json["debrisRemoval"].is_null());
    }

    #[test]
    fn failed_outcome_view() {
        let outcome = PageOutcome::failed(
            2,
            PageError::ExtractionCall {
                page: 2,
                detail: "503".into(),
            },
            10,
        );
        let view = PageView::from(&outcome);
        assert!(!view.success);
        assert!(view.data.is_none());
        assert!(view.error.as_deref().unwrap_or("").contains("503"));
    }

    #[test]
    fn request_deserialises_camel_case() {
        let req: BatchRequest =
            serde_json::from_str(r#"{"pdfBase64":"JVBERg==","filename":"a.pdf"}"#).unwrap();
        assert_eq!(req.pdf_base64.as_deref(), Some("JVBERg=="));
        assert_eq!(req.filename.as_deref(), Some("a.pdf"));

        let empty: BatchRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.pdf_base64.is_none());
    }
}
