//! Per-page extraction: call the reader, locate the JSON, normalize, price.
//!
//! [`extract_page`] always returns a [`PageOutcome`]; nothing that goes wrong
//! on one page escapes to the batch.

use crate::error::PageError;
use crate::output::{PageDocument, PageOutcome, PricedShipment};
use crate::pipeline::normalize::normalize_record;
use crate::pipeline::reader::DocumentReader;
use crate::pricing::{price_shipment, RateConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// First `{` through last `}`, across lines.
static RE_JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Find and parse the single JSON object in a model reply.
///
/// Prose and markdown fences around the object are ignored.
pub fn locate_json_object(page: usize, text: &str) -> Result<Map<String, Value>, PageError> {
    let parse_err = |detail: String| PageError::ExtractionParse { page, detail };

    let span = RE_JSON_SPAN
        .find(text)
        .ok_or_else(|| parse_err("no JSON object in response".into()))?;

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(parse_err(format!("expected a JSON object, got {}", other))),
        Err(e) => Err(parse_err(format!("invalid JSON: {}", e))),
    }
}

/// Extract, normalize and price one page.
pub async fn extract_page(
    reader: &dyn DocumentReader,
    page: &PageDocument,
    instruction: &str,
    rates: &RateConfig,
    timeout_secs: u64,
) -> PageOutcome {
    let start = Instant::now();
    let page_num = page.page_number();

    let reply = match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        reader.read(page, instruction),
    )
    .await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            warn!("{}", e);
            return PageOutcome::failed(page_num, e, elapsed_ms(start));
        }
        Err(_) => {
            let e = PageError::Timeout {
                page: page_num,
                secs: timeout_secs,
            };
            warn!("{}", e);
            return PageOutcome::failed(page_num, e, elapsed_ms(start));
        }
    };

    let (result, warnings) = match locate_json_object(page_num, &reply.text) {
        Ok(record) => {
            let (shipment, warnings) = normalize_record(&record);
            for w in &warnings {
                warn!("Page {}: {}", page_num, w);
            }
            let billing = price_shipment(&shipment, rates);
            debug!("Page {}: '{}' total {}", page_num, shipment.job_id, billing.total);
            (Ok(PricedShipment { shipment, billing }), warnings)
        }
        Err(e) => {
            warn!("{}", e);
            (Err(e), Vec::new())
        }
    };

    PageOutcome {
        page_number: page_num,
        result,
        warnings,
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        duration_ms: elapsed_ms(start),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::reader::ReaderReply;
    use crate::pricing::Charge;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    #[test]
    fn locates_object_inside_code_fence() {
        let text = "Here you go:\n```json\n{\"pro\": \"A1\", \"zone\": \"B\"}\n```\nDone.";
        let map = locate_json_object(1, text).unwrap();
        assert_eq!(map["pro"], "A1");
    }

    #[test]
    fn no_braces_is_parse_error() {
        let err = locate_json_object(4, "I could not read this page.").unwrap_err();
        assert!(matches!(err, PageError::ExtractionParse { page: 4, .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = locate_json_object(2, "{\"pro\": }").unwrap_err();
        assert!(matches!(err, PageError::ExtractionParse { page: 2, .. }));
    }

    #[test]
    fn two_objects_do_not_parse_as_one() {
        assert!(locate_json_object(1, "{\"a\":1} and {\"b\":2}").is_err());
    }

    struct Fixed(Result<&'static str, PageError>);

    impl DocumentReader for Fixed {
        fn read<'a>(
            &'a self,
            _page: &'a PageDocument,
            _instruction: &'a str,
        ) -> BoxFuture<'a, Result<ReaderReply, PageError>> {
            let reply = self.0.clone().map(|t| ReaderReply {
                text: t.to_string(),
                input_tokens: 100,
                output_tokens: 20,
            });
            async move { reply }.boxed()
        }
    }

    struct Stalled;

    impl DocumentReader for Stalled {
        fn read<'a>(
            &'a self,
            _page: &'a PageDocument,
            _instruction: &'a str,
        ) -> BoxFuture<'a, Result<ReaderReply, PageError>> {
            futures::future::pending().boxed()
        }
    }

    #[tokio::test]
    async fn successful_page_is_priced() {
        let reader = Fixed(Ok(r#"{"pro":"P1","zone":"A","weight":1000}"#));
        let page = PageDocument::new(1, vec![]);
        let outcome = extract_page(&reader, &page, "x", &RateConfig::default(), 5).await;

        let priced = outcome.result.as_ref().unwrap();
        assert_eq!(priced.shipment.job_id, "P1");
        assert!(priced.billing.total.is_priced());
        assert_eq!(outcome.input_tokens, 100);
        assert_eq!(outcome.output_tokens, 20);
    }

    #[tokio::test]
    async fn invalid_zone_is_success_with_quote_required() {
        let reader = Fixed(Ok(r#"{"pro":"P2","zone":"Q","weight":500}"#));
        let page = PageDocument::new(1, vec![]);
        let outcome = extract_page(&reader, &page, "x", &RateConfig::default(), 5).await;

        let priced = outcome.result.as_ref().unwrap();
        assert_eq!(priced.billing.total, Charge::QuoteRequired);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn call_error_becomes_page_failure() {
        let reader = Fixed(Err(PageError::ExtractionCall {
            page: 3,
            detail: "HTTP 503".into(),
        }));
        let page = PageDocument::new(3, vec![]);
        let outcome = extract_page(&reader, &page, "x", &RateConfig::default(), 5).await;
        assert!(matches!(outcome.error(), Some(PageError::ExtractionCall { page: 3, .. })));
    }

    #[tokio::test]
    async fn stalled_call_times_out() {
        let page = PageDocument::new(2, vec![]);
        let outcome = extract_page(&Stalled, &page, "x", &RateConfig::default(), 1).await;
        assert_eq!(outcome.error(), Some(&PageError::Timeout { page: 2, secs: 1 }));
    }
}
