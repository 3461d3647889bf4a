//! Merge per-page outcomes into one [`BatchResult`].

use crate::error::PageError;
use crate::output::{driver_from_filename, BatchResult, BatchStats, PageOutcome};

/// Build the batch result.
///
/// Outcomes may arrive in any order. Pages with no outcome at all (never
/// attempted because the batch was cancelled) are filled in as
/// [`PageError::Cancelled`], so the result always has exactly `page_count`
/// outcomes in ascending page order.
pub fn aggregate(
    filename: &str,
    page_count: usize,
    mut outcomes: Vec<PageOutcome>,
    cancelled: bool,
    mut stats: BatchStats,
) -> BatchResult {
    outcomes.sort_by_key(|o| o.page_number);
    outcomes.dedup_by_key(|o| o.page_number);
    outcomes.retain(|o| (1..=page_count).contains(&o.page_number));

    if outcomes.len() < page_count {
        let mut filled = Vec::with_capacity(page_count);
        let mut seen = outcomes.into_iter().peekable();
        for page in 1..=page_count {
            match seen.next_if(|o| o.page_number == page) {
                Some(o) => filled.push(o),
                None => filled.push(PageOutcome::failed(page, PageError::Cancelled { page }, 0)),
            }
        }
        outcomes = filled;
    }

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    stats.total_input_tokens = outcomes.iter().map(|o| o.input_tokens).sum();
    stats.total_output_tokens = outcomes.iter().map(|o| o.output_tokens).sum();

    BatchResult {
        filename: filename.to_string(),
        driver: driver_from_filename(filename),
        page_count,
        failed: page_count - succeeded,
        succeeded,
        outcomes,
        cancelled,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PricedShipment;
    use crate::pricing::{price_shipment, RateConfig};
    use crate::shipment::NormalizedShipment;

    fn ok(page: usize) -> PageOutcome {
        let shipment = NormalizedShipment::default();
        let billing = price_shipment(&shipment, &RateConfig::default());
        PageOutcome {
            page_number: page,
            result: Ok(PricedShipment { shipment, billing }),
            warnings: Vec::new(),
            input_tokens: 10,
            output_tokens: 2,
            duration_ms: 1,
        }
    }

    fn fail(page: usize) -> PageOutcome {
        PageOutcome::failed(
            page,
            PageError::ExtractionParse {
                page,
                detail: "no JSON".into(),
            },
            1,
        )
    }

    #[test]
    fn sorts_by_page_and_counts() {
        let result = aggregate(
            "Jane_Doe.pdf",
            3,
            vec![ok(3), fail(2), ok(1)],
            false,
            BatchStats::default(),
        );
        let pages: Vec<usize> = result.outcomes.iter().map(|o| o.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.driver, "Jane Doe");
        assert_eq!(result.stats.total_input_tokens, 20);
        assert_eq!(result.failures()[0].page_number, 2);
    }

    #[test]
    fn missing_pages_become_cancelled() {
        let result = aggregate("a.pdf", 4, vec![ok(1), ok(3)], true, BatchStats::default());
        assert_eq!(result.outcomes.len(), 4);
        assert!(result.cancelled);
        assert_eq!(
            result.outcomes[1].error(),
            Some(&PageError::Cancelled { page: 2 })
        );
        assert_eq!(
            result.outcomes[3].error(),
            Some(&PageError::Cancelled { page: 4 })
        );
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 2);
    }

    #[test]
    fn empty_batch() {
        let result = aggregate("a.pdf", 0, Vec::new(), false, BatchStats::default());
        assert!(result.outcomes.is_empty());
        assert_eq!(result.failed, 0);
    }
}
