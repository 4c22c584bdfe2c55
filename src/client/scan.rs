//! Bounded, fault-tolerant collection of cursor-paged records.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;

use super::http::{ClientInner, RequestOptions};
use super::paginated::RawPage;

/// The result of a bounded scan over a paged collection.
///
/// Invariant: `scanned_count` equals the number of parsed records plus
/// `skipped_count` — every record examined is accounted for exactly once.
#[derive(Debug, Clone)]
pub struct ScanOutcome<T> {
    /// Successfully parsed records, in arrival order.
    pub records: Vec<T>,
    /// Raw records examined.
    pub scanned_count: usize,
    /// Records that failed to parse.
    pub skipped_count: usize,
    /// One diagnostic per skipped record, plus any scan-level notes.
    pub errors: Vec<String>,
    /// The continuation cursor of the last page seen, when any.
    pub next_link: Option<String>,
    /// `true` iff a continuation cursor exists and the record bound caused
    /// the stop — the collection has more than the caller asked for.
    pub has_more: bool,
    /// Folder the scan targeted, when the caller resolved one.
    pub folder_id: Option<String>,
    /// Display name of that folder, when known.
    pub folder_name: Option<String>,
}

impl<T> Default for ScanOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            scanned_count: 0,
            skipped_count: 0,
            errors: Vec::new(),
            next_link: None,
            has_more: false,
            folder_id: None,
            folder_name: None,
        }
    }
}

impl<T> ScanOutcome<T> {
    /// Percentage of examined records that parsed successfully; zero for an
    /// empty scan.
    pub fn success_rate(&self) -> f64 {
        if self.scanned_count == 0 {
            return 0.0;
        }
        (self.scanned_count - self.skipped_count) as f64 / self.scanned_count as f64 * 100.0
    }
}

/// Drives repeated requests through the client, following the continuation
/// cursor and accumulating parsed records up to a caller-specified bound.
///
/// Request failures never escape a scan: the paginator stops early and
/// returns whatever it accumulated, because partial results are always
/// preferable to total failure for a scan operation. Per-record parse
/// failures are recorded and skipped without aborting the page.
pub struct Paginator {
    inner: Arc<ClientInner>,
}

impl Paginator {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Collect up to `max_records` parsed records starting at
    /// `initial_path`.
    ///
    /// The first request carries `params` plus `$top = min(batch_size,
    /// max_records - already_fetched)`; continuation requests use the
    /// cursor URL verbatim, since it is a fully qualified, self-describing
    /// continuation. Accumulation stops the moment the bound is reached,
    /// even mid-page, retaining that page's cursor for `has_more`.
    pub async fn collect<T: DeserializeOwned>(
        &self,
        initial_path: &str,
        params: Vec<(String, String)>,
        batch_size: usize,
        max_records: usize,
    ) -> ScanOutcome<T> {
        let mut outcome = ScanOutcome::default();
        if max_records == 0 {
            return outcome;
        }
        let batch_size = batch_size.max(1);
        let mut fetched_raw = 0usize;

        loop {
            let request = match &outcome.next_link {
                Some(link) => {
                    self.inner
                        .request(Method::GET, link, RequestOptions::default())
                        .await
                }
                None => {
                    let remaining = max_records - fetched_raw;
                    let mut page_params = params.clone();
                    page_params.push(("$top".to_string(), batch_size.min(remaining).to_string()));
                    self.inner
                        .request(
                            Method::GET,
                            initial_path,
                            RequestOptions::with_params(page_params),
                        )
                        .await
                }
            };

            let body = match request {
                Ok(body) => body,
                Err(err) => {
                    // Keep what was already fetched rather than losing the
                    // whole scan to one failed page.
                    tracing::warn!(error = %err, "page request failed, stopping scan early");
                    break;
                }
            };

            let page = RawPage::from_body(body);
            if page.items.is_empty() {
                break;
            }
            fetched_raw += page.items.len();
            outcome.next_link = page.next_link;

            for item in page.items {
                outcome.scanned_count += 1;
                match serde_json::from_value::<T>(item) {
                    Ok(record) => outcome.records.push(record),
                    Err(err) => {
                        outcome.skipped_count += 1;
                        outcome.errors.push(format!("failed to parse record: {err}"));
                    }
                }
                if outcome.records.len() >= max_records {
                    break;
                }
            }

            if outcome.records.len() >= max_records {
                break;
            }
            if outcome.next_link.is_none() {
                break;
            }
            if fetched_raw >= max_records {
                break;
            }
        }

        outcome.has_more = outcome.next_link.is_some() && outcome.records.len() >= max_records;
        tracing::debug!(
            records = outcome.records.len(),
            scanned = outcome.scanned_count,
            skipped = outcome.skipped_count,
            has_more = outcome.has_more,
            "scan finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counts_balance() {
        let outcome: ScanOutcome<serde_json::Value> = ScanOutcome {
            scanned_count: 5,
            skipped_count: 2,
            records: vec![1.into(), 2.into(), 3.into()],
            ..Default::default()
        };
        assert_eq!(
            outcome.scanned_count,
            outcome.records.len() + outcome.skipped_count
        );
        assert!((outcome.success_rate() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_outcome_success_rate() {
        let outcome: ScanOutcome<serde_json::Value> = ScanOutcome::default();
        assert_eq!(outcome.success_rate(), 0.0);
        assert!(!outcome.has_more);
    }
}
