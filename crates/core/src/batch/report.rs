//! Aggregate result of one batch run

use std::time::Duration;

use changecast_domain::{BatchStatus, ItemOutcome, ItemResult};
use serde::Serialize;

/// Exactly one [`ItemResult`] per submitted item, ordered by submission index
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    results: Vec<ItemResult<T>>,
    cancelled: bool,
    elapsed: Duration,
}

impl<T> BatchReport<T> {
    pub(crate) fn new(mut results: Vec<ItemResult<T>>, cancelled: bool, elapsed: Duration) -> Self {
        results.sort_by_key(|r| r.index);
        Self { results, cancelled, elapsed }
    }

    /// Number of results, equal to the number of submitted items.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch had no items.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results in submission order.
    pub fn results(&self) -> &[ItemResult<T>] {
        &self.results
    }

    /// Consume the report, keeping submission order.
    pub fn into_results(self) -> Vec<ItemResult<T>> {
        self.results
    }

    /// Items that succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Items whose calls all failed.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }

    /// Items that never made a call.
    pub fn not_attempted(&self) -> usize {
        self.results.iter().filter(|r| matches!(r.outcome, ItemOutcome::NotAttempted)).count()
    }

    /// `(item_id, error)` for every failed item
    pub fn errors(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (r.item_id.as_str(), e)))
            .collect()
    }

    /// Degraded when some but not all items succeeded
    pub fn status(&self) -> BatchStatus {
        let succeeded = self.succeeded();
        if succeeded == self.len() {
            BatchStatus::Succeeded
        } else if succeeded == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Degraded
        }
    }

    /// Whether the deadline or the caller's token stopped the batch early
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Wall time of the whole batch.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, outcome: ItemOutcome<u32>) -> ItemResult<u32> {
        ItemResult { index, item_id: format!("item-{index}"), outcome }
    }

    fn ok(index: usize) -> ItemResult<u32> {
        result(index, ItemOutcome::Succeeded { value: index as u32, attempts: 1 })
    }

    fn failed(index: usize) -> ItemResult<u32> {
        result(index, ItemOutcome::Failed { error: "bad".into(), retryable: false, attempts: 1 })
    }

    #[test]
    fn test_results_sorted_by_index() {
        let report = BatchReport::new(vec![ok(2), failed(0), ok(1)], false, Duration::ZERO);
        let indices: Vec<usize> = report.results().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(report.errors(), vec![("item-0", "bad")]);
    }

    #[test]
    fn test_status() {
        assert_eq!(BatchReport::<u32>::new(Vec::new(), false, Duration::ZERO).status(), BatchStatus::Succeeded);
        assert_eq!(BatchReport::new(vec![ok(0), ok(1)], false, Duration::ZERO).status(), BatchStatus::Succeeded);
        assert_eq!(BatchReport::new(vec![ok(0), failed(1)], false, Duration::ZERO).status(), BatchStatus::Degraded);
        assert_eq!(BatchReport::new(vec![failed(0)], false, Duration::ZERO).status(), BatchStatus::Failed);

        let partial = BatchReport::new(vec![ok(0), result(1, ItemOutcome::NotAttempted)], true, Duration::ZERO);
        assert_eq!(partial.status(), BatchStatus::Degraded);
        assert_eq!(partial.not_attempted(), 1);
        assert!(partial.was_cancelled());
    }
}
