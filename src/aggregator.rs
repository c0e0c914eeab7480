use async_channel::Receiver;
use tracing::debug;

use crate::types::{AggregateResult, PageResult};

/// Final stage of the report pipeline: merges page results into one total.
///
/// The aggregator drains the result channel until every worker has dropped
/// its sender. Merging is commutative, so the completion order of the
/// workers never affects the totals.
pub struct ReportAggregator {
    receiver: Receiver<PageResult>,
}

impl ReportAggregator {
    pub fn new(receiver: Receiver<PageResult>) -> Self {
        Self { receiver }
    }

    /// Drain all page results and return the merged aggregate.
    pub async fn aggregate(&self) -> AggregateResult {
        let mut aggregate = AggregateResult::default();

        while let Ok(page_result) = self.receiver.recv().await {
            aggregate.merge(page_result);
        }

        debug!(
            total_objects = aggregate.total_objects,
            locked_objects = aggregate.total_locked_objects(),
            "aggregation completed."
        );
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::test_utils::init_dummy_tracing_subscriber;
    use crate::types::{LockMode, RetentionRecord};

    fn record(key: &str, days: i64, size: u64) -> RetentionRecord {
        RetentionRecord {
            key: key.to_string(),
            retain_until: Utc::now() + Duration::days(days),
            remaining_days: days,
            lock_mode: LockMode::Governance,
            size_bytes: size,
        }
    }

    fn page(records: Vec<RetentionRecord>, object_count: u64, total_bytes: u64) -> PageResult {
        let locked_bytes = records.iter().map(|r| r.size_bytes).sum();
        PageResult {
            records,
            object_count,
            total_bytes,
            locked_bytes,
        }
    }

    #[tokio::test]
    async fn aggregate_merges_all_page_results() {
        init_dummy_tracing_subscriber();

        let (sender, receiver) = async_channel::unbounded();
        sender
            .send(page(vec![record("a.txt", 10, 100)], 2, 300))
            .await
            .unwrap();
        sender
            .send(page(vec![record("c.txt", 10, 50)], 1, 50))
            .await
            .unwrap();
        drop(sender);

        let aggregate = ReportAggregator::new(receiver).aggregate().await;

        assert_eq!(aggregate.total_objects, 3);
        assert_eq!(aggregate.total_bytes, 350);
        assert_eq!(aggregate.total_locked_objects(), 2);
        assert_eq!(aggregate.total_locked_bytes, 150);
    }

    #[tokio::test]
    async fn aggregate_empty_channel() {
        init_dummy_tracing_subscriber();

        let (sender, receiver) = async_channel::unbounded::<PageResult>();
        drop(sender);

        let aggregate = ReportAggregator::new(receiver).aggregate().await;

        assert_eq!(aggregate.total_objects, 0);
        assert!(aggregate.records.is_empty());
    }
}
