use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, trace};

use crate::stage::{SendResult, Stage};
use crate::types::{Page, PageResult, RetentionRecord, RetentionStatus};

/// Whole days from `now` until `retain_until`.
///
/// With `clamp_negative` set, expired locks report zero instead of a
/// negative count.
pub fn remaining_days(
    retain_until: DateTime<Utc>,
    now: DateTime<Utc>,
    clamp_negative: bool,
) -> i64 {
    let days = (retain_until - now).num_days();
    if clamp_negative { days.max(0) } else { days }
}

/// Pipeline worker that turns listing pages into page results.
///
/// Each worker reads whole pages from the shared page channel (MPMC) and
/// looks up retention for the page's objects one at a time. Parallelism in
/// the pipeline is page-level only: within a page the lookups are strictly
/// sequential, which keeps per-worker concurrency at one in-flight API call.
pub struct PageWorker {
    worker_index: u16,
    stage: Stage,
}

impl PageWorker {
    pub fn new(stage: Stage, worker_index: u16) -> Self {
        Self {
            worker_index,
            stage,
        }
    }

    /// Main entry point: read pages from the channel until it closes.
    pub async fn process(&self) -> Result<()> {
        debug!(worker_index = self.worker_index, "page worker started.");

        loop {
            tokio::select! {
                recv_result = self.stage.page_receiver.as_ref().unwrap().recv() => {
                    match recv_result {
                        Ok(page) => {
                            let result = self.process_page(&page).await?;
                            if self.stage.send_result(result).await? == SendResult::Closed {
                                return Ok(());
                            }
                        }
                        Err(_) if self.stage.page_receiver.as_ref().unwrap().is_closed() => {
                            debug!(worker_index = self.worker_index, "page worker has been completed.");
                            break;
                        }
                        Err(e) => {
                            error!(worker_index = self.worker_index, error = %e, "unexpected channel error.");
                            break;
                        }
                    }
                },
                _ = self.stage.cancellation_token.cancelled() => {
                    info!(worker_index = self.worker_index, "page worker has been cancelled.");
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Look up retention for every object in the page, sequentially.
    ///
    /// Unlocked objects count toward the page totals but produce no record.
    /// Any retention lookup failure aborts the whole run; there is no
    /// per-object retry or skip.
    async fn process_page(&self, page: &Page) -> Result<PageResult> {
        let mut result = PageResult::default();
        let now = Utc::now();

        for object in &page.objects {
            result.object_count += 1;
            result.total_bytes += object.size_bytes;

            let status = self
                .stage
                .storage
                .get_object_retention(&self.stage.config.bucket, &object.key)
                .await?;

            match status {
                RetentionStatus::Locked { retain_until, mode } => {
                    result.locked_bytes += object.size_bytes;
                    result.records.push(RetentionRecord {
                        key: object.key.clone(),
                        retain_until,
                        remaining_days: remaining_days(
                            retain_until,
                            now,
                            self.stage.config.clamp_negative_remaining,
                        ),
                        lock_mode: mode,
                        size_bytes: object.size_bytes,
                    });
                }
                RetentionStatus::NotConfigured => {
                    trace!(key = object.key, "object has no retention configured.");
                }
            }
        }

        trace!(
            worker_index = self.worker_index,
            object_count = result.object_count,
            locked = result.records.len(),
            "page processed."
        );
        Ok(result)
    }
}
