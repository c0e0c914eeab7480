use anyhow::Result;
use tracing::debug;

use crate::stage::Stage;

/// Lists object pages from the bucket for the report pipeline.
///
/// This is a thin wrapper around the `Stage` that delegates to
/// `Storage::list_object_pages()`. The actual pagination loop (continuation
/// tokens, cancellation checks) is implemented in the `StorageTrait` method
/// on `S3Storage` (see `storage/s3/mod.rs`).
///
/// ## Pipeline role
///
/// The PageSource is the first stage in the report pipeline:
///
/// ```text
/// PageSource → PageWorkers (MPMC) → Aggregator
/// ```
///
/// It has no input channel (it's the entry point) and writes whole listing
/// pages to `stage.page_sender`; ordering across pages stops mattering here,
/// since the aggregation downstream is commutative.
pub struct PageSource {
    stage: Stage,
}

impl PageSource {
    pub fn new(stage: Stage) -> Self {
        Self { stage }
    }

    /// List all pages of the configured bucket and send them downstream.
    ///
    /// The `max_keys` parameter controls how many keys are returned per S3
    /// API request (page size), not the total number of objects listed.
    pub async fn list_pages(&self, max_keys: i32) -> Result<()> {
        debug!(bucket = self.stage.config.bucket, "page listing has started.");

        self.stage
            .storage
            .list_object_pages(
                &self.stage.config.bucket,
                self.stage.page_sender.as_ref().unwrap(),
                max_keys,
            )
            .await?;

        debug!(
            bucket = self.stage.config.bucket,
            "page listing has been completed."
        );
        Ok(())
    }
}
