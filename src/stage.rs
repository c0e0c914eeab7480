use anyhow::{Context, Result, anyhow};
use async_channel::{Receiver, Sender};

use crate::config::ReportConfig;
use crate::storage::Storage;
use crate::types::token::RunCancellationToken;
use crate::types::{Page, PageResult};

/// Result of sending a value to the next stage.
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

/// Shared context passed to each report pipeline stage.
///
/// Channels connect the stages: the page source writes to `page_sender`,
/// the workers read from `page_receiver` and write to `result_sender`, and
/// the aggregator drains the result channel directly. Each stage takes
/// ownership of a `Stage`, consuming it during pipeline construction.
pub struct Stage {
    pub config: ReportConfig,
    pub storage: Storage,
    pub page_sender: Option<Sender<Page>>,
    pub page_receiver: Option<Receiver<Page>>,
    pub result_sender: Option<Sender<PageResult>>,
    pub cancellation_token: RunCancellationToken,
}

impl Stage {
    pub fn new(
        config: ReportConfig,
        storage: Storage,
        page_sender: Option<Sender<Page>>,
        page_receiver: Option<Receiver<Page>>,
        result_sender: Option<Sender<PageResult>>,
        cancellation_token: RunCancellationToken,
    ) -> Self {
        Self {
            config,
            storage,
            page_sender,
            page_receiver,
            result_sender,
            cancellation_token,
        }
    }

    /// Send a page result to the aggregator.
    ///
    /// Returns `SendResult::Closed` if the downstream channel has been closed
    /// (e.g. due to cancellation), allowing the caller to exit gracefully.
    pub async fn send_result(&self, result: PageResult) -> Result<SendResult> {
        let sender = self.result_sender.as_ref().unwrap();
        let send_result = sender
            .send(result)
            .await
            .context("async_channel::Sender::send() failed.");

        if let Err(e) = send_result {
            return if !sender.is_closed() {
                Err(anyhow!(e))
            } else {
                Ok(SendResult::Closed)
            };
        }

        Ok(SendResult::Success)
    }
}
