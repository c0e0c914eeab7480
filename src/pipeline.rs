//! Retention report pipeline orchestrator.
//!
//! Creates and connects the report stages and collects their errors:
//!
//! ```text
//! PageSource → PageWorkers (MPMC) → ReportAggregator
//! ```
//!
//! Listing pages flow through a bounded channel so a slow retention phase
//! backpressures the lister instead of buffering the whole bucket. Page
//! results flow through an unbounded channel; workers never block on output.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::aggregator::ReportAggregator;
use crate::config::{ClientConfig, ReportConfig};
use crate::lister::PageSource;
use crate::stage::Stage;
use crate::storage::{self, Storage};
use crate::types::token::RunCancellationToken;
use crate::types::{AggregateResult, Page, PageResult};
use crate::validator;
use crate::worker::PageWorker;

/// The report pipeline orchestrator.
///
/// Validates the bucket, runs the stages to completion and holds the merged
/// aggregate. The first stage failure cancels the whole run; a cancelled or
/// failed run produces no aggregate, never a partial one.
///
/// ## Usage
///
/// ```no_run
/// # async fn example() {
/// # use s3lock_rs::{ReportPipeline, create_run_cancellation_token};
/// # use s3lock_rs::config::{ClientConfig, ReportConfig};
/// # let report_config: ReportConfig = todo!();
/// # let client_config: ClientConfig = todo!();
/// let cancellation_token = create_run_cancellation_token();
/// let mut pipeline = ReportPipeline::new(report_config, client_config, cancellation_token).await;
/// pipeline.run().await;
/// if pipeline.has_error() {
///     eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
/// }
/// # }
/// ```
pub struct ReportPipeline {
    config: ReportConfig,
    storage: Storage,
    cancellation_token: RunCancellationToken,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<anyhow::Error>>>,
    ready: bool,
    aggregate: Option<AggregateResult>,
}

impl ReportPipeline {
    /// Create a new ReportPipeline with an S3 storage built from the client
    /// configuration.
    pub async fn new(
        config: ReportConfig,
        client_config: ClientConfig,
        cancellation_token: RunCancellationToken,
    ) -> Self {
        let storage =
            storage::create_storage(Some(client_config), cancellation_token.clone()).await;

        Self::from_storage(config, storage, cancellation_token)
    }

    /// Create a pipeline on an existing storage instance.
    pub fn from_storage(
        config: ReportConfig,
        storage: Storage,
        cancellation_token: RunCancellationToken,
    ) -> Self {
        Self {
            config,
            storage,
            cancellation_token,
            has_error: Arc::new(AtomicBool::new(false)),
            has_panic: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            ready: true,
            aggregate: None,
        }
    }

    /// Run the report pipeline.
    ///
    /// 1. Validate the bucket (name, existence, object lock enabled)
    /// 2. Execute the stages (list → retention workers → aggregate)
    /// 3. Keep the aggregate, unless an error occurred or the run was
    ///    cancelled
    pub async fn run(&mut self) {
        assert!(self.ready, "ReportPipeline::run() called more than once");
        self.ready = false;

        if let Err(e) = validator::validate_lock_bucket(&self.storage, &self.config.bucket).await
        {
            self.record_error(e);
            return;
        }

        let aggregate = self.execute_pipeline().await;

        if self.has_error() {
            return;
        }
        if self.cancellation_token.is_cancelled() {
            info!("report pipeline has been cancelled.");
            return;
        }

        self.aggregate = Some(aggregate);
    }

    /// Check if any error occurred during the pipeline execution.
    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    /// Check if any spawned task panicked during the pipeline execution.
    pub fn has_panic(&self) -> bool {
        self.has_panic.load(Ordering::SeqCst)
    }

    /// Consume and return all accumulated errors.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_errors_and_consume(&self) -> Option<Vec<anyhow::Error>> {
        if !self.has_error() {
            return None;
        }
        let mut error_list = self.errors.lock().unwrap();
        let mut errors = Vec::with_capacity(error_list.len());
        while let Some(e) = error_list.pop_front() {
            errors.push(e);
        }
        Some(errors)
    }

    /// Get error messages without consuming them.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_error_messages(&self) -> Option<Vec<String>> {
        if !self.has_error() {
            return None;
        }
        let error_list = self.errors.lock().unwrap();
        Some(error_list.iter().map(|e| e.to_string()).collect())
    }

    /// Take the merged aggregate out of the pipeline.
    ///
    /// `None` if the run failed, was cancelled, or has not happened yet.
    pub fn take_aggregate(&mut self) -> Option<AggregateResult> {
        self.aggregate.take()
    }

    // -----------------------------------------------------------------------
    // Internal methods
    // -----------------------------------------------------------------------

    /// Execute the pipeline stages: list → workers → aggregate.
    async fn execute_pipeline(&self) -> AggregateResult {
        let (page_sender, page_receiver) =
            async_channel::bounded::<Page>(self.config.page_queue_size);
        let (result_sender, result_receiver) = async_channel::unbounded::<PageResult>();

        let mut handles = Vec::with_capacity(self.config.worker_size as usize + 1);
        handles.push(self.spawn_page_source(page_sender));

        for worker_index in 0..self.config.worker_size {
            handles.push(self.spawn_page_worker(
                worker_index,
                page_receiver.clone(),
                result_sender.clone(),
            ));
        }

        // The stages own the only remaining senders; once they finish, the
        // result channel closes and the aggregator drains what is left.
        drop(page_receiver);
        drop(result_sender);

        for handle in handles {
            if let Err(e) = handle.await {
                self.has_panic.store(true, Ordering::SeqCst);
                error!("pipeline task panicked: {}", e);
                self.record_error(anyhow::anyhow!("pipeline task panicked: {}", e));
            }
        }

        ReportAggregator::new(result_receiver).aggregate().await
    }

    /// Spawn the page source task with error handling.
    ///
    /// The double-spawn pattern catches panics in the stage task.
    fn spawn_page_source(&self, page_sender: Sender<Page>) -> JoinHandle<()> {
        let stage = Stage::new(
            self.config.clone(),
            dyn_clone::clone_box(&*self.storage),
            Some(page_sender),
            None,
            None,
            self.cancellation_token.clone(),
        );

        let max_keys = self.config.max_keys;
        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let source = PageSource::new(stage);
            let join_result = tokio::spawn(async move { source.list_pages(max_keys).await }).await;

            match join_result {
                Ok(Ok(())) => {
                    debug!("page source completed successfully.");
                }
                Ok(Err(e)) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    error!("page source failed: {}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!("page source task panicked: {}", e);
                    error_list
                        .lock()
                        .unwrap()
                        .push_back(anyhow::anyhow!("page source task panicked: {}", e));
                }
            }
        })
    }

    /// Spawn one page worker task with error handling.
    fn spawn_page_worker(
        &self,
        worker_index: u16,
        page_receiver: Receiver<Page>,
        result_sender: Sender<PageResult>,
    ) -> JoinHandle<()> {
        let stage = Stage::new(
            self.config.clone(),
            dyn_clone::clone_box(&*self.storage),
            None,
            Some(page_receiver),
            Some(result_sender),
            self.cancellation_token.clone(),
        );

        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let worker = PageWorker::new(stage, worker_index);
            let join_result = tokio::spawn(async move { worker.process().await }).await;

            match join_result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    error!(worker_index, "page worker failed: {}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!(worker_index, "page worker task panicked: {}", e);
                    error_list
                        .lock()
                        .unwrap()
                        .push_back(anyhow::anyhow!("page worker task panicked: {}", e));
                }
            }
        })
    }

    /// Record an error and set the error flag.
    fn record_error(&self, error: anyhow::Error) {
        self.has_error.store(true, Ordering::SeqCst);
        self.errors.lock().unwrap().push_back(error);
    }
}
