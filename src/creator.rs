//! Bulk creation of retention-locked objects.
//!
//! Feeds object indices through an MPMC channel to a pool of put workers.
//! Every object gets a random alphanumeric body and a GOVERNANCE lock until
//! the configured retain-until date.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_channel::Receiver;
use indicatif::ProgressBar;
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::config::{ClientConfig, PutConfig};
use crate::storage::{self, Storage};
use crate::types::token::RunCancellationToken;
use crate::validator;

/// Generate a random alphanumeric object body.
fn random_body(len: usize) -> Vec<u8> {
    rand::rng().sample_iter(&Alphanumeric).take(len).collect()
}

/// Bulk locked-object creator.
///
/// Validates the target bucket, then uploads `count` objects named
/// `{prefix}{index}` starting at `start_index`. Uploads run on a worker
/// pool; the first failure cancels the whole run.
pub struct ObjectCreator {
    config: PutConfig,
    storage: Storage,
    cancellation_token: RunCancellationToken,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<anyhow::Error>>>,
    created_count: Arc<AtomicU64>,
    ready: bool,
}

impl ObjectCreator {
    /// Create a new ObjectCreator with an S3 storage built from the client
    /// configuration.
    pub async fn new(
        config: PutConfig,
        client_config: ClientConfig,
        cancellation_token: RunCancellationToken,
    ) -> Self {
        let storage =
            storage::create_storage(Some(client_config), cancellation_token.clone()).await;

        Self::from_storage(config, storage, cancellation_token)
    }

    /// Create a creator on an existing storage instance.
    pub fn from_storage(
        config: PutConfig,
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
            created_count: Arc::new(AtomicU64::new(0)),
            ready: false,
        }
    }

    /// Run the bulk creation.
    ///
    /// The bucket must exist and have object lock enabled; otherwise no
    /// upload starts.
    pub async fn run(&mut self) {
        assert!(!self.ready, "ObjectCreator::run() called more than once");
        self.ready = true;

        if let Err(e) = validator::validate_lock_bucket(&self.storage, &self.config.bucket).await {
            self.record_error(e);
            return;
        }

        let progress = if self.config.show_no_progress {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(self.config.count)
        };

        let (index_sender, index_receiver) =
            async_channel::bounded::<u64>(self.config.worker_size as usize * 2);

        let mut handles = Vec::with_capacity(self.config.worker_size as usize);
        for worker_index in 0..self.config.worker_size {
            handles.push(self.spawn_put_worker(
                worker_index,
                index_receiver.clone(),
                progress.clone(),
            ));
        }
        drop(index_receiver);

        for index in self.config.start_index..self.config.start_index + self.config.count {
            if index_sender.send(index).await.is_err() {
                // All workers are gone; the error is already recorded.
                break;
            }
        }
        drop(index_sender);

        for handle in handles {
            if let Err(e) = handle.await {
                self.has_panic.store(true, Ordering::SeqCst);
                error!("put task panicked: {}", e);
                self.record_error(anyhow::anyhow!("put task panicked: {}", e));
            }
        }

        progress.finish_and_clear();

        if self.cancellation_token.is_cancelled() {
            info!("bulk creation has been cancelled.");
        } else if !self.has_error() {
            info!(
                created = self.created_count(),
                bucket = self.config.bucket,
                "bulk creation completed."
            );
        }
    }

    /// Check if any error occurred during the run.
    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    /// Check if any spawned task panicked during the run.
    pub fn has_panic(&self) -> bool {
        self.has_panic.load(Ordering::SeqCst)
    }

    /// Number of objects successfully created so far.
    pub fn created_count(&self) -> u64 {
        self.created_count.load(Ordering::SeqCst)
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

    /// Spawn one put worker task with error handling.
    ///
    /// The double-spawn pattern catches panics in the worker task.
    fn spawn_put_worker(
        &self,
        worker_index: u16,
        index_receiver: Receiver<u64>,
        progress: ProgressBar,
    ) -> JoinHandle<()> {
        let worker = PutWorker {
            worker_index,
            config: self.config.clone(),
            storage: dyn_clone::clone_box(&*self.storage),
            index_receiver,
            cancellation_token: self.cancellation_token.clone(),
            created_count: self.created_count.clone(),
            progress,
        };

        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let join_result = tokio::spawn(async move { worker.process().await }).await;

            match join_result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    error!(worker_index, "put worker failed: {}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!(worker_index, "put worker task panicked: {}", e);
                    error_list
                        .lock()
                        .unwrap()
                        .push_back(anyhow::anyhow!("put worker task panicked: {}", e));
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

/// One worker of the put pool.
struct PutWorker {
    worker_index: u16,
    config: PutConfig,
    storage: Storage,
    index_receiver: Receiver<u64>,
    cancellation_token: RunCancellationToken,
    created_count: Arc<AtomicU64>,
    progress: ProgressBar,
}

impl PutWorker {
    /// Read indices from the channel until it closes, uploading one locked
    /// object per index.
    async fn process(&self) -> Result<()> {
        debug!(worker_index = self.worker_index, "put worker started.");

        loop {
            tokio::select! {
                // Once locked, an object cannot be removed until its
                // retention expires, so cancellation wins over queued work.
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!(worker_index = self.worker_index, "put worker has been cancelled.");
                    return Ok(());
                },
                recv_result = self.index_receiver.recv() => {
                    match recv_result {
                        Ok(index) => {
                            self.put_one(index).await?;
                        }
                        Err(_) => {
                            debug!(worker_index = self.worker_index, "put worker has been completed.");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn put_one(&self, index: u64) -> Result<()> {
        let key = format!("{}{}", self.config.prefix, index);
        let body = random_body(self.config.object_size_bytes);

        self.storage
            .put_locked_object(&self.config.bucket, &key, body, self.config.retain_until)
            .await?;

        self.created_count.fetch_add(1, Ordering::SeqCst);
        self.progress.inc(1);
        trace!(key = key, "locked object created.");
        Ok(())
    }
}
