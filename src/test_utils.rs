//! Shared test utilities for the s3lock library crate.
//!
//! This module provides canonical helper functions and a mock storage
//! implementation used across multiple test modules.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};

use crate::config::ReportConfig;
use crate::storage::{BucketProbe, StorageTrait};
use crate::types::{LockMode, ObjectSummary, Page, RetentionStatus};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// Create a default [`ReportConfig`] suitable for most unit tests.
pub(crate) fn make_test_report_config(bucket: &str) -> ReportConfig {
    ReportConfig {
        bucket: bucket.to_string(),
        ..ReportConfig::default()
    }
}

/// Build a listing page from `(key, size)` pairs.
pub(crate) fn make_page(objects: &[(&str, u64)]) -> Page {
    Page {
        objects: objects
            .iter()
            .map(|(key, size_bytes)| ObjectSummary {
                key: key.to_string(),
                size_bytes: *size_bytes,
            })
            .collect(),
    }
}

/// A retention status locked until the given instant in GOVERNANCE mode.
pub(crate) fn governance_until(retain_until: DateTime<Utc>) -> RetentionStatus {
    RetentionStatus::Locked {
        retain_until,
        mode: LockMode::Governance,
    }
}

/// Record of a put_locked_object call made to the mock.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub(crate) struct PutLockedObjectCall {
    pub bucket: String,
    pub key: String,
    pub body_len: usize,
    pub retain_until: DateTime<Utc>,
}

/// A mock Storage implementation for testing.
///
/// Every knob is behind an `Arc<Mutex<_>>` so a test can keep its own clone
/// and inspect calls after handing a boxed clone to the code under test.
#[derive(Clone)]
pub(crate) struct MockStorage {
    /// Buckets that exist on the fake endpoint.
    pub buckets: Arc<Mutex<Vec<String>>>,
    /// Subset of buckets with object lock enabled.
    pub lock_enabled_buckets: Arc<Mutex<HashSet<String>>>,
    /// Buckets that answer HeadBucket with 403.
    pub access_denied_buckets: Arc<Mutex<HashSet<String>>>,
    /// Pages emitted by list_object_pages, in order.
    pub pages: Arc<Mutex<Vec<Page>>>,
    /// Per-key retention statuses. Missing keys report NotConfigured.
    pub retention: Arc<Mutex<HashMap<String, RetentionStatus>>>,
    /// Keys whose retention lookup fails.
    pub retention_error_keys: Arc<Mutex<HashSet<String>>>,
    /// When set, list_object_pages fails immediately.
    pub fail_listing: Arc<AtomicBool>,
    pub retention_call_count: Arc<AtomicU64>,
    pub put_calls: Arc<Mutex<Vec<PutLockedObjectCall>>>,
    pub created_buckets: Arc<Mutex<Vec<(String, bool)>>>,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self {
            buckets: Arc::new(Mutex::new(Vec::new())),
            lock_enabled_buckets: Arc::new(Mutex::new(HashSet::new())),
            access_denied_buckets: Arc::new(Mutex::new(HashSet::new())),
            pages: Arc::new(Mutex::new(Vec::new())),
            retention: Arc::new(Mutex::new(HashMap::new())),
            retention_error_keys: Arc::new(Mutex::new(HashSet::new())),
            fail_listing: Arc::new(AtomicBool::new(false)),
            retention_call_count: Arc::new(AtomicU64::new(0)),
            put_calls: Arc::new(Mutex::new(Vec::new())),
            created_buckets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A mock with one lock-enabled bucket, ready for report tests.
    pub(crate) fn with_lock_enabled_bucket(bucket: &str) -> Self {
        let mock = Self::new();
        mock.buckets.lock().unwrap().push(bucket.to_string());
        mock.lock_enabled_buckets
            .lock()
            .unwrap()
            .insert(bucket.to_string());
        mock
    }

    pub(crate) fn add_page(&self, page: Page) {
        self.pages.lock().unwrap().push(page);
    }

    pub(crate) fn set_retention(&self, key: &str, status: RetentionStatus) {
        self.retention
            .lock()
            .unwrap()
            .insert(key.to_string(), status);
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        Ok(self.buckets.lock().unwrap().clone())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<BucketProbe> {
        if self.access_denied_buckets.lock().unwrap().contains(bucket) {
            return Ok(BucketProbe::AccessDenied);
        }
        if self.buckets.lock().unwrap().iter().any(|b| b == bucket) {
            Ok(BucketProbe::Exists)
        } else {
            Ok(BucketProbe::NotFound)
        }
    }

    async fn is_object_lock_enabled(&self, bucket: &str) -> Result<bool> {
        Ok(self.lock_enabled_buckets.lock().unwrap().contains(bucket))
    }

    async fn list_object_pages(
        &self,
        _bucket: &str,
        sender: &Sender<Page>,
        _max_keys: i32,
    ) -> Result<()> {
        if self.fail_listing.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("mock listing failure");
        }

        let pages = self.pages.lock().unwrap().clone();
        for page in pages {
            if sender.send(page).await.is_err() {
                return Ok(());
            }
        }
        Ok(())
    }

    async fn get_object_retention(&self, _bucket: &str, key: &str) -> Result<RetentionStatus> {
        self.retention_call_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if self.retention_error_keys.lock().unwrap().contains(key) {
            anyhow::bail!("mock retention failure for key '{key}'");
        }

        Ok(self
            .retention
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or(RetentionStatus::NotConfigured))
    }

    async fn create_bucket(&self, bucket: &str, object_lock_enabled: bool) -> Result<()> {
        self.created_buckets
            .lock()
            .unwrap()
            .push((bucket.to_string(), object_lock_enabled));
        Ok(())
    }

    async fn put_locked_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        retain_until: DateTime<Utc>,
    ) -> Result<()> {
        self.put_calls.lock().unwrap().push(PutLockedObjectCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body_len: body.len(),
            retain_until,
        });
        Ok(())
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        None
    }
}
