use std::sync::Arc;

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;

use crate::config::ClientConfig;
use crate::types::token::RunCancellationToken;
use crate::types::{Page, RetentionStatus};

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Result of probing a bucket with HeadBucket.
///
/// NotFound and AccessDenied are expected probe outcomes, not errors; the
/// validator turns them into user-facing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketProbe {
    Exists,
    NotFound,
    AccessDenied,
}

/// Factory trait for creating Storage instances.
#[async_trait]
pub trait StorageFactory {
    async fn create(
        client_config: Option<ClientConfig>,
        cancellation_token: RunCancellationToken,
    ) -> Storage;
}

/// Core storage trait covering the object-lock operations.
///
/// The bucket is passed per call rather than held in the storage: the
/// buckets subcommand probes every bucket on the endpoint through one
/// storage instance.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// List the names of all buckets on the endpoint.
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Probe a bucket with HeadBucket.
    async fn head_bucket(&self, bucket: &str) -> Result<BucketProbe>;

    /// Check whether object lock is enabled on the bucket.
    ///
    /// An endpoint answering "no lock configuration" is reported as `false`,
    /// not as an error.
    async fn is_object_lock_enabled(&self, bucket: &str) -> Result<bool>;

    /// List all objects in the bucket and send each listing page to the
    /// provided channel.
    ///
    /// Pages are produced strictly in listing order by one sequential
    /// ListObjectsV2 loop; the continuation token never leaves this method.
    /// Listing failures are treated as unrecoverable errors.
    async fn list_object_pages(
        &self,
        bucket: &str,
        sender: &Sender<Page>,
        max_keys: i32,
    ) -> Result<()>;

    /// Get the retention status of a single object via GetObjectRetention.
    async fn get_object_retention(&self, bucket: &str, key: &str) -> Result<RetentionStatus>;

    /// Create a bucket, optionally with object lock enabled.
    async fn create_bucket(&self, bucket: &str, object_lock_enabled: bool) -> Result<()>;

    /// Upload an object body locked in GOVERNANCE mode until `retain_until`.
    async fn put_locked_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        retain_until: DateTime<Utc>,
    ) -> Result<()>;

    /// Get the underlying AWS S3 Client for direct API access.
    fn get_client(&self) -> Option<Arc<Client>>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create a single S3 storage instance.
pub async fn create_storage(
    client_config: Option<ClientConfig>,
    cancellation_token: RunCancellationToken,
) -> Storage {
    s3::S3StorageFactory::create(client_config, cancellation_token).await
}
