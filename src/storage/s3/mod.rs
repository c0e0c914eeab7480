pub mod client_builder;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectLockEnabled, ObjectLockMode, ObjectLockRetentionMode};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use aws_smithy_types_convert::date_time::DateTimeExt;
use chrono::{DateTime, Utc};

use crate::config::ClientConfig;
use crate::storage::{BucketProbe, Storage, StorageFactory, StorageTrait};
use crate::types::token::RunCancellationToken;
use crate::types::{LockMode, ObjectSummary, Page, RetentionStatus};

/// Error codes meaning "no object-lock configuration exists".
///
/// AWS S3 answers `ObjectLockConfigurationNotFoundError`; some S3-compatible
/// endpoints (FlashBlade among them) answer `NoSuchObjectLockConfiguration`.
/// Both mean the same thing and neither is treated as a failure.
const LOCK_NOT_CONFIGURED_ERROR_CODES: [&str; 2] = [
    "ObjectLockConfigurationNotFoundError",
    "NoSuchObjectLockConfiguration",
];

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors (S3 API responses), returns the S3 error code
/// (e.g. "AccessDenied", "InternalError") and the human-readable error
/// message from the response. For other error types (network, timeout,
/// construction failure), returns "N/A" as the code and the full error
/// description as the message.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

fn is_lock_not_configured_error<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> bool {
    e.as_service_error()
        .and_then(|service_err| service_err.code())
        .is_some_and(|code| LOCK_NOT_CONFIGURED_ERROR_CODES.contains(&code))
}

/// Factory for creating S3 storage instances.
pub struct S3StorageFactory;

#[async_trait]
impl StorageFactory for S3StorageFactory {
    async fn create(
        client_config: Option<ClientConfig>,
        cancellation_token: RunCancellationToken,
    ) -> Storage {
        let client = if let Some(ref client_config) = client_config {
            Some(Arc::new(client_config.create_client().await))
        } else {
            None
        };

        Box::new(S3Storage {
            cancellation_token,
            client,
        })
    }
}

/// S3 storage implementation for the object-lock operations.
#[derive(Clone)]
struct S3Storage {
    cancellation_token: RunCancellationToken,
    client: Option<Arc<Client>>,
}

#[async_trait]
impl StorageTrait for S3Storage {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut buckets = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .as_ref()
                .unwrap()
                .list_buckets()
                .set_continuation_token(continuation_token.clone())
                .send()
                .await
                .map_err(|e| {
                    let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                    tracing::error!(
                        s3_error_code = s3_error_code,
                        s3_error_message = s3_error_message,
                        "S3 ListBuckets API call failed: {} ({}).",
                        s3_error_code,
                        s3_error_message,
                    );
                    anyhow::anyhow!(e).context("aws_sdk_s3::client::list_buckets() failed.")
                })?;

            for bucket in output.buckets() {
                if let Some(name) = bucket.name() {
                    buckets.push(name.to_string());
                }
            }

            match output.continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(buckets)
    }

    async fn head_bucket(&self, bucket: &str) -> Result<BucketProbe> {
        let result = self
            .client
            .as_ref()
            .unwrap()
            .head_bucket()
            .bucket(bucket)
            .send()
            .await;

        match result {
            Ok(_) => Ok(BucketProbe::Exists),
            Err(e) => {
                if let SdkError::ServiceError(ref context) = e {
                    if context.err().is_not_found() {
                        return Ok(BucketProbe::NotFound);
                    }
                    if context.raw().status().as_u16() == 403 {
                        return Ok(BucketProbe::AccessDenied);
                    }
                }

                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 HeadBucket API call failed for bucket '{}': {} ({}).",
                    bucket,
                    s3_error_code,
                    s3_error_message,
                );
                Err(anyhow::anyhow!(e).context("aws_sdk_s3::client::head_bucket() failed."))
            }
        }
    }

    async fn is_object_lock_enabled(&self, bucket: &str) -> Result<bool> {
        let result = self
            .client
            .as_ref()
            .unwrap()
            .get_object_lock_configuration()
            .bucket(bucket)
            .send()
            .await;

        match result {
            Ok(output) => {
                let enabled = output
                    .object_lock_configuration()
                    .and_then(|configuration| configuration.object_lock_enabled())
                    == Some(&ObjectLockEnabled::Enabled);
                Ok(enabled)
            }
            Err(e) => {
                if is_lock_not_configured_error(&e) {
                    return Ok(false);
                }

                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 GetObjectLockConfiguration API call failed for bucket '{}': {} ({}).",
                    bucket,
                    s3_error_code,
                    s3_error_message,
                );
                Err(anyhow::anyhow!(e)
                    .context("aws_sdk_s3::client::get_object_lock_configuration() failed."))
            }
        }
    }

    async fn list_object_pages(
        &self,
        bucket: &str,
        sender: &Sender<Page>,
        max_keys: i32,
    ) -> Result<()> {
        let mut continuation_token: Option<String> = None;

        loop {
            if self.cancellation_token.is_cancelled() {
                tracing::info!("Listing cancelled");
                break;
            }

            let output = self
                .client
                .as_ref()
                .unwrap()
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.clone())
                .max_keys(max_keys)
                .send()
                .await
                .map_err(|e| {
                    let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                    tracing::error!(
                        bucket = bucket,
                        s3_error_code = s3_error_code,
                        s3_error_message = s3_error_message,
                        "S3 ListObjectsV2 API call failed for s3://{}: {} ({}).",
                        bucket,
                        s3_error_code,
                        s3_error_message,
                    );
                    anyhow::anyhow!(e).context("aws_sdk_s3::client::list_objects_v2() failed.")
                })?;

            let objects = output
                .contents()
                .iter()
                .filter_map(|object| {
                    object.key().map(|key| ObjectSummary {
                        key: key.to_string(),
                        size_bytes: object.size().unwrap_or(0).max(0) as u64,
                    })
                })
                .collect();

            // Empty pages are sent as well; the workers count them as zero.
            if let Err(e) = sender
                .send(Page { objects })
                .await
                .context("async_channel::Sender::send() failed.")
            {
                return if !sender.is_closed() { Err(e) } else { Ok(()) };
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        Ok(())
    }

    async fn get_object_retention(&self, bucket: &str, key: &str) -> Result<RetentionStatus> {
        let result = self
            .client
            .as_ref()
            .unwrap()
            .get_object_retention()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let Some(retention) = output.retention() else {
                    return Ok(RetentionStatus::NotConfigured);
                };
                let Some(retain_until_date) = retention.retain_until_date() else {
                    return Ok(RetentionStatus::NotConfigured);
                };

                let retain_until = retain_until_date
                    .to_chrono_utc()
                    .context("Failed to convert retain-until date.")?;
                let mode = match retention.mode() {
                    Some(ObjectLockRetentionMode::Governance) => LockMode::Governance,
                    Some(ObjectLockRetentionMode::Compliance) => LockMode::Compliance,
                    _ => LockMode::Unknown,
                };

                Ok(RetentionStatus::Locked { retain_until, mode })
            }
            Err(e) => {
                if is_lock_not_configured_error(&e) {
                    return Ok(RetentionStatus::NotConfigured);
                }

                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    key = key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 GetObjectRetention API call failed for s3://{}/{}: {} ({}).",
                    bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                Err(anyhow::anyhow!(e)
                    .context("aws_sdk_s3::client::get_object_retention() failed."))
            }
        }
    }

    async fn create_bucket(&self, bucket: &str, object_lock_enabled: bool) -> Result<()> {
        self.client
            .as_ref()
            .unwrap()
            .create_bucket()
            .bucket(bucket)
            .object_lock_enabled_for_bucket(object_lock_enabled)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 CreateBucket API call failed for bucket '{}': {} ({}).",
                    bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::create_bucket() failed.")
            })?;

        Ok(())
    }

    async fn put_locked_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        retain_until: DateTime<Utc>,
    ) -> Result<()> {
        self.client
            .as_ref()
            .unwrap()
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .object_lock_mode(ObjectLockMode::Governance)
            .object_lock_retain_until_date(aws_smithy_types::DateTime::from_chrono_utc(
                retain_until,
            ))
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    key = key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 PutObject API call failed for s3://{}/{}: {} ({}).",
                    bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::put_object() failed.")
            })?;

        Ok(())
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        self.client.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CLITimeoutConfig, RetryConfig};
    use crate::types::AccessKeys;

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }

    fn make_test_client_config() -> ClientConfig {
        ClientConfig {
            endpoint_url: "http://localhost:9000".to_string(),
            access_keys: AccessKeys {
                access_key: "test".to_string(),
                secret_access_key: "test".to_string(),
                session_token: None,
            },
            region: Some("us-east-1".to_string()),
            force_path_style: true,
            retry_config: RetryConfig {
                aws_max_attempts: 3,
                initial_backoff_milliseconds: 100,
            },
            timeout_config: CLITimeoutConfig::default(),
        }
    }

    #[tokio::test]
    async fn s3_storage_factory_creates_with_client() {
        init_dummy_tracing_subscriber();

        let cancellation_token = crate::types::token::create_run_cancellation_token();
        let storage =
            S3StorageFactory::create(Some(make_test_client_config()), cancellation_token).await;

        assert!(storage.get_client().is_some());
    }

    #[tokio::test]
    async fn s3_storage_factory_creates_without_client() {
        init_dummy_tracing_subscriber();

        let cancellation_token = crate::types::token::create_run_cancellation_token();
        let storage = S3StorageFactory::create(None, cancellation_token).await;

        assert!(storage.get_client().is_none());
    }

    #[test]
    fn lock_not_configured_error_codes_cover_both_spellings() {
        init_dummy_tracing_subscriber();

        assert!(LOCK_NOT_CONFIGURED_ERROR_CODES.contains(&"ObjectLockConfigurationNotFoundError"));
        assert!(LOCK_NOT_CONFIGURED_ERROR_CODES.contains(&"NoSuchObjectLockConfiguration"));
    }
}
