//! Bucket administration: listing and creation.

use anyhow::Result;
use tracing::{debug, info};

use crate::storage::Storage;
use crate::validator;

/// One bucket on the endpoint, with its object-lock status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    pub object_lock_enabled: bool,
}

/// List every bucket on the endpoint with its object-lock status.
///
/// The lock status needs one GetObjectLockConfiguration call per bucket;
/// endpoints answering "no lock configuration" report `false`.
pub async fn list_buckets(storage: &Storage) -> Result<Vec<BucketInfo>> {
    let names = storage.list_buckets().await?;
    debug!(bucket_count = names.len(), "bucket listing completed.");

    let mut buckets = Vec::with_capacity(names.len());
    for name in names {
        let object_lock_enabled = storage.is_object_lock_enabled(&name).await?;
        buckets.push(BucketInfo {
            name,
            object_lock_enabled,
        });
    }

    Ok(buckets)
}

/// Render the bucket list for terminal output.
pub fn render_bucket_list(buckets: &[BucketInfo]) -> String {
    use std::fmt::Write;

    if buckets.is_empty() {
        return "No buckets found.\n".to_string();
    }

    let mut output = String::new();
    for bucket in buckets {
        let lock = if bucket.object_lock_enabled {
            "object-lock"
        } else {
            "-"
        };
        writeln!(output, "{:<48} {}", bucket.name, lock).unwrap();
    }
    output
}

/// Create a new bucket, by default with object lock enabled.
///
/// The name must be syntactically valid and not taken yet; the existence
/// probe runs before CreateBucket so a clash fails with a clear error
/// instead of an endpoint-specific one.
pub async fn create_bucket(
    storage: &Storage,
    bucket: &str,
    object_lock_enabled: bool,
) -> Result<()> {
    validator::validate_new_bucket(storage, bucket).await?;

    storage.create_bucket(bucket, object_lock_enabled).await?;
    info!(
        bucket = bucket,
        object_lock_enabled, "bucket has been created."
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockStorage, init_dummy_tracing_subscriber};
    use crate::types::error::S3LockError;

    fn boxed(mock: &MockStorage) -> Storage {
        Box::new(mock.clone())
    }

    #[tokio::test]
    async fn list_buckets_reports_lock_status() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::with_lock_enabled_bucket("locked-bucket");
        mock.buckets.lock().unwrap().push("plain-bucket".to_string());
        let storage = boxed(&mock);

        let buckets = list_buckets(&storage).await.unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets[0],
            BucketInfo {
                name: "locked-bucket".to_string(),
                object_lock_enabled: true,
            }
        );
        assert_eq!(
            buckets[1],
            BucketInfo {
                name: "plain-bucket".to_string(),
                object_lock_enabled: false,
            }
        );
    }

    #[tokio::test]
    async fn list_buckets_empty_endpoint() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        let storage = boxed(&mock);

        let buckets = list_buckets(&storage).await.unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn render_bucket_list_flags_lock() {
        init_dummy_tracing_subscriber();

        let buckets = vec![
            BucketInfo {
                name: "locked-bucket".to_string(),
                object_lock_enabled: true,
            },
            BucketInfo {
                name: "plain-bucket".to_string(),
                object_lock_enabled: false,
            },
        ];
        let rendered = render_bucket_list(&buckets);

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("locked-bucket"));
        assert!(lines[0].ends_with("object-lock"));
        assert!(lines[1].starts_with("plain-bucket"));
        assert!(lines[1].ends_with("-"));
    }

    #[test]
    fn render_bucket_list_empty() {
        init_dummy_tracing_subscriber();

        assert_eq!(render_bucket_list(&[]), "No buckets found.\n");
    }

    #[tokio::test]
    async fn create_bucket_with_object_lock() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        let storage = boxed(&mock);

        create_bucket(&storage, "fresh-bucket", true).await.unwrap();

        assert_eq!(
            *mock.created_buckets.lock().unwrap(),
            vec![("fresh-bucket".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn create_bucket_without_object_lock() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        let storage = boxed(&mock);

        create_bucket(&storage, "fresh-bucket", false)
            .await
            .unwrap();

        assert_eq!(
            *mock.created_buckets.lock().unwrap(),
            vec![("fresh-bucket".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn create_bucket_rejects_existing_name() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::with_lock_enabled_bucket("taken-bucket");
        let storage = boxed(&mock);

        let result = create_bucket(&storage, "taken-bucket", true).await;
        let error = result.unwrap_err().downcast::<S3LockError>().unwrap();
        assert_eq!(
            error,
            S3LockError::BucketAlreadyExists("taken-bucket".to_string())
        );
        assert!(mock.created_buckets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_bucket_rejects_invalid_name() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        let storage = boxed(&mock);

        let result = create_bucket(&storage, "Invalid_Name", true).await;
        let error = result.unwrap_err().downcast::<S3LockError>().unwrap();
        assert_eq!(
            error,
            S3LockError::InvalidBucketName("Invalid_Name".to_string())
        );
    }
}
