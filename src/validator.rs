//! Bucket validation: syntactic naming rules plus endpoint probes.
//!
//! Validation is fail-fast and ordered so that no object listing starts
//! against an unusable bucket: name syntax first (no network), then bucket
//! existence, then object-lock status.

use std::sync::LazyLock;

use anyhow::Result;
use fancy_regex::Regex;

use crate::storage::{BucketProbe, Storage};
use crate::types::error::S3LockError;

// Lowercase alphanumerics, dots and hyphens, 3-63 chars, and not an
// IP-address-like name. Matches the S3 bucket naming rules FlashBlade
// enforces.
static BUCKET_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?![0-9]+\.)[a-z0-9.-]{3,63}$").unwrap());

/// Check a bucket name against the syntactic S3 naming rules.
///
/// Purely local; never touches the network.
pub fn is_valid_bucket_name(name: &str) -> bool {
    !name.contains("..") && BUCKET_NAME_REGEX.is_match(name).unwrap_or(false)
}

/// Validate that a bucket is usable for a retention report.
///
/// Checks, in order: name syntax, bucket existence (HeadBucket), and
/// object-lock status. The first failure aborts with the matching
/// [`S3LockError`]; nothing is listed until all three pass.
pub async fn validate_lock_bucket(storage: &Storage, bucket: &str) -> Result<()> {
    validate_bucket_name(bucket)?;

    match storage.head_bucket(bucket).await? {
        BucketProbe::Exists => {}
        BucketProbe::NotFound => {
            return Err(S3LockError::BucketNotFound(bucket.to_string()).into());
        }
        BucketProbe::AccessDenied => {
            return Err(S3LockError::AccessDenied(bucket.to_string()).into());
        }
    }

    if !storage.is_object_lock_enabled(bucket).await? {
        return Err(S3LockError::LockNotEnabled(bucket.to_string()).into());
    }

    tracing::debug!(bucket = bucket, "Bucket validated for retention report.");
    Ok(())
}

/// Validate that a bucket name is syntactically valid and not taken yet.
///
/// Used before CreateBucket.
pub async fn validate_new_bucket(storage: &Storage, bucket: &str) -> Result<()> {
    validate_bucket_name(bucket)?;

    match storage.head_bucket(bucket).await? {
        BucketProbe::NotFound => Ok(()),
        BucketProbe::Exists | BucketProbe::AccessDenied => {
            Err(S3LockError::BucketAlreadyExists(bucket.to_string()).into())
        }
    }
}

fn validate_bucket_name(bucket: &str) -> Result<()> {
    if !is_valid_bucket_name(bucket) {
        return Err(S3LockError::InvalidBucketName(bucket.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockStorage, init_dummy_tracing_subscriber};

    fn boxed(mock: &MockStorage) -> Storage {
        Box::new(mock.clone())
    }

    #[test]
    fn valid_bucket_names() {
        init_dummy_tracing_subscriber();

        assert!(is_valid_bucket_name("archive-2024"));
        assert!(is_valid_bucket_name("abc"));
        assert!(is_valid_bucket_name("my.bucket.name"));
        assert!(is_valid_bucket_name("a-b-c-123"));
        assert!(is_valid_bucket_name(&"a".repeat(63)));
    }

    #[test]
    fn invalid_bucket_names() {
        init_dummy_tracing_subscriber();

        // Uppercase
        assert!(!is_valid_bucket_name("AB"));
        assert!(!is_valid_bucket_name("Archive"));
        // Too short / too long
        assert!(!is_valid_bucket_name("ab"));
        assert!(!is_valid_bucket_name(&"a".repeat(64)));
        // Empty
        assert!(!is_valid_bucket_name(""));
        // Consecutive dots
        assert!(!is_valid_bucket_name("my..bucket"));
        // IP-address-like
        assert!(!is_valid_bucket_name("127.0.0.1"));
        // Illegal characters
        assert!(!is_valid_bucket_name("my_bucket"));
        assert!(!is_valid_bucket_name("bucket!"));
    }

    #[tokio::test]
    async fn validate_lock_bucket_success() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::with_lock_enabled_bucket("archive-2024");
        let storage = boxed(&mock);

        assert!(
            validate_lock_bucket(&storage, "archive-2024")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn validate_lock_bucket_invalid_name_fails_before_network() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        let storage = boxed(&mock);

        let result = validate_lock_bucket(&storage, "AB").await;
        let error = result.unwrap_err().downcast::<S3LockError>().unwrap();
        assert_eq!(error, S3LockError::InvalidBucketName("AB".to_string()));
    }

    #[tokio::test]
    async fn validate_lock_bucket_not_found() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        let storage = boxed(&mock);

        let result = validate_lock_bucket(&storage, "missing-bucket").await;
        let error = result.unwrap_err().downcast::<S3LockError>().unwrap();
        assert_eq!(
            error,
            S3LockError::BucketNotFound("missing-bucket".to_string())
        );
    }

    #[tokio::test]
    async fn validate_lock_bucket_access_denied() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        mock.buckets.lock().unwrap().push("secret-bucket".to_string());
        mock.access_denied_buckets
            .lock()
            .unwrap()
            .insert("secret-bucket".to_string());
        let storage = boxed(&mock);

        let result = validate_lock_bucket(&storage, "secret-bucket").await;
        let error = result.unwrap_err().downcast::<S3LockError>().unwrap();
        assert_eq!(
            error,
            S3LockError::AccessDenied("secret-bucket".to_string())
        );
    }

    #[tokio::test]
    async fn validate_lock_bucket_lock_not_enabled() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        mock.buckets.lock().unwrap().push("plain-bucket".to_string());
        let storage = boxed(&mock);

        let result = validate_lock_bucket(&storage, "plain-bucket").await;
        let error = result.unwrap_err().downcast::<S3LockError>().unwrap();
        assert_eq!(
            error,
            S3LockError::LockNotEnabled("plain-bucket".to_string())
        );
    }

    #[tokio::test]
    async fn validate_new_bucket_rejects_existing() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::with_lock_enabled_bucket("archive-2024");
        let storage = boxed(&mock);

        let result = validate_new_bucket(&storage, "archive-2024").await;
        let error = result.unwrap_err().downcast::<S3LockError>().unwrap();
        assert_eq!(
            error,
            S3LockError::BucketAlreadyExists("archive-2024".to_string())
        );
    }

    #[tokio::test]
    async fn validate_new_bucket_accepts_fresh_name() {
        init_dummy_tracing_subscriber();

        let mock = MockStorage::new();
        let storage = boxed(&mock);

        assert!(validate_new_bucket(&storage, "fresh-bucket").await.is_ok());
    }
}
