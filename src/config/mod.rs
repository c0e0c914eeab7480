pub mod args;

use chrono::{DateTime, Utc};

use crate::types::AccessKeys;

/// Main configuration for s3lock-rs.
///
/// Holds the operation to perform plus the shared S3 client and tracing
/// settings. Build one via [`Config::try_from`] on parsed
/// [`CLIArgs`](crate::config::args::CLIArgs), or construct the pieces
/// directly for library usage.
#[derive(Debug, Clone)]
pub struct Config {
    pub operation: Operation,
    pub client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
}

/// The operation selected on the command line.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Concurrent retention report for one bucket.
    Report(ReportConfig),
    /// List all buckets, flagging object-lock status.
    Buckets,
    /// Create a new bucket.
    CreateBucket {
        bucket: String,
        object_lock_enabled: bool,
    },
    /// Bulk-create retention-locked objects.
    Put(PutConfig),
}

/// Settings for the retention report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub bucket: String,
    /// Render a machine-readable CSV instead of the human summary.
    pub csv: bool,
    /// Group by (remaining days, lock mode) instead of remaining days alone.
    pub group_by_mode: bool,
    /// Number of concurrent page workers.
    pub worker_size: u16,
    /// Keys per ListObjectsV2 request (page size).
    pub max_keys: i32,
    /// Capacity of the page channel between the lister and the workers.
    pub page_queue_size: usize,
    /// Floor negative remaining days at zero.
    ///
    /// The default is `true`: an expired lock reports zero remaining days.
    /// Disabling it reports the (negative) signed difference instead.
    pub clamp_negative_remaining: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            bucket: String::new(),
            csv: false,
            group_by_mode: false,
            worker_size: 10,
            max_keys: 1000,
            page_queue_size: 32,
            clamp_negative_remaining: true,
        }
    }
}

/// Settings for bulk locked-object creation.
#[derive(Debug, Clone)]
pub struct PutConfig {
    pub bucket: String,
    pub prefix: String,
    pub count: u64,
    pub start_index: u64,
    pub retain_until: DateTime<Utc>,
    /// Size of each generated object body in bytes.
    pub object_size_bytes: usize,
    pub worker_size: u16,
    pub show_no_progress: bool,
}

/// S3 client configuration.
///
/// Constructed once at startup; the resulting client is shared read-only by
/// every component that talks to the endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint host, IP, or full URL. A bare host gets an `http://` scheme
    /// (FlashBlade data VIPs commonly serve plain HTTP).
    pub endpoint_url: String,
    pub access_keys: AccessKeys,
    /// Accepted but not semantically required by FlashBlade.
    pub region: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub timeout_config: CLITimeoutConfig,
}

/// Retry configuration for AWS SDK operations.
///
/// This only tunes the SDK's own retry policy; s3lock-rs itself never
/// retries a failed call.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub disable_color_tracing: bool,
}
