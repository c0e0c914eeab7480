use std::ffi::OsString;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};

use crate::config::{
    CLITimeoutConfig, ClientConfig, Config, Operation, PutConfig, ReportConfig, RetryConfig,
    TracingConfig,
};
use crate::types::AccessKeys;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_WORKER_SIZE: u16 = 10;
const DEFAULT_MAX_KEYS: i32 = 1000;
const DEFAULT_PAGE_QUEUE_SIZE: usize = 32;
const DEFAULT_NO_CLAMP_NEGATIVE_DAYS: bool = false;
const DEFAULT_CSV: bool = false;
const DEFAULT_GROUP_BY_MODE: bool = false;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = true;
const DEFAULT_NO_OBJECT_LOCK: bool = false;
const DEFAULT_PUT_PREFIX: &str = "locked-object-";
const DEFAULT_PUT_START_INDEX: u64 = 0;
const DEFAULT_PUT_OBJECT_SIZE: &str = "1KiB";
const DEFAULT_SHOW_NO_PROGRESS: bool = false;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_MISSING_ENDPOINT: &str =
    "An endpoint is required. Set --endpoint-url or the AWS_ENDPOINT_URL environment variable.";
const ERROR_MESSAGE_MISSING_ACCESS_KEY: &str =
    "An access key is required. Set --access-key or the AWS_ACCESS_KEY_ID environment variable.";
const ERROR_MESSAGE_MISSING_SECRET_KEY: &str = "A secret access key is required. Set --secret-access-key or the AWS_SECRET_ACCESS_KEY environment variable.";
const ERROR_MESSAGE_WORKER_SIZE_ZERO: &str = "Worker size must be at least 1.";
const ERROR_MESSAGE_MAX_KEYS_RANGE: &str = "Max keys must be between 1 and 1000 (S3 API limit).";
const ERROR_MESSAGE_PAGE_QUEUE_SIZE_ZERO: &str = "Page queue size must be at least 1.";
const ERROR_MESSAGE_PUT_COUNT_ZERO: &str = "Object count must be at least 1.";
const ERROR_MESSAGE_MISSING_RETENTION: &str =
    "A retention period is required. Set --retention-days or --retain-until.";
const ERROR_MESSAGE_RETAIN_UNTIL_PAST: &str = "The retain-until date must be in the future.";

// ---------------------------------------------------------------------------
// Value parser helpers
// ---------------------------------------------------------------------------

fn parse_human_bytes(s: &str) -> Result<usize, String> {
    let byte = byte_unit::Byte::from_str(s.trim()).map_err(|e| e.to_string())?;
    usize::try_from(byte.as_u128()).map_err(|e| e.to_string())
}

/// Clap value_parser that validates a human-readable byte string without consuming it.
fn check_human_bytes(s: &str) -> Result<String, String> {
    byte_unit::Byte::from_str(s.trim()).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// s3lock - Object-lock retention reporting tool for S3-compatible storage.
///
/// Inspect and administer retention-locked objects on FlashBlade and other
/// S3-compatible endpoints.
///
/// Example:
///   s3lock report --bucket archive-2024
///   s3lock report --bucket archive-2024 --csv > report.csv
///   s3lock put --bucket archive-2024 --count 100 --retention-days 30
#[derive(Parser, Clone, Debug)]
#[command(name = "s3lock", version, about, long_about = None)]
pub struct CLIArgs {
    #[command(subcommand)]
    pub command: Command,

    // -----------------------------------------------------------------------
    // Endpoint / credential options (shared by every subcommand)
    // -----------------------------------------------------------------------
    /// Endpoint host, IP address, or URL (e.g. a FlashBlade data VIP).
    #[arg(long, env = "AWS_ENDPOINT_URL", global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub endpoint_url: Option<String>,

    /// AWS access key ID.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub access_key: Option<String>,

    /// AWS secret access key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub secret_access_key: Option<String>,

    /// AWS session token.
    #[arg(long, env = "AWS_SESSION_TOKEN", global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub session_token: Option<String>,

    /// AWS region. FlashBlade accepts any value here.
    #[arg(long, env = "AWS_REGION", global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub region: Option<String>,

    /// Use virtual-hosted-style addressing instead of path-style.
    #[arg(long, env, global = true, default_value_t = !DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub virtual_hosted_style: bool,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum retry attempts for AWS SDK operations. Default: 10.
    #[arg(long, env, global = true, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff in milliseconds for retries. Default: 100.
    #[arg(long, env, global = true, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, help_heading = "Retry")]
    pub initial_backoff_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Timeout options
    // -----------------------------------------------------------------------
    /// Overall operation timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub operation_timeout_milliseconds: Option<u64>,

    /// Per-attempt operation timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub operation_attempt_timeout_milliseconds: Option<u64>,

    /// Connection timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub connect_timeout_milliseconds: Option<u64>,

    /// Read timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub read_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    /// Verbosity level. -q (quiet), default (normal), -v, -vv, -vvv.
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Output logs in JSON format.
    #[arg(long, env, global = true, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Enable AWS SDK tracing.
    #[arg(long, env, global = true, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Logging")]
    pub aws_sdk_tracing: bool,

    /// Disable colored output in logs.
    #[arg(long, env, global = true, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Summarize object-lock retention for every object in a bucket.
    Report(ReportArgs),
    /// List all buckets and whether object lock is enabled on each.
    Buckets,
    /// Create a new bucket.
    CreateBucket(CreateBucketArgs),
    /// Bulk-create retention-locked objects with generated bodies.
    Put(PutArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct ReportArgs {
    /// Bucket to report on.
    #[arg(long, env = "S3LOCK_BUCKET", value_parser = NonEmptyStringValueParser::new())]
    pub bucket: String,

    /// Emit CSV on stdout instead of the human-readable summary.
    #[arg(long, env, default_value_t = DEFAULT_CSV)]
    pub csv: bool,

    /// Group rows by (remaining days, lock mode) instead of remaining days alone.
    #[arg(long, env, default_value_t = DEFAULT_GROUP_BY_MODE)]
    pub group_by_mode: bool,

    /// Number of concurrent page workers (1-65535). Default: 10.
    #[arg(long, env, default_value_t = DEFAULT_WORKER_SIZE, help_heading = "Performance")]
    pub worker_size: u16,

    /// Max keys per listing request (1-1000). Default: 1000.
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, help_heading = "Performance")]
    pub max_keys: i32,

    /// Capacity of the listing page queue. Default: 32.
    #[arg(long, env, default_value_t = DEFAULT_PAGE_QUEUE_SIZE, help_heading = "Performance")]
    pub page_queue_size: usize,

    /// Report expired locks as negative remaining days instead of zero.
    #[arg(long, env, default_value_t = DEFAULT_NO_CLAMP_NEGATIVE_DAYS)]
    pub no_clamp_negative_days: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct CreateBucketArgs {
    /// Name of the bucket to create.
    #[arg(long, env = "S3LOCK_BUCKET", value_parser = NonEmptyStringValueParser::new())]
    pub bucket: String,

    /// Create the bucket without object lock enabled.
    #[arg(long, env, default_value_t = DEFAULT_NO_OBJECT_LOCK)]
    pub no_object_lock: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct PutArgs {
    /// Bucket to create objects in. Must have object lock enabled.
    #[arg(long, env = "S3LOCK_BUCKET", value_parser = NonEmptyStringValueParser::new())]
    pub bucket: String,

    /// Key prefix for generated objects. Default: locked-object-.
    #[arg(long, env, default_value = DEFAULT_PUT_PREFIX)]
    pub prefix: String,

    /// Number of objects to create.
    #[arg(long, env)]
    pub count: u64,

    /// First numeric suffix for generated keys. Default: 0.
    #[arg(long, env, default_value_t = DEFAULT_PUT_START_INDEX)]
    pub start_index: u64,

    /// Days each object stays locked, from now. GOVERNANCE mode.
    #[arg(long, env, conflicts_with = "retain_until")]
    pub retention_days: Option<u32>,

    /// Lock objects until this instant (RFC 3339 datetime).
    #[arg(
        long,
        env,
        long_help = r#"Lock objects until the given time (RFC3339 datetime).
Example: 2027-02-19T12:00:00Z"#
    )]
    pub retain_until: Option<DateTime<Utc>>,

    /// Size of each generated object body. Default: 1KiB.
    #[arg(
        long,
        env,
        default_value = DEFAULT_PUT_OBJECT_SIZE,
        value_parser = check_human_bytes,
        long_help = r#"Size of each generated object body.
Allow suffixes: KB, KiB, MB, MiB"#
    )]
    pub object_size: String,

    /// Number of concurrent upload workers (1-65535). Default: 10.
    #[arg(long, env, default_value_t = DEFAULT_WORKER_SIZE, help_heading = "Performance")]
    pub worker_size: u16,

    /// Don't show the progress bar.
    #[arg(long, env, default_value_t = DEFAULT_SHOW_NO_PROGRESS)]
    pub show_no_progress: bool,
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use s3lock_rs::config::args::parse_from_args;
///
/// let args = vec![
///     "s3lock",
///     "report",
///     "--bucket",
///     "archive-2024",
///     "--endpoint-url",
///     "192.168.10.20",
///     "--access-key",
///     "PSFB_KEY",
///     "--secret-access-key",
///     "secret",
/// ];
/// let cli_args = parse_from_args(args).unwrap();
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
///
/// Convenience function that combines `parse_from_args` and `Config::try_from`.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Report(report_args) => {
                if report_args.worker_size == 0 {
                    return Err(ERROR_MESSAGE_WORKER_SIZE_ZERO.to_string());
                }
                if !(1..=1000).contains(&report_args.max_keys) {
                    return Err(ERROR_MESSAGE_MAX_KEYS_RANGE.to_string());
                }
                if report_args.page_queue_size == 0 {
                    return Err(ERROR_MESSAGE_PAGE_QUEUE_SIZE_ZERO.to_string());
                }
            }
            Command::Put(put_args) => {
                if put_args.worker_size == 0 {
                    return Err(ERROR_MESSAGE_WORKER_SIZE_ZERO.to_string());
                }
                if put_args.count == 0 {
                    return Err(ERROR_MESSAGE_PUT_COUNT_ZERO.to_string());
                }
                if put_args.retention_days.is_none() && put_args.retain_until.is_none() {
                    return Err(ERROR_MESSAGE_MISSING_RETENTION.to_string());
                }
            }
            Command::Buckets | Command::CreateBucket(_) => {}
        }
        Ok(())
    }

    fn build_client_config(&self) -> Result<ClientConfig, String> {
        let endpoint_url = self
            .endpoint_url
            .as_deref()
            .ok_or_else(|| ERROR_MESSAGE_MISSING_ENDPOINT.to_string())?;
        let access_key = self
            .access_key
            .clone()
            .ok_or_else(|| ERROR_MESSAGE_MISSING_ACCESS_KEY.to_string())?;
        let secret_access_key = self
            .secret_access_key
            .clone()
            .ok_or_else(|| ERROR_MESSAGE_MISSING_SECRET_KEY.to_string())?;

        Ok(ClientConfig {
            endpoint_url: normalize_endpoint_url(endpoint_url),
            access_keys: AccessKeys {
                access_key,
                secret_access_key,
                session_token: self.session_token.clone(),
            },
            region: self.region.clone(),
            force_path_style: !self.virtual_hosted_style,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
        })
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }

    fn build_operation(&self) -> Result<Operation, String> {
        let operation = match &self.command {
            Command::Report(report_args) => Operation::Report(ReportConfig {
                bucket: report_args.bucket.clone(),
                csv: report_args.csv,
                group_by_mode: report_args.group_by_mode,
                worker_size: report_args.worker_size,
                max_keys: report_args.max_keys,
                page_queue_size: report_args.page_queue_size,
                clamp_negative_remaining: !report_args.no_clamp_negative_days,
            }),
            Command::Buckets => Operation::Buckets,
            Command::CreateBucket(create_args) => Operation::CreateBucket {
                bucket: create_args.bucket.clone(),
                object_lock_enabled: !create_args.no_object_lock,
            },
            Command::Put(put_args) => {
                let retain_until = match (put_args.retain_until, put_args.retention_days) {
                    (Some(retain_until), _) => {
                        if retain_until <= Utc::now() {
                            return Err(ERROR_MESSAGE_RETAIN_UNTIL_PAST.to_string());
                        }
                        retain_until
                    }
                    (None, Some(days)) => Utc::now() + Duration::days(i64::from(days)),
                    (None, None) => return Err(ERROR_MESSAGE_MISSING_RETENTION.to_string()),
                };

                Operation::Put(PutConfig {
                    bucket: put_args.bucket.clone(),
                    prefix: put_args.prefix.clone(),
                    count: put_args.count,
                    start_index: put_args.start_index,
                    retain_until,
                    object_size_bytes: parse_human_bytes(&put_args.object_size)?,
                    worker_size: put_args.worker_size,
                    show_no_progress: put_args.show_no_progress,
                })
            }
        };

        Ok(operation)
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        let operation = args.build_operation()?;
        let client_config = args.build_client_config()?;
        let tracing_config = args.build_tracing_config();

        Ok(Config {
            operation,
            client_config: Some(client_config),
            tracing_config,
        })
    }
}

/// Prepend an `http://` scheme when the endpoint is a bare host or IP.
fn normalize_endpoint_url(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}
