use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_smithy_types::retry::RetryConfig as SdkRetryConfig;
use aws_smithy_types::timeout::TimeoutConfig;

use crate::config::ClientConfig;

// FlashBlade ignores the region but the SDK requires one.
const FALLBACK_REGION: &str = "us-east-1";

const CREDENTIALS_PROVIDER_NAME: &str = "s3lock";

impl ClientConfig {
    /// Build an AWS S3 client from this configuration.
    ///
    /// Credentials come from the explicit access keys; the default AWS
    /// credential chain is never consulted. The endpoint URL, path-style
    /// addressing, retry, and timeout settings are all applied here.
    pub async fn create_client(&self) -> Client {
        let credentials = Credentials::new(
            self.access_keys.access_key.clone(),
            self.access_keys.secret_access_key.clone(),
            self.access_keys.session_token.clone(),
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let retry_config = SdkRetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ));

        let mut timeout_config_builder = TimeoutConfig::builder();
        if let Some(milliseconds) = self.timeout_config.operation_timeout_milliseconds {
            timeout_config_builder =
                timeout_config_builder.operation_timeout(Duration::from_millis(milliseconds));
        }
        if let Some(milliseconds) = self.timeout_config.operation_attempt_timeout_milliseconds {
            timeout_config_builder = timeout_config_builder
                .operation_attempt_timeout(Duration::from_millis(milliseconds));
        }
        if let Some(milliseconds) = self.timeout_config.connect_timeout_milliseconds {
            timeout_config_builder =
                timeout_config_builder.connect_timeout(Duration::from_millis(milliseconds));
        }
        if let Some(milliseconds) = self.timeout_config.read_timeout_milliseconds {
            timeout_config_builder =
                timeout_config_builder.read_timeout(Duration::from_millis(milliseconds));
        }

        let region = Region::new(
            self.region
                .clone()
                .unwrap_or_else(|| FALLBACK_REGION.to_string()),
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            .endpoint_url(&self.endpoint_url)
            .retry_config(retry_config)
            .timeout_config(timeout_config_builder.build())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(self.force_path_style)
            .build();

        Client::from_conf(s3_config)
    }
}
