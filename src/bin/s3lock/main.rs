use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, trace};

use s3lock_rs::config::{Config, Operation};
use s3lock_rs::report::{render_csv, render_human};
use s3lock_rs::types::error::S3LockError;
use s3lock_rs::{
    CLIArgs, ObjectCreator, ReportPipeline, admin, create_run_cancellation_token,
    exit_code_from_error, is_cancelled_error, storage,
};

mod ctrl_c_handler;
mod tracing_init;

/// s3lock - Object-lock retention reporting tool for S3-compatible storage.
///
/// This binary is a thin wrapper over the s3lock-rs library.
/// All core functionality is implemented in the library crate.
#[tokio::main]
async fn main() {
    let config = load_config_exit_if_err();

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    if let Err(e) = run(config).await {
        if is_cancelled_error(&e) {
            debug!("run cancelled by user.");
            return;
        }
        error!("{:#}", e);
        std::process::exit(exit_code_from_error(&e));
    }
}

fn load_config_exit_if_err() -> Config {
    let config = Config::try_from(CLIArgs::parse());
    if let Err(error_message) = config {
        clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit();
    }
    config.unwrap()
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    if config.tracing_config.is_none() {
        return false;
    }

    tracing_init::init_tracing(config.tracing_config.as_ref().unwrap());
    true
}

async fn run(config: Config) -> Result<()> {
    let client_config = config
        .client_config
        .ok_or_else(|| S3LockError::InvalidConfig("missing client configuration".to_string()))?;

    let cancellation_token = create_run_cancellation_token();
    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = tokio::time::Instant::now();

    match config.operation {
        Operation::Report(report_config) => {
            let csv = report_config.csv;
            let group_by_mode = report_config.group_by_mode;
            let bucket = report_config.bucket.clone();

            debug!(bucket = bucket, "report pipeline start.");
            let mut pipeline =
                ReportPipeline::new(report_config, client_config, cancellation_token.clone())
                    .await;
            pipeline.run().await;

            if pipeline.has_error() {
                let mut errors = pipeline.get_errors_and_consume().unwrap();
                for err in errors.iter().skip(1) {
                    error!("{}", err);
                }
                return Err(errors.remove(0));
            }

            match pipeline.take_aggregate() {
                Some(aggregate) => {
                    let generated_at =
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
                    let output = if csv {
                        render_csv(&aggregate, group_by_mode, &generated_at)
                    } else {
                        render_human(&aggregate, group_by_mode, &bucket, &generated_at)
                    };
                    print!("{output}");
                }
                None => return Err(S3LockError::Cancelled.into()),
            }
        }
        Operation::Buckets => {
            let storage =
                storage::create_storage(Some(client_config), cancellation_token.clone()).await;
            let buckets = admin::list_buckets(&storage).await?;
            print!("{}", admin::render_bucket_list(&buckets));
        }
        Operation::CreateBucket {
            bucket,
            object_lock_enabled,
        } => {
            let storage =
                storage::create_storage(Some(client_config), cancellation_token.clone()).await;
            admin::create_bucket(&storage, &bucket, object_lock_enabled).await?;

            let lock_note = if object_lock_enabled {
                " with object lock enabled"
            } else {
                ""
            };
            println!("Bucket '{bucket}' created{lock_note}.");
        }
        Operation::Put(put_config) => {
            let bucket = put_config.bucket.clone();

            debug!(bucket = bucket, "bulk creation start.");
            let mut creator =
                ObjectCreator::new(put_config, client_config, cancellation_token.clone()).await;
            creator.run().await;

            if creator.has_error() {
                let mut errors = creator.get_errors_and_consume().unwrap();
                for err in errors.iter().skip(1) {
                    error!("{}", err);
                }
                return Err(errors.remove(0));
            }
            if cancellation_token.is_cancelled() {
                return Err(S3LockError::Cancelled.into());
            }

            println!(
                "Created {} locked objects in '{}'.",
                creator.created_count(),
                bucket
            );
        }
    }

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    debug!(duration_sec = duration_sec, "s3lock has been completed.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusty_fork::rusty_fork_test;
    use s3lock_rs::config::args::parse_from_args;

    fn base_args(extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "s3lock".to_string(),
            "report".to_string(),
            "--bucket".to_string(),
            "archive-2024".to_string(),
            "--endpoint-url".to_string(),
            "192.168.10.20".to_string(),
            "--access-key".to_string(),
            "PSFB_KEY".to_string(),
            "--secret-access-key".to_string(),
            "secret".to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        args
    }

    rusty_fork_test! {
        #[test]
        fn with_tracing() {
            let config = Config::try_from(parse_from_args(base_args(&["-v"])).unwrap()).unwrap();
            assert!(start_tracing_if_necessary(&config));
        }

        #[test]
        fn without_tracing() {
            let config = Config::try_from(parse_from_args(base_args(&["-qq"])).unwrap()).unwrap();
            assert!(!start_tracing_if_necessary(&config));
        }
    }
}
