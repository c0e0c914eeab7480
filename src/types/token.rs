/// A cancellation token used to signal run shutdown.
///
/// This is a type alias for [`tokio_util::sync::CancellationToken`]. Pass the
/// token to [`ReportPipeline::new`](crate::pipeline::ReportPipeline::new) and
/// call [`cancel()`](tokio_util::sync::CancellationToken::cancel) on it to
/// abort a running report (e.g., in a Ctrl+C handler).
pub type RunCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`RunCancellationToken`].
///
/// # Example
///
/// ```
/// use s3lock_rs::create_run_cancellation_token;
///
/// let token = create_run_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_run_cancellation_token() -> RunCancellationToken {
    tokio_util::sync::CancellationToken::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_cancellation_token() {
        create_run_cancellation_token();
    }
}
