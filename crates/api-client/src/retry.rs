use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ApiError;

/// Retry behaviour for idempotent (GET-style) requests.
pub struct RetryConfig {
    pub delays_secs: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays_secs: vec![1, 2, 4],
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self {
            delays_secs: Vec::new(),
        }
    }
}

/// Run `op` with bounded backoff, retrying only transient failures
/// (network errors and 5xx). Rejections, auth expiry and malformed
/// responses return immediately; repeating those cannot help.
///
/// Only use this for idempotent requests; a retried `iniciar` could open a
/// second record.
pub async fn with_backoff<T, F, Fut>(label: &str, config: &RetryConfig, op: F) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = config.delays_secs.len() + 1;

    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.delays_secs.len() => {
                let delay = config.delays_secs[attempt];
                warn!(
                    "{label}: attempt {}/{} failed ({e}), retrying in {delay}s",
                    attempt + 1,
                    max_attempts,
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!()
}
