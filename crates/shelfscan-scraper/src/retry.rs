//! The single retry policy shared by every fetch.
//!
//! Transient failures (timeouts, connection errors, 5xx, 429) are retried with
//! exponential backoff and jitter. Definitive answers (404 and other 4xx,
//! blocked pages, parse failures) are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` if `err` represents a transient condition worth retrying.
///
/// Retriable:
/// - [`ScraperError::Http`] when it is a timeout, a connect failure, or a 5xx.
/// - [`ScraperError::UnexpectedStatus`] (5xx answered by the server).
/// - [`ScraperError::RateLimited`] (429).
///
/// Everything else, including [`ScraperError::ClientError`] and
/// [`ScraperError::Blocked`], is final.
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.is_request()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        ScraperError::RateLimited { .. } => true,
        _ => false,
    }
}

/// Executes `operation`, retrying transient errors up to `max_retries` extra times.
///
/// | Attempt | Sleep before next attempt (`backoff_base_ms = 1000`) |
/// |---------|------------------------------------------------------|
/// | 1       | 1000 ms × 2⁰ ± 25 % |
/// | 2       | 1000 ms × 2¹ ± 25 % |
///
/// A 429 waits at least its `Retry-After`. Delays are capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered = (computed as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let floor_ms = match &err {
                    ScraperError::RateLimited {
                        retry_after_secs, ..
                    } => retry_after_secs.saturating_mul(1000),
                    _ => 0,
                };
                let delay_ms = jittered.max(floor_ms).min(MAX_DELAY_MS);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient fetch error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
