//! Shared helpers for talking to the Telegram API.

use std::time::Duration;

use teloxide::RequestError;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};

/// Whether a Telegram API failure is worth retrying.
///
/// Flood-wait and transport failures usually clear on their own; API
/// rejections (bad request, forbidden, not found) never do.
#[must_use]
pub fn is_transient_error(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    )
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Only transient failures are retried; API rejections surface to the
/// caller on the first attempt.
///
/// The retry strategy uses exponential backoff with jitter to avoid
/// thundering herd:
/// - Initial delay: 250ms
/// - Max delay: 2s
/// - Max attempts: 3 (configurable via constants in `config.rs`)
///
/// # Errors
///
/// Returns the first permanent error, or the last transient error once
/// all attempts are exhausted.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, RequestError>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter) // Add jitter to prevent thundering herd
        .take(TELEGRAM_API_MAX_RETRIES);

    RetryIf::spawn(retry_strategy, operation, is_transient_error).await
}
