//! Bounded retry for oracle calls.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Run `op`, retrying up to `max_retries` extra times while the error
/// satisfies `is_retryable`. No backoff: the budget absorbs one-off
/// malformed replies, not outages.
pub async fn with_retry<T, E, F, Fut, P>(
    max_retries: usize,
    is_retryable: P,
    mut op: F,
) -> std::result::Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries && is_retryable(&e) => {
                attempt += 1;
                warn!(attempt, error = %e, "retrying recoverable oracle failure");
            }
            Err(e) => return Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
