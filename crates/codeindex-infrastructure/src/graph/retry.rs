//! Retry with exponential backoff and jitter.
//!
//! Retries only connection-classified failures (or calls explicitly marked as
//! connectivity probes); every other error propagates on the first attempt.
//! Delay grows as `min(initial * 2^attempt + jitter, max)` where jitter is drawn
//! uniformly from `[0, JITTER_FRACTION * initial * 2^attempt]`.

use std::future::Future;
use std::time::Duration;

use codeindex_domain::constants::{
    DEFAULT_INITIAL_RETRY_DELAY_MS, DEFAULT_MAX_RETRIES, DEFAULT_MAX_RETRY_DELAY_MS,
    JITTER_FRACTION,
};
use codeindex_domain::error::{Error, Result};
use rand::Rng;

use super::circuit_breaker::CircuitBreaker;
use super::classify::{is_connection_error, ClassifiableError};

/// Tunables for a single retrying call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_RETRY_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
        }
    }
}

/// Running counters a caller can use to expose metrics, updated in place by
/// [`execute_with_retry`].
#[derive(Debug, Default)]
pub struct RetryMetrics {
    pub total_errors: u64,
    pub connection_errors: u64,
    pub deadlock_count: u64,
    pub retries_attempted: u64,
}

fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = (policy.initial_delay_ms as f64) * 2f64.powi(attempt as i32);
    let jitter_span = base * JITTER_FRACTION;
    let jitter = rand::thread_rng().gen_range(0.0..=jitter_span.max(0.0));
    let delay_ms = (base + jitter).min(policy.max_delay_ms as f64);
    Duration::from_millis(delay_ms.max(0.0) as u64)
}

/// Classify any [`Error`] for retry purposes. Most domain error variants that
/// wrap connectivity failures (`Connection`, `DatabaseUnavailable`, `Timeout`)
/// are treated as connection-related outright; everything else is passed
/// through the structured classifier using the error's rendered message as a
/// last resort.
fn classify(error: &Error) -> (bool, bool) {
    match error {
        Error::Connection { .. } | Error::DatabaseUnavailable { .. } | Error::Timeout { .. } => {
            (true, false)
        }
        other => {
            let message = other.to_string();
            let classifiable = ClassifiableError {
                code: None,
                name: None,
                message: &message,
            };
            (
                is_connection_error(&classifiable),
                super::classify::is_deadlock_error(&classifiable),
            )
        }
    }
}

/// Execute `operation`, retrying connection-classified failures up to
/// `policy.max_retries` times with exponential backoff and jitter. On success
/// the circuit breaker's failure count is reset; on exhaustion the breaker
/// records one failure per attempt along the way.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    metrics: &mut RetryMetrics,
    is_connectivity_probe: bool,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    breaker.before_call()?;

    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => {
                breaker.record_success();
                return Ok(value);
            }
            Err(error) => {
                metrics.total_errors += 1;
                let (is_connection, is_deadlock) = classify(&error);
                if is_connection {
                    metrics.connection_errors += 1;
                }
                if is_deadlock {
                    metrics.deadlock_count += 1;
                }
                breaker.record_failure();

                let retryable = is_connection || is_connectivity_probe;
                if !retryable || attempt >= policy.max_retries {
                    return Err(error);
                }
                metrics.retries_attempted += 1;
                let delay = backoff_delay(policy, attempt);
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
