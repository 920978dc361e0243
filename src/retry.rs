//! Bounded retry for transient failures
//!
//! The policy is plain data ([`RetryConfig`]): a total attempt budget, a delay
//! between tries, an optional backoff multiplier and optional jitter. Waiting
//! goes through the [`Delay`] trait so tests can observe the requested pauses
//! without sleeping.
//!
//! # Example
//!
//! ```no_run
//! use story_dl::retry::{IsRetryable, TokioDelay, download_with_retry};
//! use story_dl::config::RetryConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! let result = download_with_retry(&config, &TokioDelay, &cancel, || async {
//!     Ok::<_, MyError>(())
//! })
//! .await;
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::MediaError;
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (connection reset, timeout, broken body stream) should return `true`.
/// Permanent failures (rejected status, missing headers, disk errors) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for MediaError {
    fn is_retryable(&self) -> bool {
        match self {
            // Any transport-level failure counts as one failed try
            MediaError::Transport(_) => true,
            MediaError::Stalled(_) => true,
            // The remote rejected this item
            MediaError::BadStatus(_) => false,
            MediaError::MissingEntityTag => false,
            // Local disk problems will not fix themselves within a second
            MediaError::Io(_) => false,
        }
    }
}

/// Source of pauses between tries and before transfers
#[async_trait]
pub trait Delay: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// [`Delay`] backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryError<E> {
    /// Cancellation was observed before or between tries
    Cancelled,
    /// The last try failed, either permanently or with the budget spent
    Failed {
        /// Error from the last try
        error: E,
        /// Number of tries made
        attempts: u32,
    },
}

/// Execute an async operation with bounded retry
///
/// # Arguments
///
/// * `config` - Retry configuration (attempt budget, delays, backoff multiplier, jitter)
/// * `delay` - Where pauses between tries are spent
/// * `cancel` - Checked before every try and before every pause
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// The first successful result, [`RetryError::Cancelled`], or the error of the
/// final try together with the number of tries made.
pub async fn download_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    delay: &dyn Delay,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut wait = config.initial_delay;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = wait.as_millis(),
                    "Operation failed, retrying"
                );

                if cancel.is_cancelled() {
                    return Err(RetryError::Cancelled);
                }

                let jittered = if config.jitter { add_jitter(wait) } else { wait };
                delay.sleep(jittered).await;

                let next = Duration::from_secs_f64(wait.as_secs_f64() * config.backoff_multiplier);
                wait = next.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(RetryError::Failed {
                    error: e,
                    attempts: attempt,
                });
            }
        }
    }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
