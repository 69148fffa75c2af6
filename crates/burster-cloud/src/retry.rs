//! Fixed-delay retry polling
//!
//! Providers use this to wait for resources to appear or settle. Every wait
//! is raced against a [`CancellationToken`] so an interrupted run stops
//! polling immediately.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub const fn secs(max_attempts: u32, delay_secs: u64) -> Self {
        Self::new(max_attempts, Duration::from_secs(delay_secs))
    }

    /// A single attempt, no waiting.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::secs(10, 5)
    }
}

#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("cancelled while retrying")]
    Cancelled,
}

impl<E> RetryError<E> {
    /// The error of the final attempt, if attempts ran out.
    pub fn into_last(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Cancelled => None,
        }
    }
}

/// Sleeps for `delay` unless `cancel` fires first.
///
/// Returns `false` when cancelled.
pub async fn sleep(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` is reached.
///
/// The delay is only applied between attempts. A policy of zero attempts
/// still runs `op` once. On exhaustion the last error is returned inside
/// [`RetryError::Exhausted`].
pub async fn attempt<T, E, F, Fut>(
    cancel: &CancellationToken,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut tries = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        tries += 1;

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            outcome = op() => outcome,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if tries >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: tries,
                    last: e,
                });
            }
            Err(e) => {
                debug!(attempt = tries, max_attempts, error = %e, "Attempt failed, retrying");
                if !sleep(cancel, policy.delay).await {
                    return Err(RetryError::Cancelled);
                }
            }
        }
    }
}
