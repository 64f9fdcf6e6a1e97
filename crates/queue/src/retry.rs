// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry loops for backend calls and for remote notifications that arrive
//! before their submission is registered locally.

use crate::config::{RetryPolicy, UnknownEventPolicy};
use crate::error::Transient;
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why [`with_retry`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    Cancelled,
    DeadlineExceeded,
    /// A permanent error, or the last transient one once attempts ran out.
    Failed(E),
}

/// Call `op` until it succeeds, backing off on transient errors.
///
/// Stops at once when `cancel` fires or `deadline` passes, including while
/// an attempt is in flight.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    deadline: Instant,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(RetryError::DeadlineExceeded),
            result = op() => result,
        };
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => err,
            Err(err) => return Err(RetryError::Failed(err)),
        };

        let delay = policy.delay_for(attempt);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(RetryError::DeadlineExceeded),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

/// Poll `lookup` until it yields a value, waiting `policy.delay` between
/// checks, for at most `policy.max_attempts` retries after the first.
///
/// Returns `None` when attempts run out or `cancel` fires.
pub async fn wait_for<T>(
    policy: &UnknownEventPolicy,
    cancel: &CancellationToken,
    mut lookup: impl FnMut() -> Option<T>,
) -> Option<T> {
    for attempt in 0..=policy.max_attempts {
        if let Some(found) = lookup() {
            return Some(found);
        }
        if attempt == policy.max_attempts {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
