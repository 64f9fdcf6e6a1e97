// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::BrokerError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        multiplier: 2,
    }
}

fn far() -> Instant {
    Instant::now() + Duration::from_secs(3600)
}

#[tokio::test(start_paused = true)]
async fn rate_limit_is_retried_until_success() {
    let calls = &AtomicU32::new(0);
    let result = with_retry(&policy(5), &CancellationToken::new(), far(), move || async move {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(BrokerError::RateLimited)
        } else {
            Ok("pushed")
        }
    })
    .await;

    assert_eq!(result.unwrap(), "pushed");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn attempts_are_bounded() {
    let calls = &AtomicU32::new(0);
    let result: Result<(), _> = with_retry(&policy(3), &CancellationToken::new(), far(), move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::RateLimited)
    })
    .await;

    assert!(matches!(result, Err(RetryError::Failed(BrokerError::RateLimited))));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn permanent_error_is_not_retried() {
    let calls = &AtomicU32::new(0);
    let result: Result<(), _> = with_retry(&policy(5), &CancellationToken::new(), far(), move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::Unavailable("down".into()))
    })
    .await;

    assert!(matches!(result, Err(RetryError::Failed(BrokerError::Unavailable(_)))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let result: Result<(), _> =
        with_retry(&policy(100), &cancel, far(), move || async move { Err(BrokerError::RateLimited) }).await;
    assert!(matches!(result, Err(RetryError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn deadline_interrupts_in_flight_attempt() {
    let deadline = Instant::now() + Duration::from_secs(1);
    let result: Result<(), RetryError<BrokerError>> =
        with_retry(&policy(5), &CancellationToken::new(), deadline, || async {
            std::future::pending::<Result<(), BrokerError>>().await
        })
        .await;
    assert!(matches!(result, Err(RetryError::DeadlineExceeded)));
}

#[tokio::test(start_paused = true)]
async fn wait_for_finds_late_value() {
    let policy = UnknownEventPolicy { max_attempts: 5, delay: Duration::from_secs(1) };
    let checks = &AtomicU32::new(0);
    let found = wait_for(&policy, &CancellationToken::new(), || {
        (checks.fetch_add(1, Ordering::SeqCst) == 2).then_some("task")
    })
    .await;
    assert_eq!(found, Some("task"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_gives_up_after_bound() {
    let policy = UnknownEventPolicy { max_attempts: 3, delay: Duration::from_secs(1) };
    let checks = &AtomicU32::new(0);
    let started = Instant::now();
    let found: Option<()> = wait_for(&policy, &CancellationToken::new(), || {
        checks.fetch_add(1, Ordering::SeqCst);
        None
    })
    .await;

    assert_eq!(found, None);
    assert_eq!(checks.load(Ordering::SeqCst), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}
