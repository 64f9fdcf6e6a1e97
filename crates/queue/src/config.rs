// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue tuning knobs. Every field has a default, so an empty table is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Deadline for tasks submitted without their own timeout.
    #[serde(with = "crate::duration")]
    pub default_task_timeout: Duration,
    pub retry: RetryPolicy,
    pub unknown_event: UnknownEventPolicy,
    /// How long an idle worker waits before claiming again.
    #[serde(with = "crate::duration")]
    pub claim_poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_task_timeout: Duration::from_secs(30 * 60),
            retry: RetryPolicy::default(),
            unknown_event: UnknownEventPolicy::default(),
            claim_poll_interval: Duration::from_millis(250),
        }
    }
}

/// Bounded exponential backoff for transient backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    #[serde(with = "crate::duration")]
    pub initial_delay: Duration,
    #[serde(with = "crate::duration")]
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// How long to keep re-checking a remote notification whose id is not yet
/// known locally before dropping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnknownEventPolicy {
    pub max_attempts: u32,
    #[serde(with = "crate::duration")]
    pub delay: Duration,
}

impl Default for UnknownEventPolicy {
    fn default() -> Self {
        Self { max_attempts: 30, delay: Duration::from_secs(1) }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
