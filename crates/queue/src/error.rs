// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors returned to callers of a task queue
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task queue is closed")]
    Closed,
    #[error("no handler registered for task '{0}'")]
    UnknownHandler(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    BuildService(#[from] BuildServiceError),
}

/// Errors from a worker-pool broker
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker rate limited the request")]
    RateLimited,
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("broker closed")]
    Closed,
    #[error("malformed broker message: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Errors from a remote build service
#[derive(Debug, Error)]
pub enum BuildServiceError {
    #[error("build service rate limited the request")]
    RateLimited,
    #[error("build rejected: {0}")]
    Rejected(String),
    #[error("build service unavailable: {0}")]
    Unavailable(String),
}

/// Whether an error may succeed when retried.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for BrokerError {
    fn is_transient(&self) -> bool {
        matches!(self, BrokerError::RateLimited)
    }
}

impl Transient for BuildServiceError {
    fn is_transient(&self) -> bool {
        matches!(self, BuildServiceError::RateLimited)
    }
}
