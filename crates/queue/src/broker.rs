// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable job queue shared by a submitter and a pool of workers.

use crate::error::BrokerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sk_core::{Outcome, TaskId, TaskInfo};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// A job as it travels to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEnvelope {
    pub task: TaskInfo,
    /// Upper bound the worker should give the task body.
    pub timeout_ms: u64,
}

/// What a worker reports back about a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum JobReport {
    Started { task_id: TaskId },
    Finished { task_id: TaskId, outcome: Outcome },
}

impl JobReport {
    pub fn task_id(&self) -> &TaskId {
        match self {
            JobReport::Started { task_id } | JobReport::Finished { task_id, .. } => task_id,
        }
    }
}

/// Remote broker contract.
///
/// Jobs are claimed by exactly one worker. Reports flow back to the
/// submitting side. The worker counter lets submitters see capacity.
#[async_trait]
pub trait Broker: Clone + Send + Sync + 'static {
    async fn push(&self, job: JobEnvelope) -> Result<(), BrokerError>;

    /// Take the oldest unclaimed job, if any. Never blocks.
    async fn claim(&self) -> Result<Option<JobEnvelope>, BrokerError>;

    async fn report(&self, report: JobReport) -> Result<(), BrokerError>;

    /// Wait for the next report. `Err(BrokerError::Closed)` once closed.
    async fn next_report(&self) -> Result<JobReport, BrokerError>;

    /// Returns the new worker count.
    async fn register_worker(&self) -> Result<u64, BrokerError>;

    /// Returns the new worker count.
    async fn unregister_worker(&self) -> Result<u64, BrokerError>;

    async fn worker_count(&self) -> Result<u64, BrokerError>;

    /// Release connections.
    async fn close(&self) -> Result<(), BrokerError>;
}

#[derive(Default)]
struct BrokerState {
    jobs: VecDeque<String>,
    reports: VecDeque<String>,
    workers: u64,
    closed: bool,
    rate_limit_pushes: u32,
}

/// Broker kept in process memory, shared between clones.
///
/// Messages are stored JSON-encoded, as they would be on a remote broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    report_ready: Arc<Notify>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs pushed but not yet claimed.
    pub fn queued(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// Reject the next `n` pushes with [`BrokerError::RateLimited`].
    pub fn rate_limit_next_pushes(&self, n: u32) {
        self.state.lock().rate_limit_pushes = n;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn push(&self, job: JobEnvelope) -> Result<(), BrokerError> {
        let encoded = serde_json::to_string(&job)?;
        let mut state = self.state.lock();
        if state.closed {
            return Err(BrokerError::Closed);
        }
        if state.rate_limit_pushes > 0 {
            state.rate_limit_pushes -= 1;
            return Err(BrokerError::RateLimited);
        }
        state.jobs.push_back(encoded);
        Ok(())
    }

    async fn claim(&self) -> Result<Option<JobEnvelope>, BrokerError> {
        let encoded = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BrokerError::Closed);
            }
            state.jobs.pop_front()
        };
        Ok(encoded.map(|raw| serde_json::from_str(&raw)).transpose()?)
    }

    async fn report(&self, report: JobReport) -> Result<(), BrokerError> {
        let encoded = serde_json::to_string(&report)?;
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BrokerError::Closed);
            }
            state.reports.push_back(encoded);
        }
        self.report_ready.notify_one();
        Ok(())
    }

    async fn next_report(&self) -> Result<JobReport, BrokerError> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(raw) = state.reports.pop_front() {
                    return Ok(serde_json::from_str(&raw)?);
                }
                if state.closed {
                    return Err(BrokerError::Closed);
                }
            }
            self.report_ready.notified().await;
        }
    }

    async fn register_worker(&self) -> Result<u64, BrokerError> {
        let mut state = self.state.lock();
        state.workers += 1;
        Ok(state.workers)
    }

    async fn unregister_worker(&self) -> Result<u64, BrokerError> {
        let mut state = self.state.lock();
        state.workers = state.workers.saturating_sub(1);
        Ok(state.workers)
    }

    async fn worker_count(&self) -> Result<u64, BrokerError> {
        Ok(self.state.lock().workers)
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.state.lock().closed = true;
        self.report_ready.notify_waiters();
        // a reader between its closed check and its wait picks up this permit
        self.report_ready.notify_one();
        Ok(())
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
