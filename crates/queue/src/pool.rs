// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submitting side of the worker pool.
//!
//! Each task gets a supervisor that pushes it to the broker (retrying rate
//! limits) and then holds its deadline. A single report watcher turns
//! worker reports into lifecycle events.

use crate::broker::{Broker, JobEnvelope, JobReport};
use crate::config::QueueConfig;
use crate::error::{BrokerError, QueueError};
use crate::queue::{task_infos, QueueKind, TaskOptions, TaskQueue, TASK_TIMEOUT_NOTE};
use crate::retry::{wait_for, with_retry, RetryError};
use crate::shared::QueueCore;
use async_trait::async_trait;
use parking_lot::Mutex;
use sk_core::{AbortResult, AbortStatus, ErrorInfo, EventBus, Outcome, TaskEvent, TaskId, TaskInfo};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type Watches = Arc<Mutex<HashMap<TaskId, CancellationToken>>>;

pub struct WorkerPoolQueue<B: Broker> {
    core: Arc<QueueCore>,
    broker: B,
    watches: Watches,
}

impl<B: Broker> WorkerPoolQueue<B> {
    /// Start the report watcher. Must be called inside a tokio runtime.
    pub fn new(broker: B, config: QueueConfig) -> Self {
        let core = Arc::new(QueueCore::new(QueueKind::WorkerPool, config));
        let watches = Watches::default();
        core.spawn(watch_reports(Arc::clone(&core), broker.clone(), Arc::clone(&watches)));
        Self { core, broker, watches }
    }

    /// Workers currently registered with the broker.
    pub async fn available_workers(&self) -> Result<u64, QueueError> {
        Ok(self.broker.worker_count().await?)
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }
}

fn timed_out() -> Outcome {
    Outcome::skipped_as_failed(vec![TASK_TIMEOUT_NOTE.to_string()])
}

async fn supervise<B: Broker>(
    core: Arc<QueueCore>,
    broker: B,
    job: JobEnvelope,
    token: CancellationToken,
    deadline: Instant,
    watches: Watches,
) {
    let id = job.task.task_id.clone();
    let pushed = with_retry(&core.config.retry, &token, deadline, || broker.push(job.clone())).await;
    match pushed {
        Ok(()) => {
            tracing::debug!(task_id = %id, "job pushed to broker");
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    if core.registry.finish(&id, timed_out()) {
                        tracing::warn!(task_id = %id, "task timed out waiting for worker");
                    }
                }
            }
        }
        Err(RetryError::Cancelled) => {}
        Err(RetryError::DeadlineExceeded) => {
            core.registry.finish(&id, timed_out());
        }
        Err(RetryError::Failed(err)) => {
            tracing::warn!(task_id = %id, error = %err, "could not submit job");
            let result = AbortResult {
                status: AbortStatus::SkippedAsFailed,
                notes: vec!["could not submit task to broker".to_string()],
                errors: vec![ErrorInfo::from_error(&err)],
            };
            core.registry.finish(&id, result.into());
        }
    }
    watches.lock().remove(&id);
}

/// Apply a report to a known task. Returns `false` if the task is unknown.
fn apply_report(core: &QueueCore, watches: &Watches, report: &JobReport) -> bool {
    let id = report.task_id();
    if !core.registry.contains(id) {
        if core.registry.was_settled(id) {
            tracing::debug!(task_id = %id, "report for settled task");
            return true;
        }
        return false;
    }
    match report {
        JobReport::Started { .. } => {
            core.registry.mark_running(id);
        }
        JobReport::Finished { outcome, .. } => {
            // a lost start report must not skip `running`
            core.registry.mark_running(id);
            core.registry.finish(id, outcome.clone());
            if let Some(token) = watches.lock().remove(id) {
                token.cancel();
            }
        }
    }
    true
}

async fn watch_reports<B: Broker>(core: Arc<QueueCore>, broker: B, watches: Watches) {
    loop {
        let next = tokio::select! {
            biased;
            _ = core.cancel.cancelled() => break,
            next = broker.next_report() => next,
        };
        match next {
            Ok(report) => {
                if apply_report(&core, &watches, &report) {
                    continue;
                }
                let (retry_core, retry_watches) = (Arc::clone(&core), Arc::clone(&watches));
                core.spawn(async move {
                    let policy = retry_core.config.unknown_event.clone();
                    let applied = wait_for(&policy, &retry_core.cancel, || {
                        apply_report(&retry_core, &retry_watches, &report).then_some(())
                    })
                    .await;
                    if applied.is_none() {
                        tracing::warn!(task_id = %report.task_id(), "dropping report for unknown task");
                    }
                });
            }
            Err(BrokerError::Closed) => break,
            Err(err) => {
                tracing::warn!(error = %err, "reading broker reports failed");
                tokio::select! {
                    _ = core.cancel.cancelled() => break,
                    _ = tokio::time::sleep(core.config.retry.initial_delay) => {}
                }
            }
        }
    }
}

#[async_trait]
impl<B: Broker> TaskQueue for WorkerPoolQueue<B> {
    fn kind(&self) -> QueueKind {
        QueueKind::WorkerPool
    }

    fn add_tasks(&self, tasks: Vec<TaskOptions>) -> Result<Vec<TaskInfo>, QueueError> {
        let tasks = task_infos(tasks);
        let infos: Vec<TaskInfo> = tasks.iter().map(|(info, _)| info.clone()).collect();
        self.core.registry.schedule_all(&infos)?;

        let now = Instant::now();
        for (task, timeout) in tasks {
            let timeout = timeout.unwrap_or(self.core.config.default_task_timeout);
            let token = self.core.cancel.child_token();
            self.watches.lock().insert(task.task_id.clone(), token.clone());
            let job = JobEnvelope {
                task,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            };
            let deadline = now.checked_add(timeout).unwrap_or_else(|| now + Duration::from_secs(86400 * 365));
            self.core.spawn(supervise(
                Arc::clone(&self.core),
                self.broker.clone(),
                job,
                token,
                deadline,
                Arc::clone(&self.watches),
            ));
        }
        Ok(infos)
    }

    fn events(&self) -> &EventBus<TaskEvent> {
        self.core.registry.events()
    }

    async fn cleanup(&self) {
        let broker = self.broker.clone();
        self.core
            .shutdown(|| async move {
                if let Err(err) = broker.close().await {
                    tracing::warn!(error = %err, "closing broker failed");
                }
            })
            .await;
        self.watches.lock().clear();
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
