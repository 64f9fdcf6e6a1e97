// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The contract every task queue backend implements.

use crate::error::QueueError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sk_core::{EventBus, Subscription, TaskEvent, TaskInfo};
use std::time::Duration;

/// Note attached to tasks aborted because their queue shut down.
pub const QUEUE_CLOSED_NOTE: &str = "queue closed";

/// Note attached to tasks aborted because their deadline passed.
pub const TASK_TIMEOUT_NOTE: &str = "task-timeout";

/// Kind of execution backend a step asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueKind {
    LocalSequential,
    WorkerPool,
    RemoteBuild,
}

sk_core::simple_display! {
    QueueKind {
        LocalSequential => "local-sequential",
        WorkerPool => "worker-pool",
        RemoteBuild => "remote-build",
    }
}

/// One unit of work to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOptions {
    /// Selects the handler that runs the task.
    pub task_name: String,
    /// Label copied into [`TaskInfo::group`] so submitters can subscribe
    /// before task IDs exist.
    pub group: String,
    pub payload: serde_json::Value,
    /// Overrides the queue's default task timeout.
    pub timeout: Option<Duration>,
}

impl TaskOptions {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            group: String::new(),
            payload: serde_json::Value::Null,
            timeout: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A backend that runs submitted tasks and reports their lifecycle.
///
/// For every task ID the event stream carries a prefix of
/// `scheduled, running, done|aborted`, with exactly one terminal event once
/// the task settles.
#[async_trait]
pub trait TaskQueue: Send + Sync + 'static {
    fn kind(&self) -> QueueKind;

    /// Submit tasks. Returns immediately; execution is asynchronous.
    ///
    /// Fails with [`QueueError::Closed`] after [`TaskQueue::cleanup`].
    fn add_tasks(&self, tasks: Vec<TaskOptions>) -> Result<Vec<TaskInfo>, QueueError>;

    /// Lifecycle events of every task this queue accepted.
    fn events(&self) -> &EventBus<TaskEvent>;

    /// Stop accepting tasks, abort unsettled ones and release the backend.
    ///
    /// Idempotent; concurrent callers all return once shutdown completes.
    async fn cleanup(&self);

    /// Lifecycle events of tasks submitted under `group`.
    fn subscribe_group(&self, group: &str) -> Subscription<TaskEvent> {
        let group = group.to_string();
        self.events().subscribe(move |e| e.task_info().group == group)
    }
}

pub(crate) fn task_infos(tasks: Vec<TaskOptions>) -> Vec<(TaskInfo, Option<Duration>)> {
    tasks
        .into_iter()
        .map(|t| {
            let info = TaskInfo {
                task_id: sk_core::TaskId::random(),
                task_name: t.task_name,
                group: t.group,
                payload: t.payload,
            };
            (info, t.timeout)
        })
        .collect()
}
