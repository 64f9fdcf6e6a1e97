// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process FIFO that runs one task at a time.

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::exec;
use crate::handler::{HandlerRegistry, TaskHandler};
use crate::queue::{task_infos, QueueKind, TaskOptions, TaskQueue};
use crate::shared::QueueCore;
use async_trait::async_trait;
use sk_core::{EventBus, TaskEvent, TaskInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Job {
    task: TaskInfo,
    handler: Arc<dyn TaskHandler>,
    timeout: Duration,
}

/// Runs tasks in submission order on the current tokio runtime.
pub struct LocalSequentialQueue {
    core: Arc<QueueCore>,
    handlers: HandlerRegistry,
    jobs: mpsc::UnboundedSender<Job>,
}

impl LocalSequentialQueue {
    /// Start the queue. Must be called inside a tokio runtime.
    pub fn new(handlers: HandlerRegistry, config: QueueConfig) -> Self {
        let core = Arc::new(QueueCore::new(QueueKind::LocalSequential, config));
        let (jobs, rx) = mpsc::unbounded_channel();
        core.spawn(run_loop(Arc::clone(&core), rx));
        Self { core, handlers, jobs }
    }
}

async fn run_loop(core: Arc<QueueCore>, mut rx: mpsc::UnboundedReceiver<Job>) {
    loop {
        let job = tokio::select! {
            biased;
            _ = core.cancel.cancelled() => break,
            job = rx.recv() => job,
        };
        let Some(job) = job else { break };
        exec::execute(&core.registry, job.handler, job.task, job.timeout, &core.cancel).await;
    }
    tracing::debug!("local queue loop stopped");
}

#[async_trait]
impl TaskQueue for LocalSequentialQueue {
    fn kind(&self) -> QueueKind {
        QueueKind::LocalSequential
    }

    fn add_tasks(&self, tasks: Vec<TaskOptions>) -> Result<Vec<TaskInfo>, QueueError> {
        let mut jobs = Vec::with_capacity(tasks.len());
        for (task, timeout) in task_infos(tasks) {
            let handler = self
                .handlers
                .get(&task.task_name)
                .ok_or_else(|| QueueError::UnknownHandler(task.task_name.clone()))?;
            let timeout = timeout.unwrap_or(self.core.config.default_task_timeout);
            jobs.push(Job { task, handler, timeout });
        }

        let infos: Vec<TaskInfo> = jobs.iter().map(|j| j.task.clone()).collect();
        self.core.registry.schedule_all(&infos)?;
        for job in jobs {
            // The loop only stops after close, which already aborted this task.
            let _ = self.jobs.send(job);
        }
        Ok(infos)
    }

    fn events(&self) -> &EventBus<TaskEvent> {
        self.core.registry.events()
    }

    async fn cleanup(&self) {
        self.core.shutdown(|| async {}).await;
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
