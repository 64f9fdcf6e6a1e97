// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker side of the worker pool: claim a job, run it, report back.

use crate::broker::{Broker, JobEnvelope, JobReport};
use crate::error::BrokerError;
use crate::exec::run_handler;
use crate::handler::HandlerRegistry;
use sk_core::{ErrorInfo, Outcome};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One worker process (or task) serving a broker.
pub struct Worker<B: Broker> {
    broker: B,
    handlers: HandlerRegistry,
    poll_interval: Duration,
}

impl<B: Broker> Worker<B> {
    pub fn new(broker: B, handlers: HandlerRegistry, poll_interval: Duration) -> Self {
        Self { broker, handlers, poll_interval }
    }

    /// Serve jobs until `shutdown` fires or the broker closes.
    ///
    /// The broker's worker counter is incremented on entry and decremented
    /// on the way out, including when the loop ends with an error.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), BrokerError> {
        let count = self.broker.register_worker().await?;
        tracing::info!(workers = count, "worker started");

        let result = self.serve(&shutdown).await;

        let count = self.broker.unregister_worker().await?;
        tracing::info!(workers = count, "worker stopped");
        match result {
            Err(BrokerError::Closed) => Ok(()),
            other => other,
        }
    }

    async fn serve(&self, shutdown: &CancellationToken) -> Result<(), BrokerError> {
        while !shutdown.is_cancelled() {
            match self.broker.claim().await? {
                Some(job) => self.process(job, shutdown).await?,
                None => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
        Ok(())
    }

    async fn process(&self, job: JobEnvelope, shutdown: &CancellationToken) -> Result<(), BrokerError> {
        let task_id = job.task.task_id.clone();
        self.broker.report(JobReport::Started { task_id: task_id.clone() }).await?;

        let outcome = match self.handlers.get(&job.task.task_name) {
            Some(handler) => {
                let timeout = Duration::from_millis(job.timeout_ms);
                match run_handler(handler, job.task, timeout, shutdown).await {
                    Some(outcome) => outcome,
                    // The submitter settles tasks of a stopping worker.
                    None => return Ok(()),
                }
            }
            None => {
                tracing::warn!(task_id = %task_id, name = %job.task.task_name, "no handler for claimed job");
                let message = format!("no handler registered for task '{}'", job.task.task_name);
                Outcome::failed(0, vec![ErrorInfo::new(message)])
            }
        };
        self.broker.report(JobReport::Finished { task_id, outcome }).await
    }
}
