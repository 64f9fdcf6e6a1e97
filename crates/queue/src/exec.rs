// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running one task body with timeout, cancellation and panic containment.

use crate::handler::TaskHandler;
use crate::queue::TASK_TIMEOUT_NOTE;
use crate::registry::TaskRegistry;
use sk_core::{DoneResult, DoneStatus, ErrorInfo, Outcome, TaskInfo};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

fn join_failure(err: JoinError, duration_ms: u64) -> Outcome {
    if err.is_panic() {
        let message = format!("task panicked: {}", panic_message(err.into_panic()));
        Outcome::failed(duration_ms, vec![ErrorInfo::new(message)])
    } else {
        Outcome::skipped_as_failed(vec!["task cancelled".to_string()])
    }
}

/// Run `handler` on `task`, bounded by `timeout`.
///
/// Returns `None` if `cancel` fires first; the caller's shutdown path has
/// already settled the task in that case.
pub(crate) async fn run_handler(
    handler: Arc<dyn TaskHandler>,
    task: TaskInfo,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Option<Outcome> {
    let span = tracing::info_span!("task", task_id = %task.task_id, name = %task.task_name);
    let started = Instant::now();
    let mut join = tokio::spawn(async move { handler.handle(task).await }.instrument(span));

    let outcome = tokio::select! {
        joined = &mut join => match joined {
            Ok(Ok(output)) => Outcome::Done(DoneResult {
                status: DoneStatus::Passed,
                duration_ms: elapsed_ms(started),
                notes: output.notes,
                errors: Vec::new(),
            }),
            Ok(Err(err)) => {
                Outcome::failed(elapsed_ms(started), vec![ErrorInfo::from_error(&*err)])
            }
            Err(err) => join_failure(err, elapsed_ms(started)),
        },
        _ = tokio::time::sleep(timeout) => {
            join.abort();
            Outcome::skipped_as_failed(vec![TASK_TIMEOUT_NOTE.to_string()])
        }
        _ = cancel.cancelled() => {
            join.abort();
            return None;
        }
    };
    Some(outcome)
}

/// Drive a scheduled task through running to its terminal event.
pub(crate) async fn execute(
    registry: &TaskRegistry,
    handler: Arc<dyn TaskHandler>,
    task: TaskInfo,
    timeout: Duration,
    cancel: &CancellationToken,
) {
    let id = task.task_id.clone();
    if !registry.mark_running(&id) {
        return;
    }
    if let Some(outcome) = run_handler(handler, task, timeout, cancel).await {
        if let Outcome::Done(ref result) = outcome {
            if result.status == DoneStatus::Failed {
                tracing::warn!(task_id = %id, errors = ?result.errors, "task failed");
            }
        }
        registry.finish(&id, outcome);
    }
}
