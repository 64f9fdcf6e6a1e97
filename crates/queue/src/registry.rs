// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle bookkeeping shared by every backend.
//!
//! All emissions go through the registry, which checks and advances a task's
//! state under one lock before publishing. A task therefore never emits
//! `running` after a terminal event, nor a second terminal event, no matter
//! which of the worker, the timeout or the shutdown path gets there first.
//!
//! A task is forgotten once its terminal event is out; a bounded set of
//! recently settled ids still recognises reports that arrive late.

use crate::error::QueueError;
use crate::shared::RecentIds;
use parking_lot::Mutex;
use sk_core::{AbortResult, AbortStatus, EventBus, ExecutionStatus, Outcome, TaskEvent, TaskId, TaskInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

struct Tracked {
    info: TaskInfo,
    status: ExecutionStatus,
    scheduled_at: Instant,
    started_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    /// Unsettled tasks only.
    tasks: HashMap<TaskId, Tracked>,
    settled: RecentIds<TaskId>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    state: Arc<Mutex<State>>,
    events: EventBus<TaskEvent>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &EventBus<TaskEvent> {
        &self.events
    }

    /// Track every task in `tasks` and emit `scheduled` for each.
    ///
    /// All or nothing: a closed registry accepts none of them.
    pub fn schedule_all(&self, tasks: &[TaskInfo]) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        let now = Instant::now();
        for info in tasks {
            state.tasks.insert(
                info.task_id.clone(),
                Tracked {
                    info: info.clone(),
                    status: ExecutionStatus::Scheduled,
                    scheduled_at: now,
                    started_at: None,
                },
            );
            self.events.publish(TaskEvent::Scheduled { task_info: info.clone() });
        }
        Ok(())
    }

    /// Advance a scheduled task to running. Returns `false` (emitting
    /// nothing) if the task is unknown or past `scheduled`.
    pub fn mark_running(&self, id: &TaskId) -> bool {
        let mut state = self.state.lock();
        let Some(task) = state.tasks.get_mut(id) else {
            return false;
        };
        if !task.status.can_advance_to(ExecutionStatus::Running) {
            return false;
        }
        task.status = ExecutionStatus::Running;
        task.started_at = Some(Instant::now());
        self.events.publish(TaskEvent::Running { task_info: task.info.clone() });
        true
    }

    /// Settle a task with `outcome` and stop tracking it. Returns `false`
    /// (emitting nothing) if the task is unknown or already settled.
    pub fn finish(&self, id: &TaskId, outcome: Outcome) -> bool {
        let mut state = self.state.lock();
        let Some(task) = state.tasks.remove(id) else {
            if state.settled.contains(id) {
                tracing::debug!(task_id = %id, "task already settled, dropping result");
            }
            return false;
        };
        state.settled.insert(id.clone());
        let task_info = task.info;
        let event = match outcome {
            Outcome::Done(task_result) => TaskEvent::Done { task_info, task_result },
            Outcome::Aborted(task_result) => TaskEvent::Aborted { task_info, task_result },
        };
        tracing::debug!(summary = %event.log_summary(), "task settled");
        self.events.publish(event);
        true
    }

    /// Refuse further tasks and abort every unsettled one with `note`.
    ///
    /// Returns how many tasks were aborted.
    pub fn close(&self, note: &str) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let tasks = std::mem::take(&mut state.tasks);
        let aborted = tasks.len();
        for (id, task) in tasks {
            let task_result = AbortResult::new(AbortStatus::SkippedAsFailed).with_note(note);
            self.events.publish(TaskEvent::Aborted { task_info: task.info, task_result });
            state.settled.insert(id);
        }
        aborted
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Phase of an unsettled task; `None` once it settled.
    pub fn status(&self, id: &TaskId) -> Option<ExecutionStatus> {
        self.state.lock().tasks.get(id).map(|t| t.status)
    }

    /// Whether the task is tracked and not yet settled.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.state.lock().tasks.contains_key(id)
    }

    /// Whether the task settled recently enough to still be remembered.
    pub fn was_settled(&self, id: &TaskId) -> bool {
        self.state.lock().settled.contains(id)
    }

    pub fn info(&self, id: &TaskId) -> Option<TaskInfo> {
        self.state.lock().tasks.get(id).map(|t| t.info.clone())
    }

    /// Milliseconds since the task started running, or since it was
    /// scheduled if it never reported a start.
    pub fn elapsed_ms(&self, id: &TaskId) -> u64 {
        let state = self.state.lock();
        state
            .tasks
            .get(id)
            .map(|t| {
                let since = t.started_at.unwrap_or(t.scheduled_at);
                u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
            })
            .unwrap_or(0)
    }

    /// Number of tracked tasks not yet settled.
    pub fn pending(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
