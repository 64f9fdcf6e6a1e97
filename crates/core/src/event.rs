// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events: per-task events emitted by task queues and per-flow
//! events emitted by the execution engine.

use crate::id::{FlowId, StepId, TaskId};
use crate::result::{AbortResult, DoneResult, Outcome};
use crate::status::ExecutionStatus;
use serde::{Deserialize, Serialize};

/// Identifies one unit of work submitted to a task queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub task_name: String,
    /// Submitter-chosen label used to filter event subscriptions.
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Lifecycle event of one task, discriminated by `taskExecutionStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "taskExecutionStatus", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TaskEvent {
    Scheduled { task_info: TaskInfo },
    Running { task_info: TaskInfo },
    Done { task_info: TaskInfo, task_result: DoneResult },
    Aborted { task_info: TaskInfo, task_result: AbortResult },
}

impl TaskEvent {
    pub fn task_info(&self) -> &TaskInfo {
        match self {
            TaskEvent::Scheduled { task_info }
            | TaskEvent::Running { task_info }
            | TaskEvent::Done { task_info, .. }
            | TaskEvent::Aborted { task_info, .. } => task_info,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_info().task_id
    }

    pub fn execution_status(&self) -> ExecutionStatus {
        match self {
            TaskEvent::Scheduled { .. } => ExecutionStatus::Scheduled,
            TaskEvent::Running { .. } => ExecutionStatus::Running,
            TaskEvent::Done { .. } => ExecutionStatus::Done,
            TaskEvent::Aborted { .. } => ExecutionStatus::Aborted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.execution_status().is_terminal()
    }

    /// The terminal result, if this is a terminal event.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            TaskEvent::Done { task_result, .. } => Some(Outcome::Done(task_result.clone())),
            TaskEvent::Aborted { task_result, .. } => Some(Outcome::Aborted(task_result.clone())),
            TaskEvent::Scheduled { .. } | TaskEvent::Running { .. } => None,
        }
    }

    /// One-line rendering for logs.
    pub fn log_summary(&self) -> String {
        let info = self.task_info();
        let base = format!("task:{} id={} name={}", self.execution_status(), info.task_id, info.task_name);
        match self.outcome() {
            Some(outcome) => format!("{base} status={}", outcome.status()),
            None => base,
        }
    }
}

/// Progress of a flow, as seen by the execution engine and external observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum FlowEvent {
    #[serde(rename = "artifact_step:scheduled")]
    ArtifactStepScheduled { flow_id: FlowId, step_index: usize, artifact_index: usize },

    #[serde(rename = "artifact_step:running")]
    ArtifactStepRunning { flow_id: FlowId, step_index: usize, artifact_index: usize },

    #[serde(rename = "artifact_step:finished")]
    ArtifactStepFinished {
        flow_id: FlowId,
        step_index: usize,
        step_id: StepId,
        artifact_index: usize,
        artifact_hash: String,
        outcome: Outcome,
    },

    #[serde(rename = "step:finished")]
    StepFinished { flow_id: FlowId, step_index: usize, step_id: StepId, outcome: Outcome },

    #[serde(rename = "flow:finished")]
    FlowFinished { flow_id: FlowId, outcome: Outcome },
}

impl FlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FlowEvent::ArtifactStepScheduled { .. } => "artifact_step:scheduled",
            FlowEvent::ArtifactStepRunning { .. } => "artifact_step:running",
            FlowEvent::ArtifactStepFinished { .. } => "artifact_step:finished",
            FlowEvent::StepFinished { .. } => "step:finished",
            FlowEvent::FlowFinished { .. } => "flow:finished",
        }
    }

    pub fn flow_id(&self) -> &FlowId {
        match self {
            FlowEvent::ArtifactStepScheduled { flow_id, .. }
            | FlowEvent::ArtifactStepRunning { flow_id, .. }
            | FlowEvent::ArtifactStepFinished { flow_id, .. }
            | FlowEvent::StepFinished { flow_id, .. }
            | FlowEvent::FlowFinished { flow_id, .. } => flow_id,
        }
    }

    /// Step the event belongs to; `None` for flow-level events.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            FlowEvent::ArtifactStepScheduled { step_index, .. }
            | FlowEvent::ArtifactStepRunning { step_index, .. }
            | FlowEvent::ArtifactStepFinished { step_index, .. }
            | FlowEvent::StepFinished { step_index, .. } => Some(*step_index),
            FlowEvent::FlowFinished { .. } => None,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            FlowEvent::ArtifactStepFinished { outcome, .. }
            | FlowEvent::StepFinished { outcome, .. }
            | FlowEvent::FlowFinished { outcome, .. } => Some(outcome),
            FlowEvent::ArtifactStepScheduled { .. } | FlowEvent::ArtifactStepRunning { .. } => None,
        }
    }

    /// Whether the event reports a terminal result (and so is published externally).
    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// One-line rendering for logs.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            FlowEvent::ArtifactStepScheduled { flow_id, step_index, artifact_index }
            | FlowEvent::ArtifactStepRunning { flow_id, step_index, artifact_index } => {
                format!("{t} flow={flow_id} step={step_index} artifact={artifact_index}")
            }
            FlowEvent::ArtifactStepFinished { flow_id, step_id, artifact_index, outcome, .. } => {
                format!(
                    "{t} flow={flow_id} step={step_id} artifact={artifact_index} status={}",
                    outcome.status()
                )
            }
            FlowEvent::StepFinished { flow_id, step_id, outcome, .. } => {
                format!("{t} flow={flow_id} step={step_id} status={}", outcome.status())
            }
            FlowEvent::FlowFinished { flow_id, outcome } => {
                format!("{t} flow={flow_id} status={}", outcome.status())
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
