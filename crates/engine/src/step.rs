// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step definitions: what a step runs, where, and under which constraints.

use crate::constraint::Constraint;
use serde::{Deserialize, Serialize};
use sk_core::{Artifact, FlowId, Node, StepInfo};
use sk_queue::{QueueKind, TaskOptions};
use sk_storage::KeyValueStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Which cache entries a step's results are persisted under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultScope {
    /// One entry per artifact, keyed by step id and artifact hash.
    #[default]
    Artifact,
    /// Per-artifact entries plus the aggregated step result under the step id.
    Step,
}

/// How a step batches the artifacts it runs on into task submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPlanner {
    #[default]
    OnePerArtifact,
    SingleBatch,
}

impl TaskPlanner {
    /// Split artifact indexes into batches, keeping graph order.
    pub fn plan(self, artifacts: &[usize]) -> Vec<Vec<usize>> {
        if artifacts.is_empty() {
            return Vec::new();
        }
        match self {
            TaskPlanner::OnePerArtifact => artifacts.iter().map(|&i| vec![i]).collect(),
            TaskPlanner::SingleBatch => vec![artifacts.to_vec()],
        }
    }
}

/// One pipeline stage.
pub struct Step<S: KeyValueStore> {
    pub info: StepInfo,
    pub queue: QueueKind,
    /// Handler name the task queue runs for this step.
    pub task_name: String,
    pub global_constraints: Vec<Arc<dyn Constraint<S>>>,
    pub artifact_constraints: Vec<Arc<dyn Constraint<S>>>,
    pub planner: TaskPlanner,
    pub result_scope: ResultScope,
    pub timeout: Option<Duration>,
}

impl<S: KeyValueStore> Clone for Step<S> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            queue: self.queue,
            task_name: self.task_name.clone(),
            global_constraints: self.global_constraints.clone(),
            artifact_constraints: self.artifact_constraints.clone(),
            planner: self.planner,
            result_scope: self.result_scope,
            timeout: self.timeout,
        }
    }
}

impl<S: KeyValueStore> std::fmt::Debug for Step<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |cs: &[Arc<dyn Constraint<S>>]| cs.iter().map(|c| c.name().to_string()).collect::<Vec<_>>();
        f.debug_struct("Step")
            .field("info", &self.info)
            .field("queue", &self.queue)
            .field("task_name", &self.task_name)
            .field("global_constraints", &names(&self.global_constraints))
            .field("artifact_constraints", &names(&self.artifact_constraints))
            .field("planner", &self.planner)
            .field("result_scope", &self.result_scope)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> Step<S> {
    /// A step whose tasks are named after the step.
    pub fn new(info: StepInfo, queue: QueueKind) -> Self {
        let task_name = info.step_name.clone();
        Self {
            info,
            queue,
            task_name,
            global_constraints: Vec::new(),
            artifact_constraints: Vec::new(),
            planner: TaskPlanner::default(),
            result_scope: ResultScope::default(),
            timeout: None,
        }
    }

    pub fn task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = task_name.into();
        self
    }

    pub fn global(mut self, constraint: impl Constraint<S> + 'static) -> Self {
        self.global_constraints.push(Arc::new(constraint));
        self
    }

    pub fn per_artifact(mut self, constraint: impl Constraint<S> + 'static) -> Self {
        self.artifact_constraints.push(Arc::new(constraint));
        self
    }

    pub fn planner(mut self, planner: TaskPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn result_scope(mut self, scope: ResultScope) -> Self {
        self.result_scope = scope;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Group label shared by every task this step submits in `flow_id`.
    pub fn task_group(&self, flow_id: &FlowId) -> String {
        format!("{flow_id}:{}", self.info.step_id)
    }

    /// Task submission for one batch of artifacts.
    ///
    /// Fails when the payload cannot be encoded, e.g. a non UTF-8 path.
    pub(crate) fn task_options(
        &self,
        flow_id: &FlowId,
        repo_hash: &str,
        batch: &[&Node<Artifact>],
    ) -> Result<TaskOptions, serde_json::Error> {
        let payload = TaskPayload {
            flow_id: flow_id.clone(),
            repo_hash: repo_hash.to_string(),
            step: self.info.clone(),
            artifacts: batch.iter().map(|n| PayloadArtifact::from_node(n)).collect(),
        };
        let mut options = TaskOptions::new(&self.task_name)
            .group(self.task_group(flow_id))
            .payload(serde_json::to_value(&payload)?);
        if let Some(timeout) = self.timeout {
            options = options.timeout(timeout);
        }
        Ok(options)
    }
}

/// Payload of every task the engine submits; handlers deserialize it from
/// [`sk_core::TaskInfo::payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub flow_id: FlowId,
    pub repo_hash: String,
    pub step: StepInfo,
    pub artifacts: Vec<PayloadArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadArtifact {
    pub index: usize,
    pub package_name: String,
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub content_hash: String,
}

impl PayloadArtifact {
    fn from_node(node: &Node<Artifact>) -> Self {
        Self {
            index: node.index,
            package_name: node.data.name().to_string(),
            relative_path: node.data.relative_path.clone(),
            absolute_path: node.data.absolute_path.clone(),
            content_hash: node.data.content_hash.clone(),
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
