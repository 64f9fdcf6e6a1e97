// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step runner.
//!
//! A runner waits for its parent steps to settle, evaluates constraints,
//! submits the surviving artifacts to its queue and translates task events
//! into artifact-step events for the flow driver. It never touches flow
//! state directly; everything goes through the progress channel.
//!
//! Steps are ordered only by each runner waiting for its parents'
//! `StepFinished` events on the flow's internal bus.

use crate::constraint::{evaluate_constraints, ConstraintContext, Verdict};
use crate::error::{ConstraintError, EngineError};
use crate::step::Step;
use sk_core::{
    AbortResult, AbortStatus, Artifact, ErrorInfo, ExecutionStatus, FlowEvent, FlowId, Graph, Node, Outcome,
    StepInfo, Subscription, TaskId,
};
use sk_queue::{TaskQueue, QUEUE_CLOSED_NOTE};
use sk_storage::{ImmutableCache, KeyValueStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a flow's runners share.
pub(crate) struct FlowInputs<S: KeyValueStore> {
    pub flow_id: FlowId,
    pub repo_hash: String,
    pub steps: Graph<Step<S>>,
    pub step_infos: Arc<Graph<StepInfo>>,
    pub artifacts: Graph<Artifact>,
    pub cache: ImmutableCache<S>,
}

/// What a runner reports to the flow driver.
pub(crate) enum Progress {
    /// The step's global constraints skipped it; sent before its artifact events.
    Verdict { step_index: usize, verdict: AbortResult },
    Event(FlowEvent),
}

pub(crate) struct StepRunner<S: KeyValueStore> {
    pub inputs: Arc<FlowInputs<S>>,
    pub index: usize,
    pub queue: Arc<dyn TaskQueue>,
    /// `StepFinished` events of this step's recursive ancestors.
    pub ancestors: Subscription<FlowEvent>,
    pub progress: mpsc::UnboundedSender<Progress>,
}

/// Split off a fatal cache error; anything else fails the gated unit.
fn triage(err: ConstraintError) -> Result<Outcome, EngineError> {
    match err {
        ConstraintError::Cache(err) if err.is_fatal() => Err(err.into()),
        err => {
            tracing::warn!(error = %err, "constraint failed");
            Ok(Outcome::failed(0, vec![ErrorInfo::from_error(&err)]))
        }
    }
}

impl<S: KeyValueStore> StepRunner<S> {
    pub async fn run(mut self) -> Result<(), EngineError> {
        let inputs = Arc::clone(&self.inputs);
        let Some(node) = inputs.steps.get(self.index) else {
            return Ok(());
        };
        let step = &node.data;

        let Some(ancestors) = wait_for_parents(&mut self.ancestors, &node.parent_indexes).await else {
            tracing::debug!("flow driver went away before parents settled");
            return Ok(());
        };

        let ctx = ConstraintContext {
            flow_id: &inputs.flow_id,
            repo_hash: &inputs.repo_hash,
            step_index: self.index,
            step: &step.info,
            steps: &inputs.step_infos,
            artifacts: &inputs.artifacts,
            cache: &inputs.cache,
            ancestors: &ancestors,
        };

        match evaluate_constraints(&step.global_constraints, &ctx, None).await {
            Ok(Verdict::Run) => {}
            Ok(Verdict::Skip(verdict)) => {
                tracing::info!(
                    status = %sk_core::Status::from(verdict.status),
                    notes = ?verdict.notes,
                    "step skipped"
                );
                self.send(Progress::Verdict { step_index: self.index, verdict: verdict.clone() });
                for artifact in inputs.artifacts.iter() {
                    self.finish(artifact.index, Outcome::Aborted(verdict.clone()));
                }
                return Ok(());
            }
            Err(err) => {
                let outcome = triage(err)?;
                for artifact in inputs.artifacts.iter() {
                    self.finish(artifact.index, outcome.clone());
                }
                return Ok(());
            }
        }

        let mut pending = Vec::new();
        for artifact in inputs.artifacts.iter() {
            match evaluate_constraints(&step.artifact_constraints, &ctx, Some(artifact)).await {
                Ok(Verdict::Run) => pending.push(artifact.index),
                Ok(Verdict::Skip(verdict)) => self.finish(artifact.index, Outcome::Aborted(verdict)),
                Err(err) => {
                    let outcome = triage(err)?;
                    self.finish(artifact.index, outcome);
                }
            }
        }
        if pending.is_empty() {
            return Ok(());
        }
        self.dispatch(step, pending).await;
        Ok(())
    }

    /// Submit `pending` artifacts and relay their task events until every
    /// task settles.
    async fn dispatch(&self, step: &Step<S>, pending: Vec<usize>) {
        let inputs = &self.inputs;
        // subscribe before submitting so no event is missed
        let mut events = self.queue.subscribe_group(&step.task_group(&inputs.flow_id));
        let batches = step.planner.plan(&pending);
        let options = batches
            .iter()
            .map(|batch| {
                let nodes: Vec<&Node<Artifact>> = batch.iter().filter_map(|&i| inputs.artifacts.get(i)).collect();
                step.task_options(&inputs.flow_id, &inputs.repo_hash, &nodes)
            })
            .collect::<Result<Vec<_>, _>>();
        let options = match options {
            Ok(options) => options,
            Err(err) => {
                tracing::warn!(step = %step.info.step_name, error = %err, "could not encode task payload");
                self.fail_unsubmitted(&pending, "could not encode task payload", &err);
                return;
            }
        };

        let infos = match self.queue.add_tasks(options) {
            Ok(infos) => infos,
            Err(err) => {
                tracing::warn!(queue = %self.queue.kind(), error = %err, "could not submit tasks");
                self.fail_unsubmitted(&pending, "could not submit tasks", &err);
                return;
            }
        };
        let mut in_flight: HashMap<TaskId, Vec<usize>> =
            infos.into_iter().map(|info| info.task_id).zip(batches).collect();
        tracing::debug!(tasks = in_flight.len(), queue = %self.queue.kind(), "tasks submitted");

        while !in_flight.is_empty() {
            let Some(event) = events.recv().await else {
                tracing::warn!(queue = %self.queue.kind(), "task events ended early");
                let outcome = Outcome::skipped_as_failed(vec![QUEUE_CLOSED_NOTE.to_string()]);
                for artifact in in_flight.into_values().flatten() {
                    self.finish(artifact, outcome.clone());
                }
                return;
            };
            match event.outcome() {
                Some(outcome) => {
                    for artifact in in_flight.remove(event.task_id()).unwrap_or_default() {
                        self.finish(artifact, outcome.clone());
                    }
                }
                None if event.execution_status() == ExecutionStatus::Running => {
                    for &artifact_index in in_flight.get(event.task_id()).map(Vec::as_slice).unwrap_or_default() {
                        self.send(Progress::Event(FlowEvent::ArtifactStepRunning {
                            flow_id: inputs.flow_id.clone(),
                            step_index: self.index,
                            artifact_index,
                        }));
                    }
                }
                None => {}
            }
        }
    }

    fn fail_unsubmitted(&self, pending: &[usize], note: &str, err: &(dyn std::error::Error + 'static)) {
        let outcome: Outcome = AbortResult {
            status: AbortStatus::SkippedAsFailed,
            notes: vec![note.to_string()],
            errors: vec![ErrorInfo::from_error(err)],
        }
        .into();
        for &artifact in pending {
            self.finish(artifact, outcome.clone());
        }
    }

    fn finish(&self, artifact_index: usize, outcome: Outcome) {
        let Some(step) = self.inputs.steps.get(self.index) else {
            return;
        };
        let artifact_hash =
            self.inputs.artifacts.get(artifact_index).map(|a| a.data.content_hash.clone()).unwrap_or_default();
        self.send(Progress::Event(FlowEvent::ArtifactStepFinished {
            flow_id: self.inputs.flow_id.clone(),
            step_index: self.index,
            step_id: step.data.info.step_id.clone(),
            artifact_index,
            artifact_hash,
            outcome,
        }));
    }

    fn send(&self, progress: Progress) {
        // a closed channel means the driver already gave up on the flow
        let _ = self.progress.send(progress);
    }
}

/// Collect ancestor outcomes until every direct parent has settled.
///
/// Ancestors settle before their descendants, so by then every recursive
/// ancestor's outcome has arrived too. `None` if the bus went away.
async fn wait_for_parents(
    ancestors: &mut Subscription<FlowEvent>,
    parents: &[usize],
) -> Option<HashMap<usize, Outcome>> {
    let mut settled = HashMap::new();
    while !parents.iter().all(|p| settled.contains_key(p)) {
        if let FlowEvent::StepFinished { step_index, outcome, .. } = ancestors.recv().await? {
            settled.insert(step_index, outcome);
        }
    }
    Some(settled)
}
