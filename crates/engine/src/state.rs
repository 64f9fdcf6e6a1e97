// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory result tree of one flow: every step's result on every artifact.
//!
//! Only the flow driver mutates it. Artifact-step results only move forward
//! through the lifecycle; a step settles once, when its aggregated phase
//! turns terminal.

use sk_core::{
    AbortResult, Artifact, ArtifactResultOfSteps, ExecutionStatus, FlowEvent, FlowId, FlowReport, Graph,
    Outcome, StepInfo, StepResult, StepResultOfArtifacts, UnitOfArtifact, UnitOfStep,
};
use tokio::time::Instant;

struct StepState {
    info: StepInfo,
    artifacts: Vec<StepResult>,
    /// Verdict of the step's global constraints, when they skipped it.
    verdict: Option<AbortResult>,
    settled: Option<StepResult>,
}

pub struct FlowState {
    flow_id: FlowId,
    repo_hash: String,
    started: Instant,
    packages: Vec<String>,
    steps: Vec<StepState>,
}

fn phase(event: &FlowEvent) -> Option<(usize, usize, ExecutionStatus)> {
    match event {
        FlowEvent::ArtifactStepScheduled { step_index, artifact_index, .. } => {
            Some((*step_index, *artifact_index, ExecutionStatus::Scheduled))
        }
        FlowEvent::ArtifactStepRunning { step_index, artifact_index, .. } => {
            Some((*step_index, *artifact_index, ExecutionStatus::Running))
        }
        FlowEvent::ArtifactStepFinished { step_index, artifact_index, outcome, .. } => {
            Some((*step_index, *artifact_index, outcome.execution_status()))
        }
        FlowEvent::StepFinished { .. } | FlowEvent::FlowFinished { .. } => None,
    }
}

fn done_duration(result: &StepResult) -> u64 {
    match result {
        StepResult::Done(r) => r.duration_ms,
        _ => 0,
    }
}

impl FlowState {
    /// Every step starts `scheduled` on every artifact.
    pub fn new(flow_id: FlowId, repo_hash: impl Into<String>, steps: &Graph<StepInfo>, artifacts: &Graph<Artifact>) -> Self {
        let steps = steps
            .iter()
            .map(|n| StepState {
                info: n.data.clone(),
                artifacts: vec![StepResult::Scheduled; artifacts.len()],
                verdict: None,
                settled: None,
            })
            .collect();
        Self {
            flow_id,
            repo_hash: repo_hash.into(),
            started: Instant::now(),
            packages: artifacts.iter().map(|n| n.data.name().to_string()).collect(),
            steps,
        }
    }

    fn current(&self, step: usize, artifact: usize) -> Option<&StepResult> {
        self.steps.get(step)?.artifacts.get(artifact)
    }

    /// Whether `event` moves an artifact-step pair forward.
    pub fn accepts(&self, event: &FlowEvent) -> bool {
        let Some((step, artifact, next)) = phase(event) else {
            return false;
        };
        matches!(self.current(step, artifact), Some(r) if r.execution_status().can_advance_to(next))
    }

    /// Fold an artifact-step event into the tree. Returns `false` (and
    /// changes nothing) for events that would not move the pair forward.
    pub fn apply(&mut self, event: &FlowEvent) -> bool {
        if !self.accepts(event) {
            return false;
        }
        let next = match event {
            FlowEvent::ArtifactStepScheduled { .. } => StepResult::Scheduled,
            FlowEvent::ArtifactStepRunning { .. } => StepResult::Running,
            FlowEvent::ArtifactStepFinished { outcome, .. } => StepResult::from(outcome.clone()),
            FlowEvent::StepFinished { .. } | FlowEvent::FlowFinished { .. } => return false,
        };
        let Some((step, artifact, _)) = phase(event) else {
            return false;
        };
        match self.steps.get_mut(step).and_then(|s| s.artifacts.get_mut(artifact)) {
            Some(slot) => {
                *slot = next;
                true
            }
            None => false,
        }
    }

    /// Remember why a step's global constraints skipped it, so the step's
    /// own result carries the verdict rather than a bare aggregate.
    pub fn record_verdict(&mut self, step: usize, verdict: AbortResult) {
        if let Some(s) = self.steps.get_mut(step) {
            s.verdict = Some(verdict);
        }
    }

    fn aggregate(&self, step: &StepState) -> StepResult {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = StepResult::aggregate(&step.artifacts, elapsed);
        match (&result, &step.verdict) {
            (StepResult::Aborted(_), Some(verdict)) => StepResult::Aborted(verdict.clone()),
            _ => result,
        }
    }

    /// Settle `step` if every one of its artifacts is terminal, returning its
    /// outcome. Returns `None` if it is still in flight or already settled.
    pub fn settle(&mut self, step: usize) -> Option<Outcome> {
        let state = self.steps.get(step)?;
        if state.settled.is_some() {
            return None;
        }
        let result = self.aggregate(state);
        let outcome = result.outcome()?;
        if let Some(s) = self.steps.get_mut(step) {
            s.settled = Some(result);
        }
        Some(outcome)
    }

    pub fn is_settled(&self, step: usize) -> bool {
        self.steps.get(step).is_some_and(|s| s.settled.is_some())
    }

    /// Whether every step has settled.
    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|s| s.settled.is_some())
    }

    pub fn step_result(&self, step: usize) -> Option<StepResult> {
        let state = self.steps.get(step)?;
        Some(state.settled.clone().unwrap_or_else(|| self.aggregate(state)))
    }

    pub fn artifact_step_result(&self, step: usize, artifact: usize) -> Option<&StepResult> {
        self.current(step, artifact)
    }

    /// The flow's own result: the aggregate over its steps.
    pub fn flow_result(&self) -> StepResult {
        let steps: Vec<StepResult> = (0..self.steps.len()).filter_map(|i| self.step_result(i)).collect();
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        StepResult::aggregate(&steps, elapsed)
    }

    pub fn report(&self) -> FlowReport {
        let by_step = self
            .steps
            .iter()
            .enumerate()
            .map(|(step_index, s)| StepResultOfArtifacts {
                step_index,
                step_info: s.info.clone(),
                step_result: s.settled.clone().unwrap_or_else(|| self.aggregate(s)),
                artifacts_result: s
                    .artifacts
                    .iter()
                    .zip(&self.packages)
                    .enumerate()
                    .map(|(artifact_index, (result, package_name))| UnitOfArtifact {
                        artifact_index,
                        package_name: package_name.clone(),
                        result: result.clone(),
                    })
                    .collect(),
            })
            .collect();

        let by_artifact = self
            .packages
            .iter()
            .enumerate()
            .map(|(artifact_index, package_name)| {
                let steps_result: Vec<UnitOfStep> = self
                    .steps
                    .iter()
                    .enumerate()
                    .filter_map(|(step_index, s)| {
                        let result = s.artifacts.get(artifact_index)?.clone();
                        Some(UnitOfStep { step_index, step_info: s.info.clone(), result })
                    })
                    .collect();
                let duration = steps_result.iter().map(|u| done_duration(&u.result)).sum();
                ArtifactResultOfSteps {
                    artifact_index,
                    package_name: package_name.clone(),
                    artifact_result: StepResult::aggregate(steps_result.iter().map(|u| &u.result), duration),
                    steps_result,
                }
            })
            .collect();

        FlowReport {
            flow_id: self.flow_id.clone(),
            repo_hash: self.repo_hash.clone(),
            flow_result: self.flow_result(),
            steps_result_of_artifacts_by_step: by_step,
            steps_result_of_artifacts_by_artifact: by_artifact,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
