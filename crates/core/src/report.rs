// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow report consumed by external tooling.

use crate::id::FlowId;
use crate::result::StepResult;
use crate::status::Status;
use crate::step::StepInfo;
use serde::{Deserialize, Serialize};

/// Result of one artifact within a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOfArtifact {
    pub artifact_index: usize,
    pub package_name: String,
    pub result: StepResult,
}

/// A step's own result plus the result of each of its artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResultOfArtifacts {
    pub step_index: usize,
    pub step_info: StepInfo,
    pub step_result: StepResult,
    pub artifacts_result: Vec<UnitOfArtifact>,
}

/// Result of one step for a given artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOfStep {
    pub step_index: usize,
    pub step_info: StepInfo,
    pub result: StepResult,
}

/// An artifact's aggregated result plus its result in each step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResultOfSteps {
    pub artifact_index: usize,
    pub package_name: String,
    pub artifact_result: StepResult,
    pub steps_result: Vec<UnitOfStep>,
}

/// The whole flow, viewed both by step and by artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowReport {
    pub flow_id: FlowId,
    pub repo_hash: String,
    pub flow_result: StepResult,
    pub steps_result_of_artifacts_by_step: Vec<StepResultOfArtifacts>,
    pub steps_result_of_artifacts_by_artifact: Vec<ArtifactResultOfSteps>,
}

impl FlowReport {
    pub fn status(&self) -> Option<Status> {
        self.flow_result.status()
    }

    /// Whether the flow finished without any failure.
    pub fn is_success(&self) -> bool {
        matches!(self.status(), Some(s) if !s.is_failure())
    }

    pub fn step(&self, step_name: &str) -> Option<&StepResultOfArtifacts> {
        self.steps_result_of_artifacts_by_step
            .iter()
            .find(|s| s.step_info.step_name == step_name)
    }

    /// Result of `step_name` on the package named `package_name`.
    pub fn artifact_step(&self, step_name: &str, package_name: &str) -> Option<&StepResult> {
        self.step(step_name)?
            .artifacts_result
            .iter()
            .find(|a| a.package_name == package_name)
            .map(|a| &a.result)
    }
}
