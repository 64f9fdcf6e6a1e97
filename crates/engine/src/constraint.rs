// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skip decisions.
//!
//! A step carries two ordered constraint lists: global ones gate the whole
//! step, per-artifact ones gate the step on a single artifact. The first
//! constraint that answers [`ConstraintResult::ShouldSkip`] decides. Both
//! [`ConstraintResult::ShouldRun`] and [`ConstraintResult::IgnoreThisConstraint`]
//! defer to the next constraint, so a later skip still wins.

use crate::error::ConstraintError;
use async_trait::async_trait;
use sk_core::{AbortResult, AbortStatus, Artifact, FlowId, Graph, Node, Outcome, StepInfo};
use sk_storage::{ImmutableCache, KeyValueStore};
use std::collections::HashMap;
use std::sync::Arc;

/// What a constraint can see while it decides.
pub struct ConstraintContext<'a, S: KeyValueStore> {
    pub flow_id: &'a FlowId,
    pub repo_hash: &'a str,
    pub step_index: usize,
    pub step: &'a StepInfo,
    pub steps: &'a Graph<StepInfo>,
    pub artifacts: &'a Graph<Artifact>,
    pub cache: &'a ImmutableCache<S>,
    /// Outcomes of this step's recursive ancestors in the current flow.
    pub ancestors: &'a HashMap<usize, Outcome>,
}

impl<S: KeyValueStore> ConstraintContext<'_, S> {
    pub fn find_step(&self, step_name: &str) -> Option<&Node<StepInfo>> {
        self.steps.find(|s| s.step_name == step_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintResult {
    ShouldRun,
    ShouldSkip(AbortResult),
    IgnoreThisConstraint { notes: Vec<String> },
}

impl ConstraintResult {
    pub fn skip_as_passed(note: impl Into<String>) -> Self {
        ConstraintResult::ShouldSkip(AbortResult::new(AbortStatus::SkippedAsPassed).with_note(note))
    }

    pub fn skip_as_failed(note: impl Into<String>) -> Self {
        ConstraintResult::ShouldSkip(AbortResult::new(AbortStatus::SkippedAsFailed).with_note(note))
    }

    pub fn ignore(note: impl Into<String>) -> Self {
        ConstraintResult::IgnoreThisConstraint { notes: vec![note.into()] }
    }
}

#[async_trait]
pub trait Constraint<S: KeyValueStore>: Send + Sync {
    fn name(&self) -> &str;

    /// `artifact` is `None` when the constraint gates the whole step.
    async fn evaluate(
        &self,
        ctx: &ConstraintContext<'_, S>,
        artifact: Option<&Node<Artifact>>,
    ) -> Result<ConstraintResult, ConstraintError>;
}

/// Final decision over a constraint list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Run,
    Skip(AbortResult),
}

/// Evaluate `constraints` in declaration order.
///
/// Errors are returned as-is; the caller decides whether they fail the unit
/// or abort the flow.
pub async fn evaluate_constraints<S: KeyValueStore>(
    constraints: &[Arc<dyn Constraint<S>>],
    ctx: &ConstraintContext<'_, S>,
    artifact: Option<&Node<Artifact>>,
) -> Result<Verdict, ConstraintError> {
    for constraint in constraints {
        match constraint.evaluate(ctx, artifact).await? {
            ConstraintResult::ShouldRun => {
                tracing::debug!(constraint = constraint.name(), "constraint votes to run");
            }
            ConstraintResult::ShouldSkip(result) => {
                tracing::debug!(
                    constraint = constraint.name(),
                    status = %sk_core::Status::from(result.status),
                    notes = ?result.notes,
                    "constraint skips"
                );
                return Ok(Verdict::Skip(result));
            }
            ConstraintResult::IgnoreThisConstraint { notes } => {
                tracing::debug!(constraint = constraint.name(), ?notes, "constraint not applicable");
            }
        }
    }
    Ok(Verdict::Run)
}

#[cfg(test)]
#[path = "constraint_tests.rs"]
mod tests;
