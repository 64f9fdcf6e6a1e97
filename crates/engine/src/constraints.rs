// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical constraints.

use crate::constraint::{Constraint, ConstraintContext, ConstraintResult};
use crate::error::ConstraintError;
use async_trait::async_trait;
use sk_core::{AbortResult, AbortStatus, Artifact, FlowId, Node, Status, TargetType};
use sk_storage::{CachedResult, KeyValueStore};
use std::collections::HashSet;

/// Which cached outcome a [`SkipIfStepResultInCache`] reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedVerdict {
    /// `failed` or `skippedAsFailed`; skips as failed.
    Failed,
    /// `passed` or `skippedAsPassed`; skips as passed.
    Passed,
}

impl CachedVerdict {
    fn matches(self, status: Status) -> bool {
        match self {
            CachedVerdict::Failed => status.is_failure(),
            CachedVerdict::Passed => !status.is_failure(),
        }
    }

    fn skip_status(self) -> AbortStatus {
        match self {
            CachedVerdict::Failed => AbortStatus::SkippedAsFailed,
            CachedVerdict::Passed => AbortStatus::SkippedAsPassed,
        }
    }
}

sk_core::simple_display! {
    CachedVerdict {
        Failed => "failed",
        Passed => "passed",
    }
}

/// Which cache entries of the looked-up step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupScope {
    /// The step-scoped entry, keyed by step id alone.
    Step,
    /// The entry for the artifact being gated.
    Artifact,
    /// The entries for every artifact of the flow.
    AllArtifacts,
}

/// Skip when a named step's cached result shows the configured verdict.
///
/// With [`LookupScope::AllArtifacts`] a `Failed` verdict needs one matching
/// entry, while a `Passed` verdict needs a passing entry for every artifact.
#[derive(Debug, Clone)]
pub struct SkipIfStepResultInCache {
    step_name: String,
    verdict: CachedVerdict,
    scope: LookupScope,
    skip_as_passed_if_step_not_exists: bool,
}

impl SkipIfStepResultInCache {
    pub const NAME: &'static str = "skip-if-step-result-in-cache";

    pub fn new(step_name: impl Into<String>, verdict: CachedVerdict) -> Self {
        Self {
            step_name: step_name.into(),
            verdict,
            scope: LookupScope::Artifact,
            skip_as_passed_if_step_not_exists: true,
        }
    }

    /// Skip as failed if `step_name` failed in the cache.
    pub fn failed(step_name: impl Into<String>) -> Self {
        Self::new(step_name, CachedVerdict::Failed)
    }

    /// Skip as passed if `step_name` passed in the cache.
    pub fn passed(step_name: impl Into<String>) -> Self {
        Self::new(step_name, CachedVerdict::Passed)
    }

    pub fn scope(mut self, scope: LookupScope) -> Self {
        self.scope = scope;
        self
    }

    /// When false, a step missing from the flow skips as failed instead of
    /// being ignored.
    pub fn skip_as_passed_if_step_not_exists(mut self, value: bool) -> Self {
        self.skip_as_passed_if_step_not_exists = value;
        self
    }
}

#[async_trait]
impl<S: KeyValueStore> Constraint<S> for SkipIfStepResultInCache {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn evaluate(
        &self,
        ctx: &ConstraintContext<'_, S>,
        artifact: Option<&Node<Artifact>>,
    ) -> Result<ConstraintResult, ConstraintError> {
        let name = &self.step_name;
        let Some(step) = ctx.find_step(name) else {
            if self.skip_as_passed_if_step_not_exists {
                return Ok(ConstraintResult::ignore(format!("step: \"{name}\" is not part of this flow")));
            }
            return Ok(ConstraintResult::skip_as_failed(format!("step: \"{name}\" does not exist in this flow")));
        };
        let step_id = &step.data.step_id;

        let (results, expected) = match self.scope {
            LookupScope::Step => (ctx.cache.query_step_result(step_id, ctx.flow_id).await?, 1),
            LookupScope::Artifact => {
                let artifact =
                    artifact.ok_or_else(|| ConstraintError::ArtifactRequired(Self::NAME.into()))?;
                let hashes = [artifact.data.content_hash.as_str()];
                (ctx.cache.query_artifact_step_results(step_id, hashes, ctx.flow_id).await?, 1)
            }
            LookupScope::AllArtifacts => {
                fn content_hash(a: &Node<Artifact>) -> &str {
                    a.data.content_hash.as_str()
                }
                let hashes = ctx.artifacts.iter().map(content_hash);
                let results = ctx.cache.query_artifact_step_results(step_id, hashes, ctx.flow_id).await?;
                (results, ctx.artifacts.len())
            }
        };

        if results.is_empty() {
            return Ok(ConstraintResult::ignore(format!("step: \"{name}\" has no cached result")));
        }
        let matching: Vec<&CachedResult> =
            results.iter().filter(|r| self.verdict.matches(r.outcome.status())).collect();
        let decided = match self.verdict {
            CachedVerdict::Failed => !matching.is_empty(),
            CachedVerdict::Passed => matching.len() == results.len() && results.len() >= expected,
        };
        if !decided {
            return Ok(ConstraintResult::ignore(format!(
                "step: \"{name}\" has no {} result in cache",
                self.verdict
            )));
        }

        let note = format!(
            "step: \"{name}\" {} in {}",
            self.verdict,
            describe_flows(matching.iter().map(|r| &r.flow_id), ctx.flow_id)
        );
        Ok(ConstraintResult::ShouldSkip(AbortResult::new(self.verdict.skip_status()).with_note(note)))
    }
}

/// Human-readable list of the flows that produced a result, e.g.
/// `this flow and flow: F1` or `flow: F1 and 2 more flows`.
pub fn describe_flows<'a>(flows: impl IntoIterator<Item = &'a FlowId>, current: &FlowId) -> String {
    let mut seen = HashSet::new();
    let mut this_flow = false;
    let mut others = Vec::new();
    for flow in flows {
        if !seen.insert(flow) {
            continue;
        }
        if flow == current {
            this_flow = true;
        } else {
            others.push(flow);
        }
    }

    let mut parts = Vec::new();
    if this_flow {
        parts.push("this flow".to_string());
    }
    match others.as_slice() {
        [] => {}
        [only] => parts.push(format!("flow: {only}")),
        [first, second] => {
            parts.push(format!("flow: {first}"));
            parts.push(format!("flow: {second}"));
        }
        [first, rest @ ..] => {
            parts.push(format!("flow: {first}"));
            parts.push(format!("{} more flows", rest.len()));
        }
    }
    parts.join(" and ")
}

/// Skip as passed for artifacts that do not build `target`.
#[derive(Debug, Clone)]
pub struct SkipAsPassedIfTargetTypeNotSupported {
    pub target: TargetType,
}

impl SkipAsPassedIfTargetTypeNotSupported {
    pub const NAME: &'static str = "skip-as-passed-if-target-type-not-supported";
}

#[async_trait]
impl<S: KeyValueStore> Constraint<S> for SkipAsPassedIfTargetTypeNotSupported {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn evaluate(
        &self,
        _ctx: &ConstraintContext<'_, S>,
        artifact: Option<&Node<Artifact>>,
    ) -> Result<ConstraintResult, ConstraintError> {
        let artifact = artifact.ok_or_else(|| ConstraintError::ArtifactRequired(Self::NAME.into()))?;
        if artifact.data.supports(self.target) {
            return Ok(ConstraintResult::ignore(format!("target type {} supported", self.target)));
        }
        Ok(ConstraintResult::skip_as_passed(format!(
            "package: \"{}\" does not support target type: {}",
            artifact.data.name(),
            self.target
        )))
    }
}

/// Skip as passed when the step is switched off in configuration.
#[derive(Debug, Clone)]
pub struct SkipAsPassedIfStepDisabled {
    pub enabled: bool,
}

impl SkipAsPassedIfStepDisabled {
    pub const NAME: &'static str = "skip-as-passed-if-step-disabled";
}

#[async_trait]
impl<S: KeyValueStore> Constraint<S> for SkipAsPassedIfStepDisabled {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn evaluate(
        &self,
        ctx: &ConstraintContext<'_, S>,
        _artifact: Option<&Node<Artifact>>,
    ) -> Result<ConstraintResult, ConstraintError> {
        if self.enabled {
            return Ok(ConstraintResult::ignore("step enabled"));
        }
        Ok(ConstraintResult::skip_as_passed(format!("step: \"{}\" is disabled", ctx.step.step_name)))
    }
}

/// Skip as passed for packages the user asked to leave out.
#[derive(Debug, Clone, Default)]
pub struct SkipAsPassedIfArtifactIgnored {
    ignored: HashSet<String>,
}

impl SkipAsPassedIfArtifactIgnored {
    pub const NAME: &'static str = "skip-as-passed-if-artifact-ignored";

    pub fn new<I, T>(package_names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self { ignored: package_names.into_iter().map(Into::into).collect() }
    }
}

#[async_trait]
impl<S: KeyValueStore> Constraint<S> for SkipAsPassedIfArtifactIgnored {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn evaluate(
        &self,
        _ctx: &ConstraintContext<'_, S>,
        artifact: Option<&Node<Artifact>>,
    ) -> Result<ConstraintResult, ConstraintError> {
        let artifact = artifact.ok_or_else(|| ConstraintError::ArtifactRequired(Self::NAME.into()))?;
        let name = artifact.data.name();
        if self.ignored.contains(name) {
            return Ok(ConstraintResult::skip_as_passed(format!("package: \"{name}\" is ignored")));
        }
        Ok(ConstraintResult::ignore(format!("package: \"{name}\" is not ignored")))
    }
}

/// Skip as failed when a recursive ancestor step of this flow ended
/// `failed` or `skippedAsFailed`.
#[derive(Debug, Clone, Default)]
pub struct SkipIfParentStepFailed;

impl SkipIfParentStepFailed {
    pub const NAME: &'static str = "skip-if-parent-step-failed";
}

#[async_trait]
impl<S: KeyValueStore> Constraint<S> for SkipIfParentStepFailed {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn evaluate(
        &self,
        ctx: &ConstraintContext<'_, S>,
        _artifact: Option<&Node<Artifact>>,
    ) -> Result<ConstraintResult, ConstraintError> {
        let mut failed: Vec<usize> =
            ctx.ancestors.iter().filter(|(_, o)| o.status().is_failure()).map(|(&i, _)| i).collect();
        if failed.is_empty() {
            return Ok(ConstraintResult::ignore("no parent step failed"));
        }
        failed.sort_unstable();
        let mut result = AbortResult::new(AbortStatus::SkippedAsFailed);
        for index in failed {
            let name = ctx.steps.get(index).map_or("?", |n| n.data.step_name.as_str());
            result = result.with_note(format!("parent step: \"{name}\" failed"));
        }
        Ok(ConstraintResult::ShouldSkip(result))
    }
}

#[cfg(test)]
#[path = "constraints_tests.rs"]
mod tests;
