// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by the engine's unit tests.

use crate::constraint::{Constraint, ConstraintContext, ConstraintResult};
use crate::error::ConstraintError;
use async_trait::async_trait;
use sk_core::{Artifact, FlowId, Graph, GraphBuilder, Node, Outcome, PackageManifest, StepInfo};
use sk_storage::{CachedResult, FakeKeyValueStore, ImmutableCache};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const TTL: Duration = Duration::from_secs(3600);

/// Packages with no dependencies between them; `hash-<name>` is each hash.
pub(crate) fn packages(names: &[&str]) -> Graph<Artifact> {
    let mut b = GraphBuilder::new();
    for name in names {
        b.add_node(
            Artifact::builder()
                .relative_path(format!("packages/{name}"))
                .absolute_path(format!("/repo/packages/{name}"))
                .content_hash(format!("hash-{name}"))
                .manifest(PackageManifest::named(*name))
                .build(),
        );
    }
    b.build().unwrap()
}

/// Steps named `names` at their positions, linked by `(parent, child)` edges.
pub(crate) fn step_infos(names: &[&str], edges: &[(usize, usize)]) -> Graph<StepInfo> {
    let mut b = GraphBuilder::new();
    for (i, name) in names.iter().enumerate() {
        b.add_node(StepInfo::at_position(name, i));
    }
    for &(parent, child) in edges {
        b.add_edge(parent, child);
    }
    b.build().unwrap()
}

pub(crate) struct Fixture {
    pub flow_id: FlowId,
    pub steps: Graph<StepInfo>,
    pub artifacts: Graph<Artifact>,
    pub store: FakeKeyValueStore,
    pub cache: ImmutableCache<FakeKeyValueStore>,
    pub ancestors: HashMap<usize, Outcome>,
}

impl Fixture {
    pub fn new(steps: Graph<StepInfo>, artifacts: Graph<Artifact>) -> Self {
        let store = FakeKeyValueStore::new();
        Self {
            flow_id: FlowId::new("F2"),
            steps,
            artifacts,
            cache: ImmutableCache::new(store.clone()),
            store,
            ancestors: HashMap::new(),
        }
    }

    pub fn ctx(&self, step_index: usize) -> ConstraintContext<'_, FakeKeyValueStore> {
        ConstraintContext {
            flow_id: &self.flow_id,
            repo_hash: "repo-1",
            step_index,
            step: &self.steps.get(step_index).unwrap().data,
            steps: &self.steps,
            artifacts: &self.artifacts,
            cache: &self.cache,
            ancestors: &self.ancestors,
        }
    }

    pub fn artifact(&self, index: usize) -> &Node<Artifact> {
        self.artifacts.get(index).unwrap()
    }

    /// Record `outcome` for step `step_name` on artifact `hash`, as flow `flow`.
    pub async fn cache_artifact_result(&self, step_name: &str, hash: &str, flow: &str, outcome: Outcome) {
        let step_id = &self.steps.find(|s| s.step_name == step_name).unwrap().data.step_id;
        let result = CachedResult { flow_id: FlowId::new(flow), repo_hash: "repo-0".into(), outcome };
        assert!(self.cache.set_artifact_step_result(step_id, hash, result, TTL).await.unwrap());
    }

    pub async fn cache_step_result(&self, step_name: &str, flow: &str, outcome: Outcome) {
        let step_id = &self.steps.find(|s| s.step_name == step_name).unwrap().data.step_id;
        let result = CachedResult { flow_id: FlowId::new(flow), repo_hash: "repo-0".into(), outcome };
        assert!(self.cache.set_step_result(step_id, result, TTL).await.unwrap());
    }
}

/// Constraint answering a fixed result and counting evaluations.
pub(crate) struct Scripted {
    pub name: &'static str,
    pub answer: Result<ConstraintResult, String>,
    pub calls: AtomicUsize,
}

impl Scripted {
    pub fn new(name: &'static str, answer: ConstraintResult) -> Self {
        Self { name, answer: Ok(answer), calls: AtomicUsize::new(0) }
    }

    pub fn failing(name: &'static str, message: &str) -> Self {
        Self { name, answer: Err(message.to_string()), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: sk_storage::KeyValueStore> Constraint<S> for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn evaluate(
        &self,
        _ctx: &ConstraintContext<'_, S>,
        _artifact: Option<&Node<Artifact>>,
    ) -> Result<ConstraintResult, ConstraintError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(ConstraintError::Failed)
    }
}
