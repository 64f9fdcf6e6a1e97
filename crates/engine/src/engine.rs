// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow driver.
//!
//! One runner task per step does the gating and dispatch; the driver owns
//! the flow's result tree and is the only place events are folded, persisted
//! and published. For every terminal artifact-step event the order is:
//! persist, publish externally, fold, publish internally. Descendant steps
//! therefore never see an ancestor settle before its results are readable.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::publish::Publisher;
use crate::queues::QueueRegistry;
use crate::runner::{FlowInputs, Progress, StepRunner};
use crate::state::FlowState;
use crate::step::{ResultScope, Step};
use sk_core::{Artifact, EventBus, FlowEvent, FlowId, FlowReport, Graph, Outcome, StepId};
use sk_queue::TaskQueue;
use sk_storage::{CachedResult, ImmutableCache, KeyValueStore};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tokio::time::Instant;
use tracing::Instrument;

/// One run of a pipeline over a repository snapshot.
pub struct Flow<S: KeyValueStore> {
    pub flow_id: FlowId,
    /// Hash of the repository snapshot the flow runs on.
    pub repo_hash: String,
    pub steps: Graph<Step<S>>,
    pub artifacts: Graph<Artifact>,
}

type RunnerExit = (usize, Result<Result<(), EngineError>, JoinError>);

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "runner panicked".to_string()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Step runners of one flow.
///
/// Each runner is spawned on its own task and watched from the join set, so
/// a panicking runner surfaces as a [`JoinError`] with the step it ran.
struct Runners {
    set: JoinSet<RunnerExit>,
    handles: Vec<AbortHandle>,
}

impl Runners {
    fn new() -> Self {
        Self { set: JoinSet::new(), handles: Vec::new() }
    }

    fn spawn<S: KeyValueStore>(&mut self, runner: StepRunner<S>, span: tracing::Span) {
        let index = runner.index;
        let handle = tokio::spawn(runner.run().instrument(span));
        self.handles.push(handle.abort_handle());
        self.set.spawn(async move { (index, handle.await) });
    }

    async fn join_next(&mut self) -> Option<RunnerExit> {
        match self.set.join_next().await? {
            Ok(exit) => Some(exit),
            // the watcher itself only fails when aborted
            Err(_) => None,
        }
    }

    fn abort_all(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
        self.set.abort_all();
    }
}

pub struct Engine<S: KeyValueStore, P: Publisher> {
    cache: ImmutableCache<S>,
    queues: QueueRegistry,
    publisher: P,
    config: EngineConfig,
}

impl<S: KeyValueStore, P: Publisher> Engine<S, P> {
    pub fn new(cache: ImmutableCache<S>, queues: QueueRegistry, publisher: P, config: EngineConfig) -> Self {
        Self { cache, queues, publisher, config }
    }

    pub fn cache(&self) -> &ImmutableCache<S> {
        &self.cache
    }

    pub fn queues(&self) -> &QueueRegistry {
        &self.queues
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve the queue of every step, in step order.
    ///
    /// A step naming an unregistered queue kind is a configuration error,
    /// reported before anything runs.
    pub fn validate(&self, steps: &Graph<Step<S>>) -> Result<Vec<Arc<dyn TaskQueue>>, EngineError> {
        steps.iter().map(|node| self.queues.resolve(&node.data.info, node.data.queue)).collect()
    }

    /// Run `flow` to completion and return its result tree.
    ///
    /// Fails only on configuration errors, a corrupt cache or a crashed
    /// runner. Step and task failures are part of the returned report.
    pub async fn run_flow(&self, flow: Flow<S>) -> Result<FlowReport, EngineError> {
        let span = tracing::info_span!("flow", flow_id = %flow.flow_id);
        self.drive(flow).instrument(span).await
    }

    /// Release every registered queue and drop expired cache entries.
    pub async fn cleanup(&self) {
        self.queues.cleanup().await;
        if let Err(err) = self.cache.cleanup().await {
            tracing::warn!(error = %err, "cache cleanup failed");
        }
    }

    async fn drive(&self, flow: Flow<S>) -> Result<FlowReport, EngineError> {
        let queues = self.validate(&flow.steps)?;
        let started = Instant::now();
        let step_infos = Arc::new(flow.steps.map(|node| node.data.info.clone()));
        let mut state = FlowState::new(flow.flow_id.clone(), &flow.repo_hash, &step_infos, &flow.artifacts);
        let inputs = Arc::new(FlowInputs {
            flow_id: flow.flow_id,
            repo_hash: flow.repo_hash,
            steps: flow.steps,
            step_infos: Arc::clone(&step_infos),
            artifacts: flow.artifacts,
            cache: self.cache.clone(),
        });
        tracing::info!(steps = inputs.steps.len(), artifacts = inputs.artifacts.len(), "flow started");

        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut runners = Runners::new();
        // without artifacts every step settles on its own below
        if !inputs.artifacts.is_empty() {
            for (index, queue) in queues.into_iter().enumerate() {
                let graph = Arc::clone(&step_infos);
                let ancestors = bus.subscribe(move |event: &FlowEvent| {
                    matches!(event, FlowEvent::StepFinished { step_index, .. }
                        if graph.is_recursive_ancestor(index, *step_index))
                });
                let name = step_infos.get(index).map(|n| n.data.step_name.clone()).unwrap_or_default();
                let runner =
                    StepRunner { inputs: Arc::clone(&inputs), index, queue, ancestors, progress: tx.clone() };
                runners.spawn(runner, tracing::info_span!("step", step = %name));
            }
        }
        drop(tx);

        for index in 0..inputs.steps.len() {
            self.settle_step(&inputs, &mut state, &bus, index).await;
        }

        while !state.is_finished() {
            tokio::select! {
                biased;
                Some(progress) = rx.recv() => match progress {
                    Progress::Verdict { step_index, verdict } => state.record_verdict(step_index, verdict),
                    Progress::Event(event) => self.handle_event(&inputs, &mut state, &bus, event).await,
                },
                Some((index, exit)) = runners.join_next() => {
                    if let Err(err) = check_exit(&inputs, index, exit) {
                        tracing::error!(error = %err, "flow aborted");
                        runners.abort_all();
                        return Err(err);
                    }
                }
                else => {
                    runners.abort_all();
                    return Err(EngineError::Stalled(inputs.flow_id.clone()));
                }
            }
        }
        // every step settled; any runner still alive has nothing left to report
        runners.abort_all();

        let flow_result = state.flow_result();
        if let Some(outcome) = flow_result.outcome() {
            tracing::info!(status = %outcome.status(), elapsed_ms = elapsed_ms(started), "flow finished");
            let event = FlowEvent::FlowFinished { flow_id: inputs.flow_id.clone(), outcome };
            self.publish_external(&event).await;
            bus.publish(event);
        }
        Ok(state.report())
    }

    async fn handle_event(
        &self,
        inputs: &FlowInputs<S>,
        state: &mut FlowState,
        bus: &EventBus<FlowEvent>,
        event: FlowEvent,
    ) {
        if !state.accepts(&event) {
            tracing::debug!(event = %event.log_summary(), "ignoring out-of-order event");
            return;
        }
        if let FlowEvent::ArtifactStepFinished { step_id, artifact_hash, outcome, .. } = &event {
            self.persist(inputs, step_id, Some(artifact_hash.as_str()), outcome).await;
            self.publish_external(&event).await;
        }
        tracing::debug!(event = %event.log_summary());
        let step_index = event.step_index();
        state.apply(&event);
        bus.publish(event);
        if let Some(index) = step_index {
            self.settle_step(inputs, state, bus, index).await;
        }
    }

    /// Emit `StepFinished` once every artifact of step `index` is terminal.
    async fn settle_step(
        &self,
        inputs: &FlowInputs<S>,
        state: &mut FlowState,
        bus: &EventBus<FlowEvent>,
        index: usize,
    ) {
        let Some(outcome) = state.settle(index) else {
            return;
        };
        let Some(step) = inputs.steps.get(index) else {
            return;
        };
        let info = &step.data.info;
        if step.data.result_scope == ResultScope::Step {
            self.persist(inputs, &info.step_id, None, &outcome).await;
        }
        tracing::info!(
            step = %info.step_name,
            execution_status = %outcome.execution_status(),
            status = %outcome.status(),
            "step finished"
        );
        let event = FlowEvent::StepFinished {
            flow_id: inputs.flow_id.clone(),
            step_index: index,
            step_id: info.step_id.clone(),
            outcome,
        };
        self.publish_external(&event).await;
        bus.publish(event);
    }

    /// Best-effort write of a result; a failed write never fails the flow.
    async fn persist(
        &self,
        inputs: &FlowInputs<S>,
        step_id: &StepId,
        artifact_hash: Option<&str>,
        outcome: &Outcome,
    ) {
        let result = CachedResult {
            flow_id: inputs.flow_id.clone(),
            repo_hash: inputs.repo_hash.clone(),
            outcome: outcome.clone(),
        };
        let ttl = self.config.cache_ttl;
        let written = match artifact_hash {
            Some(hash) => self.cache.set_artifact_step_result(step_id, hash, result, ttl).await,
            None => self.cache.set_step_result(step_id, result, ttl).await,
        };
        match written {
            Ok(true) => tracing::trace!(%step_id, artifact_hash, "result persisted"),
            Ok(false) => tracing::debug!(%step_id, artifact_hash, "kept earlier cached result"),
            Err(err) => tracing::warn!(%step_id, artifact_hash, error = %err, "failed to persist result"),
        }
    }

    async fn publish_external(&self, event: &FlowEvent) {
        let message = match serde_json::to_string(event) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(event = event.name(), error = %err, "failed to encode event");
                return;
            }
        };
        if let Err(err) = self.publisher.publish(&self.config.topic, message).await {
            tracing::warn!(event = event.name(), topic = %self.config.topic, error = %err, "failed to publish event");
        }
    }
}

fn check_exit<S: KeyValueStore>(
    inputs: &FlowInputs<S>,
    index: usize,
    exit: Result<Result<(), EngineError>, JoinError>,
) -> Result<(), EngineError> {
    match exit {
        Ok(result) => result,
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => {
            let step = inputs.steps.get(index).map(|n| n.data.info.step_name.clone()).unwrap_or_default();
            Err(EngineError::StepCrashed { step, message: panic_message(err.into_panic()) })
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
