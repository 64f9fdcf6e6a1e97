// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue backend specs
//!
//! The same flow shape runs unchanged on the worker pool and on the remote
//! build service; only the queue a step names differs.

use crate::prelude::*;
use sk_queue::{BuildState, FakeBuildService, InMemoryBroker, RemoteBuildQueue, Worker, WorkerPoolQueue};
use sk_storage::InMemoryKeyValueStore;
use tokio_util::sync::CancellationToken;

/// Short polling intervals so flows settle quickly.
const FAST: &str = r#"
topic = "ci-events"

[queue]
claim_poll_interval = "10ms"

[queue.unknown_event]
max_attempts = 50
delay = "10ms"
"#;

fn config() -> EngineConfig {
    EngineConfig::from_toml_str(FAST).unwrap()
}

fn flow<S: KeyValueStore>(repo: &Monorepo, step: Step<S>, packages: &[&str]) -> Flow<S> {
    Flow {
        flow_id: FlowId::new("F1"),
        repo_hash: "snapshot-1".to_string(),
        steps: steps(vec![step], &[]),
        artifacts: repo.artifacts(packages),
    }
}

#[tokio::test]
async fn worker_pool_spreads_artifacts_over_workers() {
    init_tracing();
    let repo = Monorepo::new();
    repo.write("a", "index.js", "a").write("b", "index.js", "b").write("c", "index.js", "c");
    let config = config();
    let runs = Runs::default();

    let broker = InMemoryBroker::new();
    let shutdown = CancellationToken::new();
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let handlers = HandlerRegistry::new().with("build", runs.handler());
            let worker = Worker::new(broker.clone(), handlers, config.queue.claim_poll_interval);
            tokio::spawn(worker.run(shutdown.clone()))
        })
        .collect();

    let publisher = RecordingPublisher::new();
    let queues = QueueRegistry::new().with(WorkerPoolQueue::new(broker.clone(), config.queue.clone()));
    let engine = Engine::new(ImmutableCache::new(InMemoryKeyValueStore::new()), queues, publisher.clone(), config);

    let build = Step::new(StepInfo::at_position("build", 0), QueueKind::WorkerPool);
    let report = engine.run_flow(flow(&repo, build, &["a", "b", "c"])).await.unwrap();

    assert!(report.is_success());
    let mut built = runs.of("build");
    built.sort();
    assert_eq!(built, vec!["a", "b", "c"]);
    assert!(publisher.calls().iter().all(|c| c.topic == "ci-events"));

    shutdown.cancel();
    for worker in workers {
        worker.await.unwrap().unwrap();
    }
    engine.cleanup().await;
}

#[tokio::test]
async fn remote_build_runs_one_batch_for_the_step() {
    init_tracing();
    let repo = Monorepo::new();
    repo.write("api", "Dockerfile", "FROM scratch").write("web", "Dockerfile", "FROM scratch");

    let service = FakeBuildService::new();
    service.announce_before_return(vec![BuildState::Working, BuildState::Success]);
    let queues = QueueRegistry::new().with(RemoteBuildQueue::new(service.clone(), config().queue));
    let engine =
        Engine::new(ImmutableCache::new(InMemoryKeyValueStore::new()), queues, RecordingPublisher::new(), config());

    let image = Step::new(StepInfo::at_position("image", 0), QueueKind::RemoteBuild).planner(TaskPlanner::SingleBatch);
    let report = engine.run_flow(flow(&repo, image, &["api", "web"])).await.unwrap();

    let started = service.started();
    assert_eq!(started.len(), 1);
    let payload: TaskPayload = serde_json::from_value(started[0].1.payload.clone()).unwrap();
    let names: Vec<_> = payload.artifacts.iter().map(|a| a.package_name.as_str()).collect();
    assert_eq!(names, vec!["api", "web"]);

    assert!(report.is_success());
    for package in ["api", "web"] {
        let result = report.artifact_step("image", package).unwrap();
        assert_eq!(result.execution_status(), ExecutionStatus::Done);
    }
    engine.cleanup().await;
}

#[tokio::test]
async fn remote_build_failure_fails_every_artifact_in_the_batch() {
    init_tracing();
    let repo = Monorepo::new();
    repo.write("api", "Dockerfile", "FROM nowhere").write("web", "Dockerfile", "FROM scratch");

    let service = FakeBuildService::new();
    service.announce_before_return(vec![BuildState::Failure { reason: "step 1/3 failed".to_string() }]);
    let queues = QueueRegistry::new().with(RemoteBuildQueue::new(service, config().queue));
    let engine =
        Engine::new(ImmutableCache::new(InMemoryKeyValueStore::new()), queues, RecordingPublisher::new(), config());

    let image = Step::new(StepInfo::at_position("image", 0), QueueKind::RemoteBuild).planner(TaskPlanner::SingleBatch);
    let report = engine.run_flow(flow(&repo, image, &["api", "web"])).await.unwrap();

    assert_eq!(report.status(), Some(Status::Failed));
    for package in ["api", "web"] {
        let result = report.artifact_step("image", package).unwrap();
        assert_eq!(result.status(), Some(Status::Failed));
        assert_eq!(result.outcome().unwrap().errors()[0].message, "step 1/3 failed");
    }
    engine.cleanup().await;
}
