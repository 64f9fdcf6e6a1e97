// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental build specs
//!
//! Each run opens the on-disk cache afresh, the way separate CI jobs would,
//! and only packages whose contents changed are dispatched again.

use crate::prelude::*;

fn pipeline() -> Graph<Step<FileKeyValueStore>> {
    steps(
        vec![
            Step::new(StepInfo::at_position("build", 0), QueueKind::LocalSequential)
                .per_artifact(SkipIfStepResultInCache::passed("build")),
            Step::new(StepInfo::at_position("test", 1), QueueKind::LocalSequential)
                .global(SkipIfParentStepFailed)
                .per_artifact(SkipIfStepResultInCache::failed("test"))
                .per_artifact(SkipIfStepResultInCache::passed("test")),
        ],
        &[(0, 1)],
    )
}

/// Test handler that fails packages whose `index.js` reads `broken`.
fn test_handler(runs: &Runs) -> impl TaskHandler {
    let runs = runs.clone();
    handler_fn(move |task: TaskInfo| {
        let runs = runs.clone();
        async move {
            let payload: TaskPayload = serde_json::from_value(task.payload)?;
            for artifact in payload.artifacts {
                runs.record(&payload.step.step_name, &artifact.package_name);
                let source = tokio::fs::read_to_string(artifact.absolute_path.join("index.js")).await?;
                if source.trim() == "broken" {
                    return Err::<TaskOutput, HandlerError>(format!("{} tests failed", artifact.package_name).into());
                }
            }
            Ok(TaskOutput::default())
        }
    })
}

async fn try_run(repo: &Monorepo, runs: &Runs, flow_id: &str) -> Result<FlowReport, EngineError> {
    let store = FileKeyValueStore::open(repo.cache_dir()).await.unwrap();
    let handlers = HandlerRegistry::new().with("build", runs.handler()).with("test", test_handler(runs));
    let queues = QueueRegistry::new().with(LocalSequentialQueue::new(handlers, QueueConfig::default()));
    let engine = Engine::new(ImmutableCache::new(store), queues, RecordingPublisher::new(), EngineConfig::default());

    let flow = Flow {
        flow_id: FlowId::new(flow_id),
        repo_hash: format!("{flow_id}-snapshot"),
        steps: pipeline(),
        artifacts: repo.artifacts(&["api", "web"]),
    };
    let report = engine.run_flow(flow).await;
    engine.cleanup().await;
    report
}

async fn run(repo: &Monorepo, runs: &Runs, flow_id: &str) -> FlowReport {
    try_run(repo, runs, flow_id).await.unwrap()
}

#[tokio::test]
async fn only_changed_packages_are_rebuilt() {
    init_tracing();
    let repo = Monorepo::new();
    repo.write("api", "index.js", "v1").write("web", "index.js", "v1");
    let runs = Runs::default();

    let first = run(&repo, &runs, "F1").await;
    assert!(first.is_success());
    assert_eq!(runs.of("build"), vec!["api", "web"]);

    repo.write("web", "index.js", "v2");
    let second = run(&repo, &runs, "F2").await;
    assert_eq!(runs.of("build"), vec!["api", "web", "web"]);
    assert_eq!(runs.of("test"), vec!["api", "web", "web"]);
    assert_eq!(second.artifact_step("build", "api").unwrap().status(), Some(Status::SkippedAsPassed));
    assert_eq!(second.artifact_step("build", "web").unwrap().status(), Some(Status::Passed));
    assert!(second.is_success());

    let third = run(&repo, &runs, "F3").await;
    assert_eq!(runs.of("build").len(), 3, "nothing changed, nothing dispatched");
    let build = &third.step("build").unwrap().step_result;
    assert_eq!(build.execution_status(), ExecutionStatus::Aborted);
    assert_eq!(build.status(), Some(Status::SkippedAsPassed));
}

#[tokio::test]
async fn failures_are_remembered_until_the_package_changes() {
    init_tracing();
    let repo = Monorepo::new();
    repo.write("api", "index.js", "v1").write("web", "index.js", "broken");
    let runs = Runs::default();

    let first = run(&repo, &runs, "F1").await;
    assert_eq!(first.status(), Some(Status::Failed));
    assert_eq!(first.artifact_step("test", "web").unwrap().status(), Some(Status::Failed));

    let second = run(&repo, &runs, "F2").await;
    assert_eq!(runs.of("test"), vec!["api", "web"], "second run dispatched no tests");
    let web = second.artifact_step("test", "web").unwrap();
    assert_eq!(web.status(), Some(Status::SkippedAsFailed));
    assert_eq!(web.outcome().unwrap().notes(), ["step: \"test\" failed in flow: F1".to_string()]);
    assert_eq!(second.status(), Some(Status::Failed));

    repo.write("web", "index.js", "fixed");
    let third = run(&repo, &runs, "F3").await;
    assert_eq!(runs.of("test"), vec!["api", "web", "web"]);
    assert!(third.is_success());
}

#[tokio::test]
async fn corrupt_cache_file_aborts_the_flow() {
    init_tracing();
    let repo = Monorepo::new();
    repo.write("api", "index.js", "v1").write("web", "index.js", "v1");
    let runs = Runs::default();
    assert!(run(&repo, &runs, "F1").await.is_success());

    for entry in std::fs::read_dir(repo.cache_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "json") {
            std::fs::write(path, "{truncated").unwrap();
        }
    }

    let err = try_run(&repo, &runs, "F2").await.err().unwrap();
    assert!(matches!(err, EngineError::Cache(ref e) if e.is_fatal()), "{err}");
    assert_eq!(runs.of("build").len(), 2, "nothing dispatched after the corrupt read");
}
