// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::constraints::{SkipAsPassedIfStepDisabled, SkipIfParentStepFailed};
use crate::test_helpers::packages;
use sk_core::GraphBuilder;
use sk_storage::FakeKeyValueStore;

#[yare::parameterized(
    one_per_artifact_empty = { TaskPlanner::OnePerArtifact, &[], &[] },
    one_per_artifact       = { TaskPlanner::OnePerArtifact, &[0, 2, 3], &[&[0], &[2], &[3]] },
    single_batch_empty     = { TaskPlanner::SingleBatch, &[], &[] },
    single_batch           = { TaskPlanner::SingleBatch, &[0, 2, 3], &[&[0, 2, 3]] },
)]
fn planning(planner: TaskPlanner, artifacts: &[usize], expected: &[&[usize]]) {
    let expected: Vec<Vec<usize>> = expected.iter().map(|b| b.to_vec()).collect();
    assert_eq!(planner.plan(artifacts), expected);
}

#[test]
fn builder_collects_constraints() {
    let step: Step<FakeKeyValueStore> = Step::new(StepInfo::at_position("test", 1), QueueKind::WorkerPool)
        .global(SkipAsPassedIfStepDisabled { enabled: true })
        .global(SkipIfParentStepFailed)
        .per_artifact(SkipAsPassedIfStepDisabled { enabled: true })
        .planner(TaskPlanner::SingleBatch)
        .result_scope(ResultScope::Step);
    assert_eq!(step.task_name, "test");
    assert_eq!(step.global_constraints.len(), 2);
    assert_eq!(step.artifact_constraints.len(), 1);
    let debug = format!("{step:?}");
    assert!(debug.contains("skip-if-parent-step-failed"));
}

#[test]
fn task_options_carry_group_and_payload() {
    let step: Step<FakeKeyValueStore> =
        Step::new(StepInfo::at_position("build", 0), QueueKind::LocalSequential).task_name("npm-build").timeout(Duration::from_secs(90));
    let artifacts = packages(&["a", "b"]);
    let flow_id = FlowId::new("F1");
    let batch: Vec<&Node<Artifact>> = artifacts.iter().collect();

    let options = step.task_options(&flow_id, "repo-1", &batch).unwrap();
    assert_eq!(options.task_name, "npm-build");
    assert_eq!(options.group, format!("F1:{}", step.info.step_id));
    assert_eq!(options.timeout, Some(Duration::from_secs(90)));

    let payload: TaskPayload = serde_json::from_value(options.payload).unwrap();
    assert_eq!(payload.flow_id, flow_id);
    assert_eq!(payload.step.step_name, "build");
    let names: Vec<_> = payload.artifacts.iter().map(|a| (a.index, a.package_name.as_str(), a.content_hash.as_str())).collect();
    assert_eq!(names, vec![(0, "a", "hash-a"), (1, "b", "hash-b")]);
}

#[cfg(unix)]
#[test]
fn unencodable_payload_is_an_error() {
    use std::os::unix::ffi::OsStrExt;

    let step: Step<FakeKeyValueStore> = Step::new(StepInfo::at_position("build", 0), QueueKind::LocalSequential);
    let mut b = GraphBuilder::new();
    b.add_node(Artifact::builder().absolute_path(std::ffi::OsStr::from_bytes(b"/repo/\xff")).build());
    let artifacts = b.build().unwrap();
    let batch: Vec<&Node<Artifact>> = artifacts.iter().collect();

    assert!(step.task_options(&FlowId::new("F1"), "repo-1", &batch).is_err());
}
