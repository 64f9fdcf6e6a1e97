// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{packages, step_infos};
use proptest::prelude::*;
use sk_core::{aggregate_status, AbortStatus, ErrorInfo, Status};

fn state(steps: &[&str], pkgs: &[&str]) -> FlowState {
    FlowState::new(FlowId::new("F1"), "repo-1", &step_infos(steps, &[]), &packages(pkgs))
}

fn finished(step_index: usize, artifact_index: usize, outcome: Outcome) -> FlowEvent {
    FlowEvent::ArtifactStepFinished {
        flow_id: FlowId::new("F1"),
        step_index,
        step_id: sk_core::StepId::new("s"),
        artifact_index,
        artifact_hash: "h".into(),
        outcome,
    }
}

fn running(step_index: usize, artifact_index: usize) -> FlowEvent {
    FlowEvent::ArtifactStepRunning { flow_id: FlowId::new("F1"), step_index, artifact_index }
}

#[test]
fn lifecycle_only_moves_forward() {
    let mut s = state(&["build"], &["a"]);
    assert!(s.apply(&running(0, 0)));
    assert!(!s.apply(&running(0, 0)));
    assert!(s.apply(&finished(0, 0, Outcome::passed(3))));
    assert!(!s.apply(&finished(0, 0, Outcome::failed(1, vec![]))));
    assert!(!s.apply(&running(0, 0)));
    assert_eq!(s.artifact_step_result(0, 0).unwrap().status(), Some(Status::Passed));
}

#[test]
fn unknown_pairs_are_ignored() {
    let mut s = state(&["build"], &["a"]);
    assert!(!s.apply(&running(3, 0)));
    assert!(!s.apply(&running(0, 7)));
    assert!(!s.accepts(&FlowEvent::FlowFinished { flow_id: FlowId::new("F1"), outcome: Outcome::passed(0) }));
}

#[test]
fn step_settles_once_all_artifacts_terminal() {
    let mut s = state(&["build"], &["a", "b"]);
    s.apply(&finished(0, 0, Outcome::passed(3)));
    assert_eq!(s.settle(0), None);
    assert!(!s.is_finished());

    s.apply(&finished(0, 1, Outcome::skipped_as_failed(vec!["cached".into()])));
    let outcome = s.settle(0).unwrap();
    assert_eq!(outcome.execution_status(), ExecutionStatus::Done);
    assert_eq!(outcome.status(), Status::Failed);
    assert_eq!(s.settle(0), None);
    assert!(s.is_settled(0));
    assert!(s.is_finished());
}

#[test]
fn step_without_artifacts_settles_immediately() {
    let mut s = state(&["build"], &[]);
    let outcome = s.settle(0).unwrap();
    assert_eq!(outcome.execution_status(), ExecutionStatus::Aborted);
    assert_eq!(outcome.status(), Status::SkippedAsPassed);
}

#[test]
fn global_verdict_becomes_step_result() {
    let mut s = state(&["publish"], &["a", "b"]);
    let verdict = AbortResult::new(AbortStatus::SkippedAsPassed).with_note("step: \"publish\" is disabled");
    s.record_verdict(0, verdict.clone());
    for a in 0..2 {
        s.apply(&finished(0, a, Outcome::Aborted(verdict.clone())));
    }
    assert_eq!(s.settle(0), Some(Outcome::Aborted(verdict)));
}

#[test]
fn report_views_by_step_and_by_artifact() {
    let mut s = state(&["build", "test"], &["a", "b"]);
    s.apply(&finished(0, 0, Outcome::passed(10)));
    s.apply(&finished(0, 1, Outcome::passed(20)));
    s.apply(&finished(1, 0, Outcome::failed(5, vec![ErrorInfo::new("1 test failed")])));
    s.apply(&finished(1, 1, Outcome::skipped_as_passed(vec![])));
    s.settle(0);
    s.settle(1);

    let report = s.report();
    assert_eq!(report.status(), Some(Status::Failed));
    assert!(!report.is_success());
    assert_eq!(report.step("build").unwrap().step_result.status(), Some(Status::Passed));
    assert_eq!(report.artifact_step("test", "a").unwrap().status(), Some(Status::Failed));

    let b = &report.steps_result_of_artifacts_by_artifact[1];
    assert_eq!(b.package_name, "b");
    assert_eq!(b.artifact_result.status(), Some(Status::Passed));
    assert_eq!(b.steps_result.len(), 2);
    let a = &report.steps_result_of_artifacts_by_artifact[0];
    assert_eq!(a.artifact_result, StepResult::Done(sk_core::DoneResult {
        status: sk_core::DoneStatus::Failed,
        duration_ms: 15,
        notes: vec![],
        errors: vec![],
    }));

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["stepsResultOfArtifactsByStep"].is_array());
    assert_eq!(json["flowResult"]["status"], "failed");
}

fn outcome_strategy() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::passed(1)),
        Just(Outcome::failed(1, vec![])),
        Just(Outcome::skipped_as_passed(vec![])),
        Just(Outcome::skipped_as_failed(vec![])),
    ]
}

proptest! {
    #[test]
    fn flow_status_aggregates_step_statuses(
        outcomes in prop::collection::vec(prop::collection::vec(outcome_strategy(), 2), 1..5)
    ) {
        let names: Vec<String> = (0..outcomes.len()).map(|i| format!("s{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut s = state(&names, &["a", "b"]);
        for (step, row) in outcomes.iter().enumerate() {
            for (artifact, outcome) in row.iter().enumerate() {
                prop_assert!(s.apply(&finished(step, artifact, outcome.clone())));
            }
            prop_assert!(s.settle(step).is_some());
        }
        let step_statuses: Vec<Status> =
            (0..outcomes.len()).map(|i| s.step_result(i).unwrap().status().unwrap()).collect();
        prop_assert_eq!(s.flow_result().status(), Some(aggregate_status(step_statuses)));
    }
}
