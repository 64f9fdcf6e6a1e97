// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("outer")]
struct Outer(#[source] Inner);

#[derive(Debug, thiserror::Error)]
#[error("inner")]
struct Inner;

#[test]
fn error_info_walks_source_chain() {
    let info = ErrorInfo::from_error(&Outer(Inner));
    assert_eq!(info.message, "outer");
    assert_eq!(info.chain, vec!["inner".to_string()]);
    assert_eq!(info.to_string(), "outer: inner");
}

#[test]
fn done_outcome_wire_shape() {
    let outcome = Outcome::passed(42).with_note("built");
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(
        value,
        json!({
            "executionStatus": "done",
            "status": "passed",
            "durationMs": 42,
            "notes": ["built"],
            "errors": [],
        })
    );
}

#[test]
fn aborted_outcome_wire_shape() {
    let outcome = Outcome::skipped_as_failed(vec!["task-timeout".into()]);
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["executionStatus"], "aborted");
    assert_eq!(value["status"], "skippedAsFailed");
    assert_eq!(value["notes"], json!(["task-timeout"]));
}

#[test]
fn aborted_outcome_rejects_done_status() {
    let raw = json!({ "executionStatus": "aborted", "status": "passed" });
    assert!(serde_json::from_value::<Outcome>(raw).is_err());
}

#[test]
fn outcome_accessors() {
    let outcome = Outcome::failed(7, vec![ErrorInfo::new("boom")]);
    assert_eq!(outcome.status(), Status::Failed);
    assert_eq!(outcome.execution_status(), ExecutionStatus::Done);
    assert_eq!(outcome.errors().len(), 1);
    assert!(outcome.notes().is_empty());
}

#[test]
fn aggregate_of_running_children_is_running() {
    let children = [StepResult::Scheduled, StepResult::from(Outcome::passed(1))];
    assert_eq!(StepResult::aggregate(&children, 5), StepResult::Running);
}

#[test]
fn aggregate_of_done_children_uses_parent_duration() {
    let children = [
        StepResult::from(Outcome::passed(1)),
        StepResult::from(Outcome::skipped_as_failed(vec![])),
    ];
    let parent = StepResult::aggregate(&children, 99);
    match parent {
        StepResult::Done(r) => {
            assert_eq!(r.status, DoneStatus::Failed);
            assert_eq!(r.duration_ms, 99);
        }
        other => panic!("expected done, got {other:?}"),
    }
}

#[test]
fn aggregate_of_skipped_children_is_aborted() {
    let children = [
        StepResult::from(Outcome::skipped_as_passed(vec![])),
        StepResult::from(Outcome::skipped_as_passed(vec![])),
    ];
    let parent = StepResult::aggregate(&children, 0);
    assert_eq!(parent.execution_status(), ExecutionStatus::Aborted);
    assert_eq!(parent.status(), Some(Status::SkippedAsPassed));
}

#[test]
fn aggregate_of_nothing_is_skipped_as_passed() {
    let parent = StepResult::aggregate(std::iter::empty(), 0);
    assert_eq!(parent.status(), Some(Status::SkippedAsPassed));
}
