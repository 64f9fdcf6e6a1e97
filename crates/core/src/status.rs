// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle phases, outcome classes, and their bottom-up aggregation.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a unit of work.
///
/// Transitions are monotonic: `scheduled → running → (done | aborted)`.
/// `running` may be skipped only when the unit is aborted before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    Scheduled,
    Running,
    Done,
    Aborted,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Done | ExecutionStatus::Aborted)
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_advance_to(self, next: ExecutionStatus) -> bool {
        !self.is_terminal() && next > self
    }
}

crate::simple_display! {
    ExecutionStatus {
        Scheduled => "scheduled",
        Running => "running",
        Done => "done",
        Aborted => "aborted",
    }
}

/// Outcome of a unit of work, defined once its lifecycle is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Passed,
    Failed,
    SkippedAsPassed,
    SkippedAsFailed,
}

impl Status {
    /// `failed` or `skippedAsFailed`.
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed | Status::SkippedAsFailed)
    }
}

crate::simple_display! {
    Status {
        Passed => "passed",
        Failed => "failed",
        SkippedAsPassed => "skippedAsPassed",
        SkippedAsFailed => "skippedAsFailed",
    }
}

/// Outcome of work that actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoneStatus {
    Passed,
    Failed,
}

/// Outcome of work that was skipped or could not be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbortStatus {
    SkippedAsPassed,
    SkippedAsFailed,
}

impl From<DoneStatus> for Status {
    fn from(s: DoneStatus) -> Self {
        match s {
            DoneStatus::Passed => Status::Passed,
            DoneStatus::Failed => Status::Failed,
        }
    }
}

impl From<AbortStatus> for Status {
    fn from(s: AbortStatus) -> Self {
        match s {
            AbortStatus::SkippedAsPassed => Status::SkippedAsPassed,
            AbortStatus::SkippedAsFailed => Status::SkippedAsFailed,
        }
    }
}

impl TryFrom<Status> for DoneStatus {
    type Error = Status;

    fn try_from(s: Status) -> Result<Self, Self::Error> {
        match s {
            Status::Passed => Ok(DoneStatus::Passed),
            Status::Failed => Ok(DoneStatus::Failed),
            other => Err(other),
        }
    }
}

impl TryFrom<Status> for AbortStatus {
    type Error = Status;

    fn try_from(s: Status) -> Result<Self, Self::Error> {
        match s {
            Status::SkippedAsPassed => Ok(AbortStatus::SkippedAsPassed),
            Status::SkippedAsFailed => Ok(AbortStatus::SkippedAsFailed),
            other => Err(other),
        }
    }
}

/// Aggregate the lifecycle phases of child units.
///
/// All aborted → aborted; some done and every other child terminal → done;
/// all scheduled → scheduled; anything else → running.
pub fn aggregate_execution_status(
    statuses: impl IntoIterator<Item = ExecutionStatus>,
) -> ExecutionStatus {
    let mut all_aborted = true;
    let mut all_terminal = true;
    let mut all_scheduled = true;
    for s in statuses {
        all_aborted &= s == ExecutionStatus::Aborted;
        all_terminal &= s.is_terminal();
        all_scheduled &= s == ExecutionStatus::Scheduled;
    }
    if all_aborted {
        ExecutionStatus::Aborted
    } else if all_terminal {
        // not all aborted, so at least one child is done
        ExecutionStatus::Done
    } else if all_scheduled {
        ExecutionStatus::Scheduled
    } else {
        ExecutionStatus::Running
    }
}

/// Aggregate the outcomes of child units.
///
/// Empty → skippedAsPassed. Any failed → failed. Any passed → failed if some
/// child was skipped as failed, else passed. Otherwise skippedAsFailed wins
/// over skippedAsPassed.
pub fn aggregate_status(statuses: impl IntoIterator<Item = Status>) -> Status {
    let mut passed = false;
    let mut skipped_as_failed = false;
    for s in statuses {
        match s {
            Status::Failed => return Status::Failed,
            Status::Passed => passed = true,
            Status::SkippedAsFailed => skipped_as_failed = true,
            Status::SkippedAsPassed => {}
        }
    }
    match (passed, skipped_as_failed) {
        (true, true) => Status::Failed,
        (true, false) => Status::Passed,
        (false, true) => Status::SkippedAsFailed,
        (false, false) => Status::SkippedAsPassed,
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
