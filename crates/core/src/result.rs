// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result envelopes attached to terminal lifecycle events.

use crate::status::{AbortStatus, DoneStatus, ExecutionStatus, Status};
use serde::{Deserialize, Serialize};

/// A serialized error: the display message plus its `source()` chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), chain: Vec::new() }
    }

    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(inner) = source {
            chain.push(inner.to_string());
            source = inner.source();
        }
        Self { message: err.to_string(), chain }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        for cause in &self.chain {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Result of work that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneResult {
    pub status: DoneStatus,
    pub duration_ms: u64,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
}

/// Result of work that was skipped, cancelled, or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortResult {
    pub status: AbortStatus,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
}

impl AbortResult {
    pub fn new(status: AbortStatus) -> Self {
        Self { status, notes: Vec::new(), errors: Vec::new() }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Terminal result of a unit of work, tagged by its lifecycle phase.
///
/// This is the value persisted in the immutable cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "executionStatus", rename_all = "camelCase")]
pub enum Outcome {
    Done(DoneResult),
    Aborted(AbortResult),
}

impl Outcome {
    pub fn passed(duration_ms: u64) -> Self {
        Outcome::Done(DoneResult {
            status: DoneStatus::Passed,
            duration_ms,
            notes: Vec::new(),
            errors: Vec::new(),
        })
    }

    pub fn failed(duration_ms: u64, errors: Vec<ErrorInfo>) -> Self {
        Outcome::Done(DoneResult { status: DoneStatus::Failed, duration_ms, notes: Vec::new(), errors })
    }

    pub fn skipped_as_passed(notes: Vec<String>) -> Self {
        Outcome::Aborted(AbortResult { status: AbortStatus::SkippedAsPassed, notes, errors: Vec::new() })
    }

    pub fn skipped_as_failed(notes: Vec<String>) -> Self {
        Outcome::Aborted(AbortResult { status: AbortStatus::SkippedAsFailed, notes, errors: Vec::new() })
    }

    /// Build the aborted outcome matching a skip `status`.
    pub fn skipped(status: AbortStatus, notes: Vec<String>) -> Self {
        Outcome::Aborted(AbortResult { status, notes, errors: Vec::new() })
    }

    pub fn status(&self) -> Status {
        match self {
            Outcome::Done(r) => r.status.into(),
            Outcome::Aborted(r) => r.status.into(),
        }
    }

    pub fn execution_status(&self) -> ExecutionStatus {
        match self {
            Outcome::Done(_) => ExecutionStatus::Done,
            Outcome::Aborted(_) => ExecutionStatus::Aborted,
        }
    }

    pub fn notes(&self) -> &[String] {
        match self {
            Outcome::Done(r) => &r.notes,
            Outcome::Aborted(r) => &r.notes,
        }
    }

    pub fn errors(&self) -> &[ErrorInfo] {
        match self {
            Outcome::Done(r) => &r.errors,
            Outcome::Aborted(r) => &r.errors,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        match &mut self {
            Outcome::Done(r) => r.notes.push(note.into()),
            Outcome::Aborted(r) => r.notes.push(note.into()),
        }
        self
    }
}

impl From<DoneResult> for Outcome {
    fn from(r: DoneResult) -> Self {
        Outcome::Done(r)
    }
}

impl From<AbortResult> for Outcome {
    fn from(r: AbortResult) -> Self {
        Outcome::Aborted(r)
    }
}

/// Result of a unit of work at any point of its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "executionStatus", rename_all = "camelCase")]
pub enum StepResult {
    Scheduled,
    Running,
    Done(DoneResult),
    Aborted(AbortResult),
}

impl StepResult {
    pub fn execution_status(&self) -> ExecutionStatus {
        match self {
            StepResult::Scheduled => ExecutionStatus::Scheduled,
            StepResult::Running => ExecutionStatus::Running,
            StepResult::Done(_) => ExecutionStatus::Done,
            StepResult::Aborted(_) => ExecutionStatus::Aborted,
        }
    }

    /// Outcome class, present only once terminal.
    pub fn status(&self) -> Option<Status> {
        self.outcome().map(|o| o.status())
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            StepResult::Done(r) => Some(Outcome::Done(r.clone())),
            StepResult::Aborted(r) => Some(Outcome::Aborted(r.clone())),
            StepResult::Scheduled | StepResult::Running => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.execution_status().is_terminal()
    }

    /// Aggregate child results into a parent result.
    ///
    /// The lifecycle phase follows [`aggregate_execution_status`]; once terminal
    /// the outcome follows [`aggregate_status`] over the terminal children.
    /// `duration_ms` is the parent's own wall-clock time.
    ///
    /// [`aggregate_execution_status`]: crate::status::aggregate_execution_status
    /// [`aggregate_status`]: crate::status::aggregate_status
    pub fn aggregate<'a>(children: impl IntoIterator<Item = &'a StepResult>, duration_ms: u64) -> Self {
        let children: Vec<&StepResult> = children.into_iter().collect();
        let phase = crate::status::aggregate_execution_status(
            children.iter().map(|c| c.execution_status()),
        );
        let status = crate::status::aggregate_status(children.iter().filter_map(|c| c.status()));
        match phase {
            ExecutionStatus::Scheduled => StepResult::Scheduled,
            ExecutionStatus::Running => StepResult::Running,
            ExecutionStatus::Done => match DoneStatus::try_from(status) {
                Ok(status) => StepResult::Done(DoneResult {
                    status,
                    duration_ms,
                    notes: Vec::new(),
                    errors: Vec::new(),
                }),
                // A done child always carries passed/failed, so this arm only
                // guards against hand-built inconsistent input.
                Err(_) => StepResult::Done(DoneResult {
                    status: DoneStatus::Failed,
                    duration_ms,
                    notes: Vec::new(),
                    errors: Vec::new(),
                }),
            },
            ExecutionStatus::Aborted => StepResult::Aborted(AbortResult::new(
                AbortStatus::try_from(status).unwrap_or(AbortStatus::SkippedAsFailed),
            )),
        }
    }
}

impl From<Outcome> for StepResult {
    fn from(o: Outcome) -> Self {
        match o {
            Outcome::Done(r) => StepResult::Done(r),
            Outcome::Aborted(r) => StepResult::Aborted(r),
        }
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
