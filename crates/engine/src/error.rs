// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sk_core::FlowId;
use sk_queue::QueueKind;
use sk_storage::CacheError;
use thiserror::Error;

/// Errors that abort a whole flow
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("step {step:?} needs a {kind} queue but none is registered")]
    MissingQueue { step: String, kind: QueueKind },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("step {step:?} runner crashed: {message}")]
    StepCrashed { step: String, message: String },
    #[error("flow {0} stopped receiving events with steps still unsettled")]
    Stalled(FlowId),
}

/// Errors raised while evaluating a constraint.
///
/// Only a fatal cache error aborts the flow; anything else fails the step or
/// artifact the constraint was gating.
#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("constraint {0} can only gate a single artifact")]
    ArtifactRequired(String),
    #[error("{0}")]
    Failed(String),
}

impl ConstraintError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConstraintError::Cache(err) if err.is_fatal())
    }
}

/// Errors from parsing engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),
}
