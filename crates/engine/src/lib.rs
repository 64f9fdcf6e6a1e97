// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sk-engine: runs flows of steps over artifacts, gated by constraints and
//! backed by the immutable result cache

pub mod config;
pub mod constraint;
pub mod constraints;
mod engine;
mod error;
pub mod publish;
mod queues;
mod runner;
pub mod state;
pub mod step;

#[cfg(test)]
mod test_helpers;

pub use config::{EngineConfig, DEFAULT_TOPIC};
pub use constraint::{evaluate_constraints, Constraint, ConstraintContext, ConstraintResult, Verdict};
pub use constraints::{
    describe_flows, CachedVerdict, LookupScope, SkipAsPassedIfArtifactIgnored, SkipAsPassedIfStepDisabled,
    SkipAsPassedIfTargetTypeNotSupported, SkipIfParentStepFailed, SkipIfStepResultInCache,
};
pub use engine::{Engine, Flow};
pub use error::{ConfigError, ConstraintError, EngineError};
pub use publish::{NoopPublisher, PublishError, Publisher};
pub use queues::QueueRegistry;
pub use state::FlowState;
pub use step::{PayloadArtifact, ResultScope, Step, TaskPayload, TaskPlanner};

#[cfg(any(test, feature = "test-support"))]
pub use publish::{PublishCall, RecordingPublisher};
