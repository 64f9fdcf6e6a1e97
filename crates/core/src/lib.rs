// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sk-core: data model shared by the skipper crates

pub mod macros;

pub mod artifact;
pub mod bus;
pub mod event;
pub mod graph;
pub mod hashing;
pub mod id;
pub mod report;
pub mod result;
pub mod status;
pub mod step;

pub use artifact::{Artifact, PackageManifest, TargetType};
pub use bus::{EventBus, Subscription};
pub use event::{FlowEvent, TaskEvent, TaskInfo};
pub use graph::{Graph, GraphBuilder, GraphError, Node};
pub use hashing::{hash_artifact, hash_str};
pub use id::{short, FlowId, StepId, TaskId};
pub use report::{ArtifactResultOfSteps, FlowReport, StepResultOfArtifacts, UnitOfArtifact, UnitOfStep};
pub use result::{AbortResult, DoneResult, ErrorInfo, Outcome, StepResult};
pub use status::{
    aggregate_execution_status, aggregate_status, AbortStatus, DoneStatus, ExecutionStatus,
    Status,
};
pub use step::StepInfo;
