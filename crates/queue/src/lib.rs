// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sk-queue: task queues with a uniform scheduled/running/done/aborted
//! lifecycle over local, worker-pool and remote build backends.

pub mod broker;
pub mod build;
pub mod config;
pub mod duration;
mod error;
mod exec;
pub mod handler;
pub mod local;
pub mod pool;
mod queue;
pub mod registry;
pub mod remote;
pub mod retry;
mod shared;
pub mod worker;

pub use broker::{Broker, InMemoryBroker, JobEnvelope, JobReport};
pub use build::{BuildId, BuildNotification, BuildService, BuildState};
pub use config::{QueueConfig, RetryPolicy, UnknownEventPolicy};
pub use error::{BrokerError, BuildServiceError, QueueError, Transient};
pub use handler::{handler_fn, FnHandler, HandlerError, HandlerRegistry, TaskHandler, TaskOutput};
pub use local::LocalSequentialQueue;
pub use pool::WorkerPoolQueue;
pub use queue::{QueueKind, TaskOptions, TaskQueue, QUEUE_CLOSED_NOTE, TASK_TIMEOUT_NOTE};
pub use registry::TaskRegistry;
pub use remote::RemoteBuildQueue;
pub use worker::Worker;

#[cfg(any(test, feature = "test-support"))]
pub use build::FakeBuildService;
