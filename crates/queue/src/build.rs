// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote build service contract (image-build-as-a-service and similar).

use crate::error::BuildServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sk_core::TaskInfo;
use tokio::sync::broadcast;

/// Identifier the build service assigns to a submitted build.
pub type BuildId = String;

/// State of a remote build as reported on the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BuildState {
    Queued,
    Working,
    Success,
    Failure { reason: String },
    Cancelled,
    TimedOut,
}

impl BuildState {
    /// Whether the build will report nothing further.
    pub fn is_final(&self) -> bool {
        !matches!(self, BuildState::Queued | BuildState::Working)
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildState::Queued => f.write_str("queued"),
            BuildState::Working => f.write_str("working"),
            BuildState::Success => f.write_str("success"),
            BuildState::Failure { reason } => write!(f, "failure: {reason}"),
            BuildState::Cancelled => f.write_str("cancelled"),
            BuildState::TimedOut => f.write_str("timed-out"),
        }
    }
}

/// A status change published on the shared notification channel.
///
/// Every subscriber sees every notification, including those for builds
/// other processes submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildNotification {
    pub build_id: BuildId,
    pub state: BuildState,
}

#[async_trait]
pub trait BuildService: Clone + Send + Sync + 'static {
    async fn start_build(&self, task: &TaskInfo) -> Result<BuildId, BuildServiceError>;

    async fn cancel_build(&self, build_id: &str) -> Result<(), BuildServiceError>;

    /// Subscribe to the shared notification channel.
    fn notifications(&self) -> broadcast::Receiver<BuildNotification>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{BuildId, BuildNotification, BuildService, BuildState};
    use crate::error::BuildServiceError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sk_core::TaskInfo;
    use std::sync::Arc;
    use tokio::sync::broadcast;

    #[derive(Default)]
    struct FakeState {
        next_id: u64,
        started: Vec<(BuildId, TaskInfo)>,
        cancelled: Vec<BuildId>,
        rate_limit_starts: u32,
        reject: Option<String>,
        announce_before_return: Vec<BuildState>,
    }

    /// Build service that records submissions and publishes whatever
    /// notifications the test sends.
    #[derive(Clone)]
    pub struct FakeBuildService {
        state: Arc<Mutex<FakeState>>,
        channel: broadcast::Sender<BuildNotification>,
    }

    impl Default for FakeBuildService {
        fn default() -> Self {
            let (channel, _) = broadcast::channel(256);
            Self { state: Arc::default(), channel }
        }
    }

    impl FakeBuildService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Publish a notification on the shared channel.
        pub fn notify(&self, build_id: &str, state: BuildState) {
            let _ = self.channel.send(BuildNotification { build_id: build_id.to_string(), state });
        }

        /// Builds started so far, in order.
        pub fn started(&self) -> Vec<(BuildId, TaskInfo)> {
            self.state.lock().started.clone()
        }

        pub fn cancelled(&self) -> Vec<BuildId> {
            self.state.lock().cancelled.clone()
        }

        pub fn rate_limit_next_starts(&self, n: u32) {
            self.state.lock().rate_limit_starts = n;
        }

        pub fn reject_starts(&self, reason: &str) {
            self.state.lock().reject = Some(reason.to_string());
        }

        /// Publish `states` for each new build before `start_build` returns
        /// its id, the way a fast service can beat the submitter.
        pub fn announce_before_return(&self, states: Vec<BuildState>) {
            self.state.lock().announce_before_return = states;
        }
    }

    #[async_trait]
    impl BuildService for FakeBuildService {
        async fn start_build(&self, task: &TaskInfo) -> Result<BuildId, BuildServiceError> {
            let (id, early) = {
                let mut state = self.state.lock();
                if state.rate_limit_starts > 0 {
                    state.rate_limit_starts -= 1;
                    return Err(BuildServiceError::RateLimited);
                }
                if let Some(reason) = &state.reject {
                    return Err(BuildServiceError::Rejected(reason.clone()));
                }
                state.next_id += 1;
                let id = format!("build-{}", state.next_id);
                state.started.push((id.clone(), task.clone()));
                (id, state.announce_before_return.clone())
            };
            for s in early {
                self.notify(&id, s);
            }
            Ok(id)
        }

        async fn cancel_build(&self, build_id: &str) -> Result<(), BuildServiceError> {
            self.state.lock().cancelled.push(build_id.to_string());
            Ok(())
        }

        fn notifications(&self) -> broadcast::Receiver<BuildNotification> {
            self.channel.subscribe()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBuildService;
