// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External event channel: one message per terminal flow event.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from publish operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish failed: {0}")]
    SendFailed(String),
}

/// Adapter for the deployment-wide publish/subscribe topic
#[async_trait]
pub trait Publisher: Clone + Send + Sync + 'static {
    /// Publish a JSON-encoded event on `topic`
    async fn publish(&self, topic: &str, message: String) -> Result<(), PublishError>;
}

/// Publisher for deployments without external observers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(&self, topic: &str, _message: String) -> Result<(), PublishError> {
        tracing::trace!(topic, "dropping published event");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{PublishError, Publisher};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sk_core::FlowEvent;
    use std::sync::Arc;

    /// Recorded publish call
    #[derive(Debug, Clone)]
    pub struct PublishCall {
        pub topic: String,
        pub message: String,
    }

    #[derive(Default)]
    struct RecordingState {
        calls: Vec<PublishCall>,
        fail: bool,
    }

    /// Fake publisher for testing
    #[derive(Clone, Default)]
    pub struct RecordingPublisher {
        inner: Arc<Mutex<RecordingState>>,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded publish calls
        pub fn calls(&self) -> Vec<PublishCall> {
            self.inner.lock().calls.clone()
        }

        /// Recorded messages decoded back into flow events
        pub fn events(&self) -> Vec<FlowEvent> {
            self.inner.lock().calls.iter().filter_map(|c| serde_json::from_str(&c.message).ok()).collect()
        }

        /// Make every later publish fail (after recording it)
        pub fn fail(&self, fail: bool) {
            self.inner.lock().fail = fail;
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, topic: &str, message: String) -> Result<(), PublishError> {
            let mut inner = self.inner.lock();
            inner.calls.push(PublishCall { topic: topic.to_string(), message });
            if inner.fail {
                return Err(PublishError::SendFailed("recording publisher set to fail".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{PublishCall, RecordingPublisher};
