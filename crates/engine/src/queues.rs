// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Already-running task queues, looked up by the kind a step declares.

use crate::error::EngineError;
use sk_core::StepInfo;
use sk_queue::{QueueKind, TaskQueue};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct QueueRegistry {
    queues: BTreeMap<QueueKind, Arc<dyn TaskQueue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, queue: impl TaskQueue) -> Self {
        self.register(Arc::new(queue));
        self
    }

    /// Register `queue` under its own kind, returning any queue it replaces.
    pub fn register(&mut self, queue: Arc<dyn TaskQueue>) -> Option<Arc<dyn TaskQueue>> {
        self.queues.insert(queue.kind(), queue)
    }

    pub fn get(&self, kind: QueueKind) -> Option<Arc<dyn TaskQueue>> {
        self.queues.get(&kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = QueueKind> + '_ {
        self.queues.keys().copied()
    }

    /// The queue `step` runs on.
    pub fn resolve(&self, step: &StepInfo, kind: QueueKind) -> Result<Arc<dyn TaskQueue>, EngineError> {
        self.get(kind).ok_or_else(|| EngineError::MissingQueue { step: step.step_name.clone(), kind })
    }

    /// Clean up every registered queue concurrently.
    pub async fn cleanup(&self) {
        let handles: Vec<_> = self
            .queues
            .values()
            .map(|queue| {
                let queue = Arc::clone(queue);
                tokio::spawn(async move { queue.cleanup().await })
            })
            .collect();
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "queue cleanup task failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "queues_tests.rs"]
mod tests;
