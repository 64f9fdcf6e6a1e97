// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State every backend carries: the lifecycle registry, the shutdown token
//! and the background tasks to join on cleanup. Also the bounded memory of
//! settled ids that lets late reports be told apart from unknown ones.

use crate::config::QueueConfig;
use crate::queue::{QueueKind, QUEUE_CLOSED_NOTE};
use crate::registry::TaskRegistry;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::hash::Hash;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) struct QueueCore {
    pub(crate) kind: QueueKind,
    pub(crate) registry: TaskRegistry,
    pub(crate) cancel: CancellationToken,
    pub(crate) config: QueueConfig,
    background: Mutex<Vec<JoinHandle<()>>>,
    closed: OnceCell<()>,
}

impl QueueCore {
    pub(crate) fn new(kind: QueueKind, config: QueueConfig) -> Self {
        Self {
            kind,
            registry: TaskRegistry::new(),
            cancel: CancellationToken::new(),
            config,
            background: Mutex::new(Vec::new()),
            closed: OnceCell::new(),
        }
    }

    /// Spawn a background task that cleanup waits for.
    pub(crate) fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        let handle = tokio::spawn(fut);
        let mut background = self.background.lock();
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    /// Shut the queue down once; later and concurrent callers wait for the
    /// first to finish.
    ///
    /// Unsettled tasks are aborted before the token fires, so any worker
    /// racing to report a result finds them settled. `release` runs after
    /// every background task has exited.
    pub(crate) async fn shutdown<F, Fut>(&self, release: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.closed
            .get_or_init(|| async {
                let aborted = self.registry.close(QUEUE_CLOSED_NOTE);
                tracing::info!(kind = %self.kind, aborted, "closing task queue");
                self.cancel.cancel();
                let handles = std::mem::take(&mut *self.background.lock());
                for handle in handles {
                    if let Err(e) = handle.await {
                        if e.is_panic() {
                            tracing::warn!(kind = %self.kind, "queue background task panicked");
                        }
                    }
                }
                release().await;
            })
            .await;
    }
}

/// How many settled ids a backend remembers for recognising late reports.
pub(crate) const RECENTLY_SETTLED: usize = 4096;

/// Bounded set of recently settled ids; the oldest is forgotten first.
pub(crate) struct RecentIds<K> {
    order: VecDeque<K>,
    ids: HashSet<K>,
    capacity: usize,
}

impl<K> Default for RecentIds<K> {
    fn default() -> Self {
        Self { order: VecDeque::new(), ids: HashSet::new(), capacity: RECENTLY_SETTLED }
    }
}

impl<K: Clone + Eq + Hash> RecentIds<K> {
    #[cfg(test)]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { capacity, ..Self::default() }
    }

    pub(crate) fn insert(&mut self, id: K) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    pub(crate) fn contains<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.ids.contains(id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
#[path = "shared_tests.rs"]
mod tests;
