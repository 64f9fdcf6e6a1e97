// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fan-out of events to filtered subscribers.
//!
//! Each subscriber gets its own unbounded channel, so a slow consumer never
//! causes another to miss events, and events published after `subscribe`
//! returns are always delivered.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receiving end of a subscription.
pub type Subscription<T> = mpsc::UnboundedReceiver<T>;

type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Subscriber<T> {
    filter: Filter<T>,
    tx: mpsc::UnboundedSender<T>,
}

/// Cloneable handle to a shared set of subscribers.
pub struct EventBus<T> {
    subscribers: Arc<Mutex<Vec<Subscriber<T>>>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self { subscribers: Arc::clone(&self.subscribers) }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self { subscribers: Arc::new(Mutex::new(Vec::new())) }
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event matching `filter`.
    pub fn subscribe(&self, filter: impl Fn(&T) -> bool + Send + Sync + 'static) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(Subscriber { filter: Box::new(filter), tx });
        rx
    }

    /// Receive every event.
    pub fn subscribe_all(&self) -> Subscription<T> {
        self.subscribe(|_| true)
    }

    /// Deliver `event` to matching subscribers, returning how many received it.
    ///
    /// Subscribers whose receiver was dropped are pruned.
    pub fn publish(&self, event: T) -> usize {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        let mut delivered = 0;
        subscribers.retain(|sub| {
            if sub.tx.is_closed() {
                return false;
            }
            if (sub.filter)(&event) && sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
            true
        });
        if subscribers.len() < before {
            tracing::trace!(pruned = before - subscribers.len(), "dropped closed subscribers");
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().iter().filter(|s| !s.tx.is_closed()).count()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
