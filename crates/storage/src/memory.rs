// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local key-value store with TTL expiry.

use crate::kv::{KeyValueStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Slot {
    value: String,
    /// `None` when the TTL overflows the clock, i.e. never expires.
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Key-value store kept in memory, shared between clones.
///
/// Useful for single-process runs and tests; set-if-absent is atomic under
/// the internal mutex.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.lock().values().filter(|s| s.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(slot) if slot.is_live(now) => Some(slot.value.clone()),
            Some(_) => {
                slots.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read(key))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        allow_override: bool,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        if !allow_override && slots.get(key).is_some_and(|s| s.is_live(now)) {
            return Ok(false);
        }
        slots.insert(key.to_string(), Slot { value, expires_at: now.checked_add(ttl) });
        Ok(true)
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read(key).is_some())
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::InMemoryKeyValueStore;
    use crate::kv::{KeyValueStore, StoreError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Call counters recorded by [`FakeKeyValueStore`].
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct StoreCalls {
        pub get: usize,
        pub set: usize,
        pub has: usize,
        pub cleanup: usize,
    }

    #[derive(Default)]
    struct FakeState {
        calls: StoreCalls,
        fail_sets: bool,
        fail_reads: bool,
        override_flags: Vec<bool>,
    }

    /// In-memory store that records calls and can be told to fail.
    #[derive(Clone, Default)]
    pub struct FakeKeyValueStore {
        inner: InMemoryKeyValueStore,
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeKeyValueStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> StoreCalls {
            self.state.lock().calls.clone()
        }

        /// `allow_override` argument of every `set` call, in order.
        pub fn override_flags(&self) -> Vec<bool> {
            self.state.lock().override_flags.clone()
        }

        pub fn fail_sets(&self, fail: bool) {
            self.state.lock().fail_sets = fail;
        }

        pub fn fail_reads(&self, fail: bool) {
            self.state.lock().fail_reads = fail;
        }

        /// Store a raw value directly, bypassing counters.
        pub async fn insert_raw(&self, key: &str, value: &str) {
            let _ = self.inner.set(key, value.to_string(), Duration::from_secs(3600), true).await;
        }

        /// Read a raw value directly, bypassing counters.
        pub async fn raw(&self, key: &str) -> Option<String> {
            self.inner.get(key).await.ok().flatten()
        }

        fn read_guard(&self) -> Result<(), StoreError> {
            if self.state.lock().fail_reads {
                return Err(StoreError::Unavailable("injected read failure".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KeyValueStore for FakeKeyValueStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.state.lock().calls.get += 1;
            self.read_guard()?;
            self.inner.get(key).await
        }

        async fn set(
            &self,
            key: &str,
            value: String,
            ttl: Duration,
            allow_override: bool,
        ) -> Result<bool, StoreError> {
            {
                let mut state = self.state.lock();
                state.calls.set += 1;
                state.override_flags.push(allow_override);
                if state.fail_sets {
                    return Err(StoreError::Unavailable("injected write failure".into()));
                }
            }
            self.inner.set(key, value, ttl, allow_override).await
        }

        async fn has(&self, key: &str) -> Result<bool, StoreError> {
            self.state.lock().calls.has += 1;
            self.read_guard()?;
            self.inner.has(key).await
        }

        async fn cleanup(&self) -> Result<(), StoreError> {
            self.state.lock().calls.cleanup += 1;
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeKeyValueStore, StoreCalls};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
