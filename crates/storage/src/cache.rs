// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-once cache layered over a key-value store.
//!
//! The store is the source of truth. An in-process map mirrors every entry
//! this process has fetched or written, so repeated lookups during one flow
//! skip the round trip. Entries are never replaced: the first `set` for a
//! key wins everywhere, and later writers observe it on their next `get`.
//!
//! Mirrored entries expire with the TTL they were written with. Entries
//! learned from a store read are kept for at most [`MIRROR_TTL`], since the
//! remaining store lifetime is unknown.

use crate::kv::{KeyValueStore, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sk_core::FlowId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Upper bound on how long an entry read from the store is mirrored.
pub const MIRROR_TTL: Duration = Duration::from_secs(300);

/// Errors from cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stored value failed to parse. Never downgraded to a miss.
    #[error("corrupt cache entry at {key}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    /// Whether the flow must stop rather than carry on without the cache.
    ///
    /// Unreadable records are fatal whether the envelope or the store's own
    /// framing failed to parse.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CacheError::Corrupt { .. } | CacheError::Store(StoreError::Malformed { .. }))
    }
}

/// Envelope stored under every cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub flow_id: FlowId,
    pub repo_hash: String,
    /// JSON-serialized payload, parsed by the caller.
    pub value: String,
}

struct Mirrored {
    entry: CacheEntry,
    /// `None` when the TTL overflows the clock.
    expires_at: Option<Instant>,
}

#[derive(Clone)]
pub struct ImmutableCache<S: KeyValueStore> {
    store: S,
    local: Arc<Mutex<HashMap<String, Mirrored>>>,
}

impl<S: KeyValueStore> ImmutableCache<S> {
    pub fn new(store: S) -> Self {
        Self { store, local: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Live mirrored entry for `key`, dropping it once expired.
    fn mirrored(&self, key: &str) -> Option<CacheEntry> {
        let mut local = self.local.lock();
        let live = local.get(key)?.expires_at.map_or(true, |at| Instant::now() < at);
        if !live {
            tracing::debug!(key, "mirrored cache entry expired");
            local.remove(key);
            return None;
        }
        local.get(key).map(|m| m.entry.clone())
    }

    fn mirror(&self, key: &str, entry: CacheEntry, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.local.lock().insert(key.to_string(), Mirrored { entry, expires_at });
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn has(&self, key: &str) -> Result<bool, CacheError> {
        if self.mirrored(key).is_some() {
            return Ok(true);
        }
        Ok(self.store.has(key).await?)
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        if let Some(entry) = self.mirrored(key) {
            return Ok(Some(entry));
        }
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_str(&raw)
            .map_err(|source| CacheError::Corrupt { key: key.to_string(), source })?;
        self.mirror(key, entry.clone(), MIRROR_TTL);
        Ok(Some(entry))
    }

    /// Store `entry` unless `key` already holds a value.
    ///
    /// Returns whether this call wrote the entry. Losing the race is not an
    /// error.
    pub async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<bool, CacheError> {
        if self.mirrored(key).is_some() {
            tracing::debug!(key, "cache key already set in process, skipping write");
            return Ok(false);
        }
        let raw = serde_json::to_string(&entry)
            .map_err(|source| CacheError::Corrupt { key: key.to_string(), source })?;
        let written = self.store.set(key, raw, ttl, false).await?;
        if written {
            self.mirror(key, entry, ttl);
        } else {
            tracing::debug!(key, flow_id = %entry.flow_id, "cache key already set, keeping first value");
        }
        Ok(written)
    }

    pub async fn cleanup(&self) -> Result<(), CacheError> {
        self.local.lock().clear();
        Ok(self.store.cleanup().await?)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
