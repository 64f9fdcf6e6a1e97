// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value store contract the cache is layered over.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from key-value store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store record for {key}: {reason}")]
    Malformed { key: String, reason: String },
}

/// A remote (or local) key-value store shared by concurrent flows.
///
/// The only mutation the cache relies on is `set` with `allow_override =
/// false`, which must be atomic set-if-absent across every writer.
#[async_trait]
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key` for `ttl`.
    ///
    /// Returns `false` without writing when the key exists and
    /// `allow_override` is false.
    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        allow_override: bool,
    ) -> Result<bool, StoreError>;

    async fn has(&self, key: &str) -> Result<bool, StoreError>;

    /// Release connections. Safe to call more than once.
    async fn cleanup(&self) -> Result<(), StoreError>;
}
