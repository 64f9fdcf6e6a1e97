// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sk-storage: write-once result cache over pluggable key-value stores

mod cache;
mod file;
mod kv;
mod memory;
mod results;

pub use cache::{CacheEntry, CacheError, ImmutableCache};
pub use file::FileKeyValueStore;
pub use kv::{KeyValueStore, StoreError};
pub use memory::InMemoryKeyValueStore;
pub use results::{artifact_step_key, step_key, CachedResult, CachedResults};

#[cfg(any(test, feature = "test-support"))]
pub use memory::{FakeKeyValueStore, StoreCalls};
