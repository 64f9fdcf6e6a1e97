// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk key-value store, one file per key.
//!
//! Set-if-absent is made atomic by writing a uniquely named temp file and
//! hard-linking it into place: the link fails with `AlreadyExists` for every
//! writer but the first, even across processes sharing the directory.

use crate::kv::{KeyValueStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sk_core::hash_str;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Serialize, Deserialize)]
struct FileRecord {
    key: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at_ms: Option<u64>,
}

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Key-value store rooted at a directory.
#[derive(Clone)]
pub struct FileKeyValueStore {
    root: Arc<PathBuf>,
}

impl FileKeyValueStore {
    /// Open (and create if needed) a store under `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(root.as_ref()).await?;
        Ok(Self { root: Arc::new(root.as_ref().to_path_buf()) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys may contain path separators, so files are named by key digest.
        self.root.join(format!("{}.json", hash_str(key)))
    }

    async fn read_record(&self, key: &str) -> Result<Option<FileRecord>, StoreError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: FileRecord = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Malformed { key: key.to_string(), reason: e.to_string() })?;
        if record.expires_at_ms.is_some_and(|at| epoch_ms() >= at) {
            // Another reader may race us to the removal; either way it is gone.
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }
        Ok(Some(record))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_record(key).await?.map(|r| r.value))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        allow_override: bool,
    ) -> Result<bool, StoreError> {
        // Drops an expired record so the link below can claim the slot.
        let existing = self.read_record(key).await?;
        if existing.is_some() && !allow_override {
            return Ok(false);
        }

        let expires_at_ms = u64::try_from(ttl.as_millis())
            .ok()
            .and_then(|ttl_ms| epoch_ms().checked_add(ttl_ms));
        let record = FileRecord { key: key.to_string(), value, expires_at_ms };
        let body = serde_json::to_vec(&record)
            .map_err(|e| StoreError::Malformed { key: key.to_string(), reason: e.to_string() })?;

        let target = self.path_for(key);
        let tmp = self.root.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &body).await?;

        let result = if allow_override {
            tokio::fs::rename(&tmp, &target).await.map(|_| true)
        } else {
            match tokio::fs::hard_link(&tmp, &target).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e),
            }
        };
        // a successful rename consumed the temp file
        if !(allow_override && result.is_ok()) {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        Ok(result?)
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read_record(key).await?.is_some())
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
