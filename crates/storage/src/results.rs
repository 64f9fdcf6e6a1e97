// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step results stored in the immutable cache.

use crate::cache::{CacheEntry, CacheError, ImmutableCache};
use crate::kv::KeyValueStore;
use sk_core::{FlowId, Outcome, StepId};
use std::time::Duration;

/// Key of one step's result on one artifact.
pub fn artifact_step_key(step_id: &StepId, artifact_hash: &str) -> String {
    format!("{step_id}-{artifact_hash}")
}

/// Key of a step result that does not depend on any single artifact.
pub fn step_key(step_id: &StepId) -> String {
    step_id.to_string()
}

/// A terminal step outcome together with the flow that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResult {
    pub flow_id: FlowId,
    pub repo_hash: String,
    pub outcome: Outcome,
}

impl CachedResult {
    pub fn is_from_flow(&self, flow_id: &FlowId) -> bool {
        &self.flow_id == flow_id
    }

    fn into_entry(self, key: &str) -> Result<CacheEntry, CacheError> {
        let value = serde_json::to_string(&self.outcome)
            .map_err(|source| CacheError::Corrupt { key: key.to_string(), source })?;
        Ok(CacheEntry { flow_id: self.flow_id, repo_hash: self.repo_hash, value })
    }

    fn from_entry(key: &str, entry: CacheEntry) -> Result<Self, CacheError> {
        let outcome = serde_json::from_str(&entry.value)
            .map_err(|source| CacheError::Corrupt { key: key.to_string(), source })?;
        Ok(Self { flow_id: entry.flow_id, repo_hash: entry.repo_hash, outcome })
    }
}

/// Cached results split by whether the asking flow produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedResults {
    pub current_flow: Vec<CachedResult>,
    pub other_flows: Vec<CachedResult>,
}

impl CachedResults {
    pub fn classify(results: impl IntoIterator<Item = CachedResult>, current: &FlowId) -> Self {
        let (current_flow, other_flows) = results.into_iter().partition(|r| r.is_from_flow(current));
        Self { current_flow, other_flows }
    }

    pub fn is_empty(&self) -> bool {
        self.current_flow.is_empty() && self.other_flows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.current_flow.len() + self.other_flows.len()
    }

    /// All results, this flow's first.
    pub fn iter(&self) -> impl Iterator<Item = &CachedResult> {
        self.current_flow.iter().chain(self.other_flows.iter())
    }
}

impl<S: KeyValueStore> ImmutableCache<S> {
    async fn get_result(&self, key: &str) -> Result<Option<CachedResult>, CacheError> {
        match self.get(key).await? {
            Some(entry) => CachedResult::from_entry(key, entry).map(Some),
            None => Ok(None),
        }
    }

    async fn set_result(&self, key: &str, result: CachedResult, ttl: Duration) -> Result<bool, CacheError> {
        let entry = result.into_entry(key)?;
        self.set(key, entry, ttl).await
    }

    pub async fn get_artifact_step_result(
        &self,
        step_id: &StepId,
        artifact_hash: &str,
    ) -> Result<Option<CachedResult>, CacheError> {
        self.get_result(&artifact_step_key(step_id, artifact_hash)).await
    }

    pub async fn set_artifact_step_result(
        &self,
        step_id: &StepId,
        artifact_hash: &str,
        result: CachedResult,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.set_result(&artifact_step_key(step_id, artifact_hash), result, ttl).await
    }

    pub async fn get_step_result(&self, step_id: &StepId) -> Result<Option<CachedResult>, CacheError> {
        self.get_result(&step_key(step_id)).await
    }

    pub async fn set_step_result(
        &self,
        step_id: &StepId,
        result: CachedResult,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.set_result(&step_key(step_id), result, ttl).await
    }

    /// Results of `step_id` on each of `artifact_hashes`, skipping misses.
    pub async fn query_artifact_step_results<'a>(
        &self,
        step_id: &StepId,
        artifact_hashes: impl IntoIterator<Item = &'a str>,
        current: &FlowId,
    ) -> Result<CachedResults, CacheError> {
        let mut found = Vec::new();
        for hash in artifact_hashes {
            if let Some(result) = self.get_artifact_step_result(step_id, hash).await? {
                found.push(result);
            }
        }
        Ok(CachedResults::classify(found, current))
    }

    pub async fn query_step_result(&self, step_id: &StepId, current: &FlowId) -> Result<CachedResults, CacheError> {
        let found = self.get_step_result(step_id).await?;
        Ok(CachedResults::classify(found, current))
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
