// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration. Every field has a default.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sk_queue::QueueConfig;
use std::time::Duration;

pub const DEFAULT_TOPIC: &str = "skipper-flow-events";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long persisted step results stay readable by later flows.
    #[serde(with = "sk_queue::duration")]
    pub cache_ttl: Duration,
    /// Topic terminal events are published on.
    pub topic: String,
    pub queue: QueueConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(14 * 86400),
            topic: DEFAULT_TOPIC.to_string(),
            queue: QueueConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML fragment; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
