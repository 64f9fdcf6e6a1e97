// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step identity.

use crate::id::StepId;
use serde::{Deserialize, Serialize};

/// Identity of one pipeline stage within a flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    pub step_id: StepId,
    pub step_name: String,
    pub display_name: String,
}

impl StepInfo {
    pub fn new(step_id: StepId, step_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { step_id, step_name: step_name.into(), display_name: display_name.into() }
    }

    /// Step `name` at `position` of the step graph, with an ID derived from both.
    pub fn at_position(name: &str, position: usize) -> Self {
        Self::new(StepId::at_position(name, position), name, name)
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}
