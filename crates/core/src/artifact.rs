// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buildable packages of the monorepo.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deployment target a package produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    Npm,
    Docker,
}

crate::simple_display! {
    TargetType {
        Npm => "npm",
        Docker => "docker",
    }
}

/// The subset of a package manifest the engine reads; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_types: Vec<TargetType>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PackageManifest {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), version: None, target_types: Vec::new(), extra: serde_json::Map::new() }
    }

    pub fn with_target(mut self, target: TargetType) -> Self {
        self.target_types.push(target);
        self
    }
}

/// One package of the monorepo, immutable for the lifetime of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    /// Hash of the package's files and dependency closure; the cache partition key.
    pub content_hash: String,
    pub manifest: PackageManifest,
}

impl Artifact {
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn supports(&self, target: TargetType) -> bool {
        self.manifest.target_types.contains(&target)
    }
}

crate::builder! {
    pub struct ArtifactBuilder => Artifact {
        into {
            relative_path: PathBuf = "packages/a",
            absolute_path: PathBuf = "/repo/packages/a",
            content_hash: String = "hash-a",
        }
        set {
            manifest: PackageManifest = PackageManifest::named("a"),
        }
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
