// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the workspace specs.

pub use sk_core::{
    hash_artifact, Artifact, ExecutionStatus, FlowEvent, FlowId, FlowReport, Graph, GraphBuilder, PackageManifest,
    StepInfo, Status, TaskInfo,
};
pub use sk_engine::{
    Engine, EngineConfig, EngineError, Flow, QueueRegistry, RecordingPublisher, ResultScope, SkipIfParentStepFailed,
    SkipIfStepResultInCache, Step, TaskPayload, TaskPlanner,
};
pub use sk_queue::{
    handler_fn, HandlerError, HandlerRegistry, LocalSequentialQueue, QueueConfig, QueueKind, TaskHandler, TaskOutput,
};
pub use sk_storage::{FileKeyValueStore, ImmutableCache, KeyValueStore};
pub use std::sync::Arc;
pub use std::time::Duration;

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
}

/// A throwaway monorepo with one directory per package under `packages/`.
pub struct Monorepo {
    dir: TempDir,
}

impl Monorepo {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Directory the result cache lives in, outside every package.
    pub fn cache_dir(&self) -> PathBuf {
        self.root().join(".skipper-cache")
    }

    /// Write `contents` to `file` inside package `name`.
    pub fn write(&self, name: &str, file: &str, contents: &str) -> &Self {
        let path = self.root().join("packages").join(name).join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
        self
    }

    /// The named packages, hashed from their current contents.
    pub fn artifacts(&self, names: &[&str]) -> Graph<Artifact> {
        let mut b = GraphBuilder::new();
        for name in names {
            let relative_path = PathBuf::from("packages").join(name);
            let absolute_path = self.root().join(&relative_path);
            let content_hash = hash_artifact(&absolute_path, &[]).unwrap();
            b.add_node(Artifact { relative_path, absolute_path, content_hash, manifest: PackageManifest::named(*name) });
        }
        b.build().unwrap()
    }
}

pub fn steps<S: KeyValueStore>(defs: Vec<Step<S>>, edges: &[(usize, usize)]) -> Graph<Step<S>> {
    let mut b = GraphBuilder::new();
    for step in defs {
        b.add_node(step);
    }
    for &(parent, child) in edges {
        b.add_edge(parent, child);
    }
    b.build().unwrap()
}

/// `(step, package)` pairs in the order tasks ran, shared across processes.
#[derive(Clone, Default)]
pub struct Runs(Arc<Mutex<Vec<(String, String)>>>);

impl Runs {
    pub fn record(&self, step: &str, package: &str) {
        self.0.lock().push((step.to_string(), package.to_string()));
    }

    pub fn of(&self, step: &str) -> Vec<String> {
        self.0.lock().iter().filter(|(s, _)| s == step).map(|(_, p)| p.clone()).collect()
    }

    /// Handler recording each package of the task payload.
    pub fn handler(&self) -> impl TaskHandler {
        let runs = self.clone();
        handler_fn(move |task: TaskInfo| {
            let runs = runs.clone();
            async move {
                let payload: TaskPayload = serde_json::from_value(task.payload)?;
                for artifact in &payload.artifacts {
                    runs.record(&payload.step.step_name, &artifact.package_name);
                }
                Ok::<_, HandlerError>(TaskOutput::default())
            }
        })
    }
}
