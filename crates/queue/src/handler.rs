// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task bodies, looked up by task name.

use async_trait::async_trait;
use sk_core::TaskInfo;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Error returned by a task body. Serialized into the task's `errors`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a successful task body reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    pub notes: Vec<String>,
}

impl TaskOutput {
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// The work behind one task name.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: TaskInfo) -> Result<TaskOutput, HandlerError>;
}

/// [`TaskHandler`] backed by an async closure.
pub struct FnHandler<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(TaskInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, HandlerError>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(TaskInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, HandlerError>> + Send + 'static,
{
    async fn handle(&self, task: TaskInfo) -> Result<TaskOutput, HandlerError> {
        (self.0)(task).await
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, task_name: impl Into<String>, handler: impl TaskHandler) -> Self {
        self.register(task_name, handler);
        self
    }

    pub fn register(&mut self, task_name: impl Into<String>, handler: impl TaskHandler) {
        self.handlers.insert(task_name.into(), Arc::new(handler));
    }

    pub fn get(&self, task_name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_name).cloned()
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.handlers.contains_key(task_name)
    }
}
