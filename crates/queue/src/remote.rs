// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task queue over a remote build service.
//!
//! Submitting a task starts a remote build; the service assigns a build id
//! and later publishes state changes on a channel every submitter shares.
//! Notifications are correlated back to task ids through the build id. A
//! notification can beat `start_build`'s reply, and other processes' builds
//! show up too, so an unrecognised id is re-checked a bounded number of
//! times before it is dropped.

use crate::build::{BuildId, BuildNotification, BuildService, BuildState};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::queue::{task_infos, QueueKind, TaskOptions, TaskQueue, TASK_TIMEOUT_NOTE};
use crate::retry::{wait_for, with_retry, RetryError};
use crate::shared::{QueueCore, RecentIds};
use async_trait::async_trait;
use parking_lot::Mutex;
use sk_core::{AbortResult, AbortStatus, ErrorInfo, EventBus, Outcome, TaskEvent, TaskId, TaskInfo};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Links {
    /// Builds not yet in a final state, with the task each one runs.
    builds: HashMap<BuildId, TaskId>,
    /// Builds that reached a final state, so their stray notifications are
    /// not mistaken for early ones.
    settled: RecentIds<BuildId>,
    watches: HashMap<TaskId, CancellationToken>,
}

impl Links {
    fn settle(&mut self, build_id: &str) -> Option<TaskId> {
        let task_id = self.builds.remove(build_id)?;
        self.settled.insert(build_id.to_string());
        Some(task_id)
    }
}

type SharedLinks = Arc<Mutex<Links>>;

pub struct RemoteBuildQueue<S: BuildService> {
    core: Arc<QueueCore>,
    service: S,
    links: SharedLinks,
    dropped: Arc<AtomicU64>,
}

impl<S: BuildService> RemoteBuildQueue<S> {
    /// Subscribe to build notifications and start listening. Must be called
    /// inside a tokio runtime.
    pub fn new(service: S, config: QueueConfig) -> Self {
        let core = Arc::new(QueueCore::new(QueueKind::RemoteBuild, config));
        let links = SharedLinks::default();
        let dropped = Arc::new(AtomicU64::new(0));
        // Subscribe before any build starts so no notification is missed.
        let notifications = service.notifications();
        core.spawn(listen(Arc::clone(&core), notifications, Arc::clone(&links), Arc::clone(&dropped)));
        Self { core, service, links, dropped }
    }

    /// Notifications dropped because their build id never became known.
    pub fn dropped_notifications(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Build id the service assigned to `task_id`, once `start_build` returned.
    pub fn build_id(&self, task_id: &TaskId) -> Option<BuildId> {
        self.links
            .lock()
            .builds
            .iter()
            .find(|(_, linked)| linked == &task_id)
            .map(|(build_id, _)| build_id.clone())
    }
}

fn infrastructure_failure(note: &str, err: &(dyn std::error::Error + 'static)) -> Outcome {
    AbortResult {
        status: AbortStatus::SkippedAsFailed,
        notes: vec![note.to_string()],
        errors: vec![ErrorInfo::from_error(err)],
    }
    .into()
}

fn timed_out() -> Outcome {
    Outcome::skipped_as_failed(vec![TASK_TIMEOUT_NOTE.to_string()])
}

async fn supervise<S: BuildService>(
    core: Arc<QueueCore>,
    service: S,
    task: TaskInfo,
    token: CancellationToken,
    deadline: Instant,
    links: SharedLinks,
) {
    let id = task.task_id.clone();
    let started = with_retry(&core.config.retry, &token, deadline, || service.start_build(&task)).await;
    match started {
        Ok(build_id) => {
            tracing::info!(task_id = %id, %build_id, "remote build started");
            links.lock().builds.insert(build_id.clone(), id.clone());
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    if core.registry.finish(&id, timed_out()) {
                        tracing::warn!(task_id = %id, %build_id, "remote build timed out");
                        links.lock().settle(&build_id);
                        if let Err(err) = service.cancel_build(&build_id).await {
                            tracing::warn!(%build_id, error = %err, "cancelling timed-out build failed");
                        }
                    }
                }
            }
        }
        Err(RetryError::Cancelled) => {}
        Err(RetryError::DeadlineExceeded) => {
            core.registry.finish(&id, timed_out());
        }
        Err(RetryError::Failed(err)) => {
            tracing::warn!(task_id = %id, error = %err, "could not start remote build");
            core.registry.finish(&id, infrastructure_failure("could not start remote build", &err));
        }
    }
    links.lock().watches.remove(&id);
}

/// Apply a notification for a known build. Returns `false` if the build id
/// is not (yet) linked to a task.
fn apply(core: &QueueCore, links: &SharedLinks, notification: &BuildNotification) -> bool {
    let build_id = &notification.build_id;
    let task_id = {
        let mut links = links.lock();
        let linked = if notification.state.is_final() {
            links.settle(build_id)
        } else {
            links.builds.get(build_id).cloned()
        };
        match linked {
            Some(task_id) => task_id,
            None if links.settled.contains(build_id.as_str()) => {
                tracing::debug!(%build_id, state = %notification.state, "notification for settled build");
                return true;
            }
            None => return false,
        }
    };

    let registry = &core.registry;
    match &notification.state {
        BuildState::Queued => {}
        BuildState::Working => {
            registry.mark_running(&task_id);
        }
        BuildState::Success => {
            registry.mark_running(&task_id);
            registry.finish(&task_id, Outcome::passed(registry.elapsed_ms(&task_id)));
        }
        BuildState::Failure { reason } => {
            registry.mark_running(&task_id);
            let errors = vec![ErrorInfo::new(reason.clone())];
            registry.finish(&task_id, Outcome::failed(registry.elapsed_ms(&task_id), errors));
        }
        BuildState::Cancelled | BuildState::TimedOut => {
            let note = format!("remote build {}", notification.state);
            registry.finish(&task_id, Outcome::skipped_as_failed(vec![note]));
        }
    }

    if notification.state.is_final() {
        if let Some(token) = links.lock().watches.remove(&task_id) {
            token.cancel();
        }
    }
    true
}

async fn listen(
    core: Arc<QueueCore>,
    mut notifications: broadcast::Receiver<BuildNotification>,
    links: SharedLinks,
    dropped: Arc<AtomicU64>,
) {
    loop {
        let received = tokio::select! {
            biased;
            _ = core.cancel.cancelled() => break,
            received = notifications.recv() => received,
        };
        let notification = match received {
            Ok(notification) => notification,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "build notifications lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if apply(&core, &links, &notification) {
            continue;
        }

        tracing::debug!(build_id = %notification.build_id, "notification for unknown build, retrying");
        let (retry_core, retry_links, retry_dropped) =
            (Arc::clone(&core), Arc::clone(&links), Arc::clone(&dropped));
        core.spawn(async move {
            let policy = retry_core.config.unknown_event.clone();
            let applied =
                wait_for(&policy, &retry_core.cancel, || apply(&retry_core, &retry_links, &notification).then_some(()))
                    .await;
            if applied.is_none() && !retry_core.cancel.is_cancelled() {
                retry_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    build_id = %notification.build_id,
                    state = %notification.state,
                    "dropping notification for unknown build"
                );
            }
        });
    }
}

#[async_trait]
impl<S: BuildService> TaskQueue for RemoteBuildQueue<S> {
    fn kind(&self) -> QueueKind {
        QueueKind::RemoteBuild
    }

    fn add_tasks(&self, tasks: Vec<TaskOptions>) -> Result<Vec<TaskInfo>, QueueError> {
        let tasks = task_infos(tasks);
        let infos: Vec<TaskInfo> = tasks.iter().map(|(info, _)| info.clone()).collect();
        self.core.registry.schedule_all(&infos)?;

        let now = Instant::now();
        for (task, timeout) in tasks {
            let timeout = timeout.unwrap_or(self.core.config.default_task_timeout);
            let deadline = now.checked_add(timeout).unwrap_or(now + self.core.config.default_task_timeout);
            let token = self.core.cancel.child_token();
            self.links.lock().watches.insert(task.task_id.clone(), token.clone());
            self.core.spawn(supervise(
                Arc::clone(&self.core),
                self.service.clone(),
                task,
                token,
                deadline,
                Arc::clone(&self.links),
            ));
        }
        Ok(infos)
    }

    fn events(&self) -> &EventBus<TaskEvent> {
        self.core.registry.events()
    }

    async fn cleanup(&self) {
        let (service, links) = (self.service.clone(), Arc::clone(&self.links));
        self.core
            .shutdown(|| async move {
                let unsettled: Vec<BuildId> = links.lock().builds.drain().map(|(build_id, _)| build_id).collect();
                for build_id in unsettled {
                    if let Err(err) = service.cancel_build(&build_id).await {
                        tracing::warn!(%build_id, error = %err, "cancelling build on close failed");
                    }
                }
            })
            .await;
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
