//! # Remote execution service boundary.
//!
//! The remote service runs the delegated task and reports back through a
//! stream of [`RemoteEvent`]s; the only command this crate sends it is
//! [`RemoteTaskClient::abort`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::documents::Document;
use crate::error::CollaboratorError;

/// Progress of one status tracked by the remote task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub display_name: String,
    pub current: f64,
    pub initial: f64,
    pub target: f64,
}

impl StatusView {
    /// True while `current` has not reached `target`.
    pub fn is_pending(&self) -> bool {
        self.current != self.target
    }
}

/// Snapshot of the statuses a remote task is waiting on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressNotification {
    pub task_id: String,
    #[serde(default)]
    pub statuses: HashMap<String, StatusView>,
}

impl ProgressNotification {
    /// Finds the status whose display name is `display_name`.
    pub fn status(&self, display_name: &str) -> Option<&StatusView> {
        self.statuses
            .values()
            .find(|s| s.display_name == display_name)
    }
}

/// How a delegated task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    Failed { error: String },
    Cancelled,
}

/// Everything the remote service reports about its tasks.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    Progress(ProgressNotification),
    /// A run document produced by the remote execution engine.
    Document { task_id: String, document: Document },
    Finished { task_id: String, outcome: TaskOutcome },
}

impl RemoteEvent {
    pub fn task_id(&self) -> &str {
        match self {
            RemoteEvent::Progress(p) => &p.task_id,
            RemoteEvent::Document { task_id, .. } | RemoteEvent::Finished { task_id, .. } => task_id,
        }
    }
}

/// Client of the remote execution service. Externally owned and shared.
#[async_trait]
pub trait RemoteTaskClient: Send + Sync + 'static {
    /// Best-effort request to abort the task currently running remotely.
    async fn abort(&self, reason: &str) -> Result<(), CollaboratorError>;

    /// New receiver for subsequent remote events.
    fn subscribe(&self) -> broadcast::Receiver<RemoteEvent>;
}
