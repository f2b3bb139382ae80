//! Error types used by the runvisor supervision layer.
//!
//! - [`PlanError`]: errors surfaced to the caller of
//!   [`ExecutionSupervisor::execute`](crate::ExecutionSupervisor::execute).
//! - [`DispatchError`]: a gated handler faulted while a document was dispatched.
//! - [`HandlerError`]: what a [`GatedHandler`](crate::GatedHandler) returns on failure.
//! - [`DocumentError`]: a document was rejected at the boundary.
//! - [`CollaboratorError`]: an external collaborator call (alerts, remote client) failed.
//! - [`MonitorError`]: the remote event stream could not be followed.
//!
//! All enums provide `as_label` (stable snake_case label for logs/metrics).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by plan execution.
///
/// Watchdog expiry and shutdown are *infrastructure* failures; a failing plan is an
/// *experiment* failure. [`PlanError::is_infrastructure`] tells them apart.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PlanError {
    /// No liveness signal from the external callback process within the window.
    #[error("External callback watchdog timer expired. No reset within {window:?}")]
    WatchdogExpired {
        /// The configured watchdog window.
        window: Duration,
    },

    /// The plan itself failed.
    #[error("plan failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The plan was aborted (shutdown requested or explicit abort).
    #[error("plan aborted: {reason}")]
    Aborted {
        /// Why the plan was aborted.
        reason: String,
    },

    /// A gated observer faulted while handling a document emitted by the plan.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A document built by the plan was malformed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl PlanError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use runvisor::PlanError;
    /// use std::time::Duration;
    ///
    /// let err = PlanError::WatchdogExpired { window: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "plan_watchdog_expired");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PlanError::WatchdogExpired { .. } => "plan_watchdog_expired",
            PlanError::Failed { .. } => "plan_failed",
            PlanError::Aborted { .. } => "plan_aborted",
            PlanError::Dispatch(_) => "plan_dispatch_fault",
            PlanError::Document(_) => "plan_bad_document",
        }
    }

    /// True for failures of the supervision infrastructure rather than of the experiment.
    ///
    /// ```
    /// use runvisor::PlanError;
    /// use std::time::Duration;
    ///
    /// assert!(PlanError::WatchdogExpired { window: Duration::from_millis(100) }.is_infrastructure());
    /// assert!(!PlanError::Failed { error: "motor stalled".into() }.is_infrastructure());
    /// ```
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            PlanError::WatchdogExpired { .. } | PlanError::Aborted { .. }
        )
    }

    /// Builds a [`PlanError::Failed`] from anything printable.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        PlanError::Failed {
            error: error.to_string(),
        }
    }
}

/// Error returned by a gated handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// # Fault raised while dispatching a document to an observer.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// The gated handler of `listener` returned an error for a `document` kind.
    #[error("listener {listener} failed on {document}: {source}")]
    Handler {
        /// Listener name.
        listener: String,
        /// Document kind being handled (`start`, `descriptor`, `event`, `stop`).
        document: &'static str,
        /// The handler's error.
        source: HandlerError,
    },
}

impl DispatchError {
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Handler { .. } => "dispatch_handler_fault",
        }
    }
}

/// # Documents rejected at the boundary.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The payload could not be decoded into one of the four document kinds.
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required identifier was empty.
    #[error("{kind} document has an empty `{field}`")]
    EmptyField {
        kind: &'static str,
        field: &'static str,
    },

    /// A run was closed that is not open in this context.
    #[error("run {run_uid} is not open")]
    UnknownRun { run_uid: String },
}

impl DocumentError {
    pub fn as_label(&self) -> &'static str {
        match self {
            DocumentError::Malformed(_) => "document_malformed",
            DocumentError::EmptyField { .. } => "document_empty_field",
            DocumentError::UnknownRun { .. } => "document_unknown_run",
        }
    }
}

/// # Failure reported by an external collaborator.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CollaboratorError {
    /// The remote side could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The remote side rejected the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl CollaboratorError {
    pub fn as_label(&self) -> &'static str {
        match self {
            CollaboratorError::Unavailable(_) => "collaborator_unavailable",
            CollaboratorError::Rejected(_) => "collaborator_rejected",
        }
    }
}

/// # Errors while following a delegated task.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The client's event stream ended before the task finished.
    #[error("remote event stream closed before task {task_id} finished")]
    StreamClosed { task_id: String },

    /// A document relayed from the remote service faulted an observer.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl MonitorError {
    pub fn as_label(&self) -> &'static str {
        match self {
            MonitorError::StreamClosed { .. } => "monitor_stream_closed",
            MonitorError::Dispatch(_) => "monitor_dispatch_fault",
        }
    }
}
