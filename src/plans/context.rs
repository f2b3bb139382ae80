//! # Execution context handed to a running plan.
//!
//! [`PlanContext`] is the plan's only way to talk to the outside world:
//! - emits run documents to the supervisor's [`DocumentRouter`] (synchronously),
//! - tracks which runs are open so they can be closed if the plan dies,
//! - exposes cooperative cancellation ([`checkpoint`](PlanContext::checkpoint),
//!   [`sleep`](PlanContext::sleep)),
//! - exposes the supervisor's [`Watchdog`] for plans that relay heartbeats.
//!
//! ## Rules
//! - Documents are validated before dispatch; a malformed one is an error.
//! - A listener fault is published as `ListenerFault` and returned as `PlanError::Dispatch`.
//! - Runs are closed innermost first by the supervisor when the plan fails.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::Watchdog;
use crate::documents::{DataEvent, Descriptor, Document, DocumentRouter, ExitStatus, RunStart, RunStop};
use crate::error::{DocumentError, PlanError};
use crate::events::{Bus, Event, EventKind};

/// Cloneable handle given to [`Plan::run`](crate::Plan::run).
#[derive(Clone)]
pub struct PlanContext {
    plan: Arc<str>,
    token: CancellationToken,
    router: Arc<DocumentRouter>,
    watchdog: Watchdog,
    bus: Bus,
    open_runs: Arc<Mutex<Vec<String>>>,
}

impl PlanContext {
    pub(crate) fn new(
        plan: impl Into<Arc<str>>,
        token: CancellationToken,
        router: Arc<DocumentRouter>,
        watchdog: Watchdog,
        bus: Bus,
    ) -> Self {
        Self {
            plan: plan.into(),
            token,
            router,
            watchdog,
            bus,
            open_runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn plan_name(&self) -> &str {
        &self.plan
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancellation point between steps.
    ///
    /// Yields to the scheduler, then fails with `PlanError::Aborted` if the
    /// execution was cancelled.
    pub async fn checkpoint(&self) -> Result<(), PlanError> {
        tokio::task::yield_now().await;
        if self.token.is_cancelled() {
            return Err(PlanError::Aborted {
                reason: "cancelled at checkpoint".into(),
            });
        }
        Ok(())
    }

    /// Sleeps for `dur` unless the execution is cancelled first.
    pub async fn sleep(&self, dur: Duration) -> Result<(), PlanError> {
        tokio::select! {
            _ = tokio::time::sleep(dur) => Ok(()),
            _ = self.token.cancelled() => Err(PlanError::Aborted {
                reason: "cancelled while sleeping".into(),
            }),
        }
    }

    /// Emits a RunStart and records the run as open; returns its uid.
    pub fn open_run(&self, start: RunStart) -> Result<String, PlanError> {
        let uid = start.run_uid.clone();
        let doc = Document::RunStart(start);
        doc.validate()?;
        self.runs().push(uid.clone());
        self.dispatch(&doc)?;
        Ok(uid)
    }

    /// Emits a Descriptor for `run_uid`; returns the new descriptor uid.
    pub fn descriptor(&self, run_uid: &str, name: impl Into<String>) -> Result<String, PlanError> {
        if !self.runs().iter().any(|r| r == run_uid) {
            return Err(DocumentError::UnknownRun {
                run_uid: run_uid.to_string(),
            }
            .into());
        }
        let descriptor_uid = uuid::Uuid::new_v4().to_string();
        self.dispatch(&Document::Descriptor(Descriptor {
            descriptor_uid: descriptor_uid.clone(),
            run_uid: run_uid.to_string(),
            name: name.into(),
        }))?;
        Ok(descriptor_uid)
    }

    /// Emits one DataEvent.
    pub fn event(
        &self,
        descriptor_uid: &str,
        data: BTreeMap<String, serde_json::Value>,
    ) -> Result<(), PlanError> {
        let doc = Document::DataEvent(DataEvent {
            descriptor_uid: descriptor_uid.to_string(),
            data,
        });
        doc.validate()?;
        self.dispatch(&doc)
    }

    /// Emits the RunStop for an open run.
    pub fn close_run(&self, run_uid: &str, exit_status: ExitStatus) -> Result<(), PlanError> {
        {
            let mut runs = self.runs();
            let Some(pos) = runs.iter().rposition(|r| r == run_uid) else {
                return Err(DocumentError::UnknownRun {
                    run_uid: run_uid.to_string(),
                }
                .into());
            };
            runs.remove(pos);
        }
        self.dispatch(&Document::RunStop(RunStop {
            run_start: run_uid.to_string(),
            exit_status,
            reason: None,
        }))
    }

    /// Uids of runs opened and not yet closed, outermost first.
    pub fn open_runs(&self) -> Vec<String> {
        self.runs().clone()
    }

    /// Closes every run still open, innermost first.
    ///
    /// Observer faults here are logged only: the plan's own error is what the
    /// caller needs to see.
    pub(crate) fn close_open_runs(&self, exit_status: ExitStatus, reason: &str) {
        let runs: Vec<String> = std::mem::take(&mut *self.runs());
        for run_uid in runs.into_iter().rev() {
            let doc = Document::RunStop(RunStop {
                run_start: run_uid.clone(),
                exit_status,
                reason: Some(reason.to_string()),
            });
            if let Err(e) = self.router.dispatch(&doc) {
                warn!(plan = %self.plan, run_uid = %run_uid, error = %e, "observer fault while closing run");
            }
        }
    }

    fn dispatch(&self, doc: &Document) -> Result<(), PlanError> {
        self.router.dispatch(doc).map_err(|e| {
            self.bus.publish(
                Event::new(EventKind::ListenerFault)
                    .with_plan(Arc::clone(&self.plan))
                    .with_reason(e.to_string()),
            );
            PlanError::Dispatch(e)
        })
    }

    fn runs(&self) -> MutexGuard<'_, Vec<String>> {
        self.open_runs.lock().unwrap_or_else(|p| p.into_inner())
    }
}
