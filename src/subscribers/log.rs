//! # LogWriter: renders supervision events through `tracing`.
//!
//! Infrastructure problems (watchdog expiry, stuck tasks, failed cancellation)
//! are logged at `error`, informational escalations at `warn`, lifecycle at `info`.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let plan = e.plan.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::PlanStarting => info!(seq = e.seq, plan, "plan starting"),
            EventKind::PlanFinished => info!(seq = e.seq, plan, "plan finished"),
            EventKind::PlanFailed => warn!(seq = e.seq, plan, reason, "plan failed"),
            EventKind::WatchdogExpired => {
                error!(seq = e.seq, plan, window_ms = ?e.timeout_ms, "external callback watchdog expired")
            }
            EventKind::ListenerFault => error!(seq = e.seq, plan, reason, "observer fault"),
            EventKind::ShutdownRequested => info!(seq = e.seq, "shutdown requested"),
            EventKind::MonitorStarted => {
                info!(seq = e.seq, task, timeout_ms = ?e.timeout_ms, "monitoring remote task")
            }
            EventKind::MonitorStopped => info!(seq = e.seq, task, "stopped monitoring remote task"),
            EventKind::BeamWaitChanged => info!(seq = e.seq, task, state = reason, "beam wait changed"),
            EventKind::EscalationWaiting => warn!(seq = e.seq, task, reason, "still waiting for beam"),
            EventKind::EscalationStuck => {
                error!(seq = e.seq, task, timeout_ms = ?e.timeout_ms, "remote task stuck")
            }
            EventKind::CancelRequested => warn!(seq = e.seq, task, reason, "cancellation requested"),
            EventKind::CancelFailed => error!(seq = e.seq, task, reason, "cancellation request failed"),
            EventKind::AlertFailed => error!(seq = e.seq, task, reason, "alert could not be raised"),
            EventKind::SubscriberOverflow => warn!(seq = e.seq, subscriber = task, reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => error!(seq = e.seq, subscriber = task, reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
