//! # Supervision events emitted by the supervisor and the remote monitors.
//!
//! [`EventKind`] classifies events across four categories:
//! - **Plan lifecycle**: local execution flow (starting, finished, failed, watchdog)
//! - **Remote escalation**: monitor state changes, alerts and cancellation requests
//! - **Shutdown**: termination requested
//! - **Subscriber health**: overflow and panics in subscriber workers
//!
//! These are *observability* events, distinct from the run [`Document`](crate::Document)s
//! consumed by gated observers.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::EscalationStuck)
//!     .with_task("task-42")
//!     .with_reason("no progress")
//!     .with_timeout(Duration::from_secs(600));
//!
//! assert_eq!(ev.kind, EventKind::EscalationStuck);
//! assert_eq!(ev.task.as_deref(), Some("task-42"));
//! assert_eq!(ev.timeout_ms, Some(600_000));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervision events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `task` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `task` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Local execution ===
    /// A plan is about to run.
    ///
    /// Sets `plan`.
    PlanStarting,

    /// A plan completed normally.
    ///
    /// Sets `plan`.
    PlanFinished,

    /// A plan returned an error (including watchdog expiry).
    ///
    /// Sets `plan`, `reason`.
    PlanFailed,

    /// The external callback watchdog expired; the plan is being aborted.
    ///
    /// Sets `plan`, `timeout_ms` (watchdog window).
    WatchdogExpired,

    /// A gated observer faulted on a document.
    ///
    /// Sets `plan` (if local), `reason`.
    ListenerFault,

    /// Shutdown requested (signal or explicit call).
    ShutdownRequested,

    // === Remote escalation ===
    /// A monitor scope was entered and its escalation timer armed.
    ///
    /// Sets `task`, `timeout_ms`.
    MonitorStarted,

    /// A monitor scope was exited; no escalation fires after this.
    ///
    /// Sets `task`.
    MonitorStopped,

    /// The task started or stopped waiting for beam.
    ///
    /// Sets `task`, `reason` (`"waiting"` or `"resumed"`).
    BeamWaitChanged,

    /// Escalation timer expired while waiting for beam; informational alert raised.
    ///
    /// Sets `task`, `reason` (alert content).
    EscalationWaiting,

    /// Escalation timer expired without progress; task considered stuck.
    ///
    /// Sets `task`, `timeout_ms`.
    EscalationStuck,

    /// Cancellation of the remote task was requested.
    ///
    /// Sets `task`, `reason`.
    CancelRequested,

    /// Cancellation request could not be submitted.
    ///
    /// Sets `task`, `reason` (client error).
    CancelFailed,

    /// The alert service rejected or failed an alert.
    ///
    /// Sets `task`, `reason`.
    AlertFailed,
}

/// Supervision event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the local plan, if applicable.
    pub plan: Option<Arc<str>>,
    /// Remote task id (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, alert text, etc.).
    pub reason: Option<Arc<str>>,
    /// Timer duration in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            plan: None,
            task: None,
            reason: None,
            timeout_ms: None,
        }
    }

    #[inline]
    pub fn with_plan(mut self, plan: impl Into<Arc<str>>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timer duration (stored as milliseconds, saturating).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::PlanStarting);
        let b = Event::new(EventKind::PlanFinished);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn timeout_saturates() {
        let ev = Event::new(EventKind::MonitorStarted).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
