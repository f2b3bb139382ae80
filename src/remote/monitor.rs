//! # RemoteTaskMonitor: liveness escalation for delegated tasks.
//!
//! A task delegated to the remote execution service is either **progressing**,
//! legitimately **waiting for beam**, or **stuck**. The monitor tells these
//! apart from the progress notifications the service publishes and escalates
//! through the [`AlertService`] and the [`RemoteTaskClient`].
//!
//! ## State machine
//! ```text
//!            enter()                       progress: beam status pending
//!   Idle ─────────────► Armed ─────────────────────────────► WaitingForBeam
//!                        ▲  │ ◄──────────────────────────────────┘  │
//!                        │  │     progress: beam status reached     │
//!                        │  │                                       │ timer expiry:
//!                        │  │ timer expiry:                         │ "paused waiting
//!                        │  ▼ abort + "stuck" alert                 │  for beam" alert,
//!                        │ Idle (timer not re-armed)                │  re-arm
//!                        └──────────────────────────────────────────┘
//! ```
//! Every state change re-arms the escalation timer. Exactly one timer is live
//! per monitor; arming a new one aborts the previous one first, and a stale
//! timer that already woke up is discarded by its generation number.
//!
//! ## Scope
//! Monitoring is bracketed by [`RemoteTaskMonitor::enter`], which returns a
//! [`MonitorScope`] guard. Dropping the guard (normal exit, error, panic or a
//! dropped future) cancels the timer; no escalation fires afterwards.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::alert::{extract_alert_metadata, AlertMetadata, AlertRecord, AlertService};
use super::client::{ProgressNotification, RemoteEvent, RemoteTaskClient, TaskOutcome};
use crate::core::Config;
use crate::documents::DocumentRouter;
use crate::error::MonitorError;
use crate::events::{Bus, Event, EventKind};

/// Observable phase of a [`RemoteTaskMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Not monitoring: scope not entered, exited, or escalated as stuck.
    Idle,
    /// Timer armed, task progressing.
    Armed,
    /// Timer armed, task paused on the beam status.
    WaitingForBeam,
}

/// Watches one delegated task.
pub struct RemoteTaskMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    task_id: String,
    status_name: String,
    timeout: Duration,
    metadata: AlertMetadata,
    client: Arc<dyn RemoteTaskClient>,
    alerts: Arc<dyn AlertService>,
    bus: OnceLock<Bus>,
    state: Mutex<MonitorState>,
}

#[derive(Default)]
struct MonitorState {
    in_scope: bool,
    is_waiting_for_beam: bool,
    start_time: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

enum Escalation {
    Waiting { elapsed: Duration },
    Stuck,
}

impl RemoteTaskMonitor {
    /// Creates a monitor for `task_id`.
    ///
    /// `params` are the parameters the task was submitted with; sample
    /// metadata for alerts is read from them once, here.
    pub fn new(
        cfg: &Config,
        task_id: impl Into<String>,
        params: &serde_json::Value,
        client: Arc<dyn RemoteTaskClient>,
        alerts: Arc<dyn AlertService>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                task_id: task_id.into(),
                status_name: cfg.beam_status_name.clone(),
                timeout: cfg.escalation_timeout(),
                metadata: extract_alert_metadata(params),
                client,
                alerts,
                bus: OnceLock::new(),
                state: Mutex::new(MonitorState::default()),
            }),
        }
    }

    /// Publishes escalation events on `bus` (typically the supervisor's).
    ///
    /// The first bus attached wins; later calls are logged and ignored.
    pub fn with_bus(self, bus: Bus) -> Self {
        if self.inner.bus.set(bus).is_err() {
            warn!(task = %self.inner.task_id, "monitor already publishes on a bus, keeping it");
        }
        self
    }

    pub fn task_id(&self) -> &str {
        &self.inner.task_id
    }

    pub fn metadata(&self) -> &AlertMetadata {
        &self.inner.metadata
    }

    pub fn phase(&self) -> MonitorPhase {
        let st = self.inner.lock();
        match (st.timer.is_some(), st.is_waiting_for_beam) {
            (false, _) => MonitorPhase::Idle,
            (true, false) => MonitorPhase::Armed,
            (true, true) => MonitorPhase::WaitingForBeam,
        }
    }

    pub fn is_waiting_for_beam(&self) -> bool {
        self.inner.lock().is_waiting_for_beam
    }

    /// Enters the monitoring scope: records the start time and arms the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enter(&self) -> MonitorScope<'_> {
        {
            let mut st = self.inner.lock();
            st.in_scope = true;
            st.is_waiting_for_beam = false;
            st.start_time = Some(Instant::now());
            self.inner.arm(&mut st);
        }
        info!(task = %self.inner.task_id, timeout = ?self.inner.timeout, "monitoring remote task");
        self.inner.publish(
            Event::new(EventKind::MonitorStarted)
                .with_task(self.inner.task_id.as_str())
                .with_timeout(self.inner.timeout),
        );
        MonitorScope { monitor: self }
    }

    /// Feeds one progress notification into the state machine.
    ///
    /// Ignored outside the scope, for other tasks, and when the beam status is absent.
    pub fn on_progress(&self, notification: &ProgressNotification) {
        if notification.task_id != self.inner.task_id {
            return;
        }
        let Some(status) = notification.status(&self.inner.status_name) else {
            return;
        };
        let waiting = status.is_pending();

        {
            let mut st = self.inner.lock();
            if !st.in_scope || st.is_waiting_for_beam == waiting {
                return;
            }
            st.is_waiting_for_beam = waiting;
            self.inner.arm(&mut st);
        }

        let what = if waiting { "waiting" } else { "resumed" };
        debug!(task = %self.inner.task_id, state = what, "beam wait changed");
        self.inner.publish(
            Event::new(EventKind::BeamWaitChanged)
                .with_task(self.inner.task_id.as_str())
                .with_reason(what),
        );
    }

    /// Follows the task until it finishes.
    ///
    /// Subscribes to the client, enters the scope, and pumps events: progress
    /// drives the state machine, documents go to `router` (if any), and the
    /// task's `Finished` event ends monitoring. Events for other tasks are
    /// skipped. The scope is exited on every return path and on drop.
    ///
    /// # Errors
    /// - [`MonitorError::StreamClosed`] if the client's stream ends first;
    /// - [`MonitorError::Dispatch`] if an observer faults on a relayed document.
    pub async fn supervise(
        &self,
        router: Option<&DocumentRouter>,
    ) -> Result<TaskOutcome, MonitorError> {
        let mut rx = self.inner.client.subscribe();
        let _scope = self.enter();

        loop {
            let ev = match rx.recv().await {
                Ok(ev) => ev,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(task = %self.inner.task_id, skipped, "remote event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => {
                    return Err(MonitorError::StreamClosed {
                        task_id: self.inner.task_id.clone(),
                    })
                }
            };
            if ev.task_id() != self.inner.task_id {
                continue;
            }
            match ev {
                RemoteEvent::Progress(p) => self.on_progress(&p),
                RemoteEvent::Document { document, .. } => {
                    if let Some(router) = router {
                        router.dispatch(&document)?;
                    }
                }
                RemoteEvent::Finished { outcome, .. } => return Ok(outcome),
            }
        }
    }

    fn exit(&self) {
        {
            let mut st = self.inner.lock();
            if !st.in_scope {
                return;
            }
            st.in_scope = false;
            st.generation = st.generation.wrapping_add(1);
            if let Some(timer) = st.timer.take() {
                timer.abort();
            }
        }
        debug!(task = %self.inner.task_id, "left monitoring scope");
        self.inner.publish(
            Event::new(EventKind::MonitorStopped).with_task(self.inner.task_id.as_str()),
        );
    }
}

/// Guard returned by [`RemoteTaskMonitor::enter`]; exits the scope on drop.
#[must_use = "monitoring stops as soon as the scope guard is dropped"]
pub struct MonitorScope<'a> {
    monitor: &'a RemoteTaskMonitor,
}

impl Drop for MonitorScope<'_> {
    fn drop(&mut self) {
        self.monitor.exit();
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn publish(&self, ev: Event) {
        if let Some(bus) = self.bus.get() {
            bus.publish(ev);
        }
    }

    /// Cancels the live timer (if any) and arms a fresh one.
    fn arm(self: &Arc<Self>, st: &mut MonitorState) {
        if let Some(old) = st.timer.take() {
            old.abort();
        }
        self.spawn_timer(st);
    }

    fn spawn_timer(self: &Arc<Self>, st: &mut MonitorState) {
        st.generation = st.generation.wrapping_add(1);
        let generation = st.generation;
        let me = Arc::clone(self);
        st.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(me.timeout).await;
            me.on_expired(generation);
        }));
    }

    /// Runs on the timer task once the timeout elapsed.
    fn on_expired(self: &Arc<Self>, generation: u64) {
        let escalation = {
            let mut st = self.lock();
            if !st.in_scope || st.generation != generation {
                return;
            }
            // The handle in `st.timer` is this task; detach it rather than abort it.
            st.timer = None;
            if st.is_waiting_for_beam {
                self.spawn_timer(&mut st);
                Escalation::Waiting {
                    elapsed: st.start_time.map(|t| t.elapsed()).unwrap_or_default(),
                }
            } else {
                Escalation::Stuck
            }
        };

        let me = Arc::clone(self);
        tokio::spawn(async move { me.escalate(escalation).await });
    }

    async fn escalate(&self, escalation: Escalation) {
        let task = self.task_id.as_str();
        let record = match escalation {
            Escalation::Waiting { elapsed } => {
                let rec = AlertRecord::waiting_for_beam(task, elapsed, self.metadata.clone());
                info!(task, ?elapsed, "task still waiting for beam");
                self.publish(
                    Event::new(EventKind::EscalationWaiting)
                        .with_task(task)
                        .with_reason(rec.content.as_str()),
                );
                rec
            }
            Escalation::Stuck => {
                error!(task, timeout = ?self.timeout, "task made no progress, cancelling");
                self.publish(
                    Event::new(EventKind::EscalationStuck)
                        .with_task(task)
                        .with_timeout(self.timeout),
                );
                self.request_abort().await;
                AlertRecord::stuck(task, self.timeout, self.metadata.clone())
            }
        };

        if let Err(e) = self.alerts.raise_alert(&record).await {
            warn!(task, error = %e, label = e.as_label(), "alert could not be raised");
            self.publish(
                Event::new(EventKind::AlertFailed)
                    .with_task(task)
                    .with_reason(e.to_string()),
            );
        }
    }

    async fn request_abort(&self) {
        let task = self.task_id.as_str();
        let reason = format!("no progress for {}s", self.timeout.as_secs());
        match self.client.abort(&reason).await {
            Ok(()) => self.publish(
                Event::new(EventKind::CancelRequested)
                    .with_task(task)
                    .with_reason(reason),
            ),
            Err(e) => {
                warn!(task, error = %e, label = e.as_label(), "cancellation request failed");
                self.publish(
                    Event::new(EventKind::CancelFailed)
                        .with_task(task)
                        .with_reason(e.to_string()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::remote::client::StatusView;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::broadcast;
    use tokio::time::sleep;

    #[derive(Default)]
    struct Recorder {
        aborts: Mutex<Vec<String>>,
        alerts: Mutex<Vec<AlertRecord>>,
    }

    struct FakeClient(Arc<Recorder>, broadcast::Sender<RemoteEvent>);

    #[async_trait]
    impl RemoteTaskClient for FakeClient {
        async fn abort(&self, reason: &str) -> Result<(), CollaboratorError> {
            self.0.aborts.lock().unwrap().push(reason.to_string());
            Ok(())
        }
        fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
            self.1.subscribe()
        }
    }

    struct FakeAlerts(Arc<Recorder>);

    #[async_trait]
    impl AlertService for FakeAlerts {
        async fn raise_alert(&self, alert: &AlertRecord) -> Result<(), CollaboratorError> {
            self.0.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    fn monitor(timeout_ms: u64) -> (RemoteTaskMonitor, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let (tx, _) = broadcast::channel(16);
        let cfg = Config {
            escalation_timeout: Duration::from_millis(timeout_ms),
            ..Config::default()
        };
        let m = RemoteTaskMonitor::new(
            &cfg,
            "t-1",
            &serde_json::Value::Null,
            Arc::new(FakeClient(rec.clone(), tx)),
            Arc::new(FakeAlerts(rec.clone())),
        );
        (m, rec)
    }

    fn beam(task_id: &str, current: f64, target: f64) -> ProgressNotification {
        let view = StatusView {
            display_name: "wait_for_beam".into(),
            current,
            initial: 0.0,
            target,
        };
        ProgressNotification {
            task_id: task_id.into(),
            statuses: HashMap::from([("s1".to_string(), view)]),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_escalation_after_scope_exit() {
        let (m, rec) = monitor(100);
        {
            let _scope = m.enter();
            sleep(Duration::from_millis(50)).await;
        }
        sleep(Duration::from_millis(500)).await;

        assert_eq!(m.phase(), MonitorPhase::Idle);
        assert!(rec.aborts.lock().unwrap().is_empty());
        assert!(rec.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_for_other_tasks_are_ignored() {
        let (m, _rec) = monitor(100);
        let _scope = m.enter();

        m.on_progress(&beam("t-2", 0.0, 1.0));
        assert_eq!(m.phase(), MonitorPhase::Armed);

        m.on_progress(&beam("t-1", 0.0, 1.0));
        assert_eq!(m.phase(), MonitorPhase::WaitingForBeam);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_state_does_not_push_back_the_deadline() {
        let (m, rec) = monitor(100);
        let _scope = m.enter();

        for _ in 0..5 {
            sleep(Duration::from_millis(30)).await;
            m.on_progress(&beam("t-1", 1.0, 1.0));
        }
        // Progress never changed state, so the first timer (armed at enter) fired at 100ms.
        assert_eq!(rec.aborts.lock().unwrap().len(), 1);
        assert_eq!(rec.alerts.lock().unwrap().len(), 1);
        assert_eq!(m.phase(), MonitorPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn bus_attached_after_a_scope_still_receives_events() {
        let (m, _rec) = monitor(100);
        {
            // Leaves an aborted timer task holding a reference to the monitor state.
            let _scope = m.enter();
        }

        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let m = m.with_bus(bus).with_bus(Bus::new(16));
        {
            let _scope = m.enter();
        }

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).map(|ev| ev.kind).collect();
        assert_eq!(kinds, [EventKind::MonitorStarted, EventKind::MonitorStopped]);
    }
}
