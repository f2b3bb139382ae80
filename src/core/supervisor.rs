//! # ExecutionSupervisor: watchdog-protected, sequential plan execution.
//!
//! The [`ExecutionSupervisor`] owns the supervision event bus, the document
//! router feeding gated observers, and the external callback [`Watchdog`].
//!
//! ## Key responsibilities
//! - run plans **one at a time** (`execute` calls are serialized)
//! - abort the running plan when the callback process stays silent for a whole
//!   watchdog window (counted from the start of the plan, then from each reset)
//! - close runs left open by failed plans so observers see a RunStop
//! - orderly shutdown on request or OS signal, flushing pending events to subscribers
//!
//! ## Architecture
//! ```text
//! caller ──► execute(plan) ──► [exec lock] ──► runner::run_plan(plan, ctx, watchdog)
//!                                                   │          │
//!                                   ctx.open_run()..│          └──► Bus ──► SubscriberSet ──► LogWriter, ...
//!                                                   ▼
//!                                         DocumentRouter ──► ActivationGate ──► GatedHandler
//!
//! external callback process ── heartbeat ──► reset_callback_watchdog_timer()
//! OS signal / shutdown() ──► runtime_token.cancel() ──► running plan aborted
//!                       └──► event listener drained and stopped
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Config, ExecutionSupervisor, PlanContext, PlanError, PlanFn, PlanRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), PlanError> {
//!     let mut cfg = Config::default();
//!     cfg.watchdog_window = Duration::from_secs(5);
//!     let sup = ExecutionSupervisor::builder(cfg).build();
//!
//!     let plan: PlanRef = PlanFn::arc("noop", |ctx: PlanContext| async move {
//!         ctx.checkpoint().await
//!     });
//!
//!     sup.reset_callback_watchdog_timer();
//!     sup.execute(plan).await
//! }
//! ```

use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{runner::run_plan, shutdown::termination_signal, Config, Watchdog};
use crate::documents::{DocumentListener, DocumentRouter, ListenerId};
use crate::error::PlanError;
use crate::events::{Bus, Event, EventKind};
use crate::plans::{PlanContext, PlanRef};
use crate::subscribers::SubscriberSet;

/// Runs plans in-process under the external callback watchdog.
pub struct ExecutionSupervisor {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    router: Arc<DocumentRouter>,
    watchdog: Watchdog,
    runtime_token: CancellationToken,
    exec_lock: AsyncMutex<()>,
    listener_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ExecutionSupervisor {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        router: Arc<DocumentRouter>,
        listener_token: CancellationToken,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        let watchdog = Watchdog::new(cfg.watchdog_window);
        Self {
            cfg,
            bus,
            subs,
            router,
            watchdog,
            runtime_token: CancellationToken::new(),
            exec_lock: AsyncMutex::new(()),
            listener_token,
            listener: Mutex::new(listener),
        }
    }

    /// Starts building a supervisor.
    pub fn builder(cfg: Config) -> crate::core::builder::SupervisorBuilder {
        crate::core::builder::SupervisorBuilder::new(cfg)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Supervision event bus; share it with [`RemoteTaskMonitor`](crate::RemoteTaskMonitor)s.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of supervision event subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    pub fn router(&self) -> &Arc<DocumentRouter> {
        &self.router
    }

    /// Handle for heartbeat sources living in other tasks or threads.
    pub fn watchdog(&self) -> Watchdog {
        self.watchdog.clone()
    }

    /// Registers an observer for the documents of every subsequent plan.
    pub fn subscribe(&self, listener: Arc<dyn DocumentListener>) -> ListenerId {
        self.router.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.router.unsubscribe(id)
    }

    /// Liveness signal from the external callback process.
    pub fn reset_callback_watchdog_timer(&self) {
        self.watchdog.reset();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Runs `plan` to completion, failure or abort.
    ///
    /// Waits for any plan already running to finish first.
    ///
    /// # Errors
    /// - [`PlanError::WatchdogExpired`] when the external callback process was
    ///   silent for longer than the watchdog window while the plan ran;
    /// - [`PlanError::Aborted`] after [`shutdown`](Self::shutdown);
    /// - whatever the plan itself returned.
    pub async fn execute(&self, plan: PlanRef) -> Result<(), PlanError> {
        let _running = self.exec_lock.lock().await;
        if self.is_shutting_down() {
            return Err(PlanError::Aborted {
                reason: "supervisor is shutting down".into(),
            });
        }

        let token = self.runtime_token.child_token();
        let ctx = PlanContext::new(
            plan.name(),
            token.clone(),
            Arc::clone(&self.router),
            self.watchdog.clone(),
            self.bus.clone(),
        );
        run_plan(
            plan.as_ref(),
            ctx,
            &token,
            &self.watchdog,
            self.cfg.poll_interval(),
            &self.bus,
        )
        .await
    }

    /// Requests orderly termination.
    ///
    /// Cancels the running plan (if any), refuses new ones, and waits up to
    /// `Config::shutdown_grace` for the running plan to unwind. Events already
    /// published are then handed to the subscribers and the event listener
    /// stops. Never fails.
    pub async fn shutdown(&self) {
        self.shutdown_with_reason("requested").await;
    }

    /// Spawns a task that calls [`shutdown`](Self::shutdown) on SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere).
    ///
    /// The signal name becomes the reason of the `ShutdownRequested` event.
    /// The task ends without side effects once the supervisor shuts down by
    /// other means.
    pub fn shutdown_on_signal(self: &Arc<Self>) -> JoinHandle<()> {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                res = termination_signal() => match res {
                    Ok(signal) => {
                        info!(%signal, "termination signal received");
                        me.shutdown_with_reason(signal.as_str()).await;
                    }
                    Err(e) => warn!(error = %e, "could not listen for termination signals"),
                },
                _ = me.runtime_token.cancelled() => {}
            }
        })
    }

    async fn shutdown_with_reason(&self, reason: &str) {
        if !self.runtime_token.is_cancelled() {
            info!(reason, "shutdown requested");
            self.bus
                .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
            self.runtime_token.cancel();
        }

        let grace = self.cfg.shutdown_grace;
        if tokio::time::timeout(grace, self.exec_lock.lock()).await.is_err() {
            warn!(?grace, "running plan did not unwind within shutdown grace");
        }
        self.watchdog.disarm();

        self.listener_token.cancel();
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = listener {
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!(?grace, "event listener did not stop within shutdown grace");
            }
        }
    }
}
