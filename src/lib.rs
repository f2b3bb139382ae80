//! # runvisor
//!
//! **Runvisor** is the supervision layer of an unattended data collection
//! system. It keeps long-running experiment procedures from hanging silently
//! and keeps side-effecting observers from acting on runs they do not own.
//!
//! It provides three mechanisms:
//! - [`ActivationGate`] limits a document observer to the run that activated it;
//! - [`ExecutionSupervisor`] runs plans in-process under a watchdog that an
//!   external callback process must keep resetting;
//! - [`RemoteTaskMonitor`] follows a task delegated to a remote execution
//!   service, raising alerts when it waits for beam and cancelling it when stuck.
//!
//! ## Architecture
//! ```text
//!                 ┌──────────────┐                      ┌──────────────────┐
//!   caller ──────►│ Execution    │ plan docs            │ RemoteTaskClient │
//!                 │ Supervisor   │──────────┐           └───┬──────────┬───┘
//!  heartbeat ────►│  (watchdog)  │          │  remote docs  │ progress │ abort
//!                 └──────┬───────┘          ▼               ▼          ▼
//!                        │         ┌────────────────┐  ┌───────────────────┐
//!                        │         │ DocumentRouter │◄─│ RemoteTaskMonitor │──► AlertService
//!                        │         └───────┬────────┘  └─────────┬─────────┘
//!                        │                 ▼                     │
//!                        │      ActivationGate ──► GatedHandler  │
//!                        │                                       │
//!                        ▼          Events                       ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                         Bus (broadcast channel)                       │
//! └───────────────────────────────────┬───────────────────────────────────┘
//!                                     ▼
//!                       SubscriberSet (per-sub queues)
//!                          ┌──────────┼──────────┐
//!                          ▼          ▼          ▼
//!                      LogWriter   metrics    paging ...
//! ```
//!
//! ## Features
//! | Area                | Description                                                   | Key types / traits                                  |
//! |---------------------|---------------------------------------------------------------|-----------------------------------------------------|
//! | **Documents**       | Run-structured event stream and its synchronous delivery.     | [`Document`], [`DocumentRouter`], [`DocumentListener`] |
//! | **Gating**          | One active run per observer, explicit or first-run activation. | [`ActivationGate`], [`GatedHandler`]                |
//! | **Local execution** | Sequential, watchdog-protected, abortable plans.              | [`ExecutionSupervisor`], [`Plan`], [`PlanFn`]       |
//! | **Remote tasks**    | Waiting-for-beam alerts and stuck-task cancellation.          | [`RemoteTaskMonitor`], [`AlertService`]             |
//! | **Subscriber API**  | Hook into supervision events (logging, metrics, paging).      | [`Subscribe`], [`LogWriter`]                        |
//! | **Errors**          | Typed errors for plans, dispatch and collaborators.           | [`PlanError`], [`DispatchError`], [`MonitorError`]  |
//! | **Configuration**   | Centralized timer settings.                                   | [`Config`]                                          |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use runvisor::{
//!     ActivationGate, Config, DocumentListener, ExecutionSupervisor, ExitStatus, GatedHandler,
//!     HandlerError, LogWriter, PlanContext, PlanFn, PlanRef, RunStart, Subscribe,
//! };
//!
//! struct Recorder;
//! impl GatedHandler for Recorder {
//!     fn name(&self) -> &str { "recorder" }
//!     fn start(&self, doc: &RunStart) -> Result<(), HandlerError> {
//!         println!("recording run {}", doc.run_uid);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.watchdog_window = Duration::from_secs(5);
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let gate: Arc<dyn DocumentListener> = ActivationGate::arc(Arc::new(Recorder));
//!     let sup = ExecutionSupervisor::builder(cfg)
//!         .with_subscribers(subs)
//!         .with_listeners(vec![gate])
//!         .build();
//!
//!     let collect: PlanRef = PlanFn::arc("collect", |ctx: PlanContext| async move {
//!         let run = ctx.open_run(RunStart::generate().with_activate_callbacks(["recorder"]))?;
//!         ctx.checkpoint().await?;
//!         ctx.close_run(&run, ExitStatus::Success)
//!     });
//!
//!     sup.reset_callback_watchdog_timer();
//!     sup.execute(collect).await?;
//!     sup.shutdown().await;
//!     Ok(())
//! }
//! ```

mod core;
mod documents;
mod error;
mod events;
mod gate;
mod plans;
mod remote;
mod subscribers;

// ---- Public re-exports ----

pub use core::{Config, ExecutionSupervisor, SupervisorBuilder, Watchdog, WatchdogStatus};
pub use documents::{
    DataEvent, Descriptor, Document, DocumentListener, DocumentRouter, ExitStatus, ListenerId,
    RunStart, RunStop,
};
pub use error::{
    CollaboratorError, DispatchError, DocumentError, HandlerError, MonitorError, PlanError,
};
pub use events::{Bus, Event, EventKind};
pub use gate::{ActivationGate, GatedHandler};
pub use plans::{BoxPlanFuture, Plan, PlanContext, PlanFn, PlanRef};
pub use remote::{
    extract_alert_metadata, AlertMetadata, AlertRecord, AlertService, MetadataKey, MonitorPhase,
    MonitorScope, ProgressNotification, RemoteEvent, RemoteTaskClient, RemoteTaskMonitor,
    StatusView, TaskOutcome,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
