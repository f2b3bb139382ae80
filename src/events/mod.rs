//! Supervision events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ExecutionSupervisor`, `core::runner::run_plan`,
//!   `RemoteTaskMonitor` (including its escalation timer), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the supervisor's event listener, which fans out to the
//!   `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
