//! Local execution core.
//!
//! The public API from this module is [`ExecutionSupervisor`] (plus its
//! [`SupervisorBuilder`], [`Config`] and [`Watchdog`]).
//!
//! Internal modules:
//! - [`runner`]: runs one plan under the watchdog and publishes lifecycle events;
//! - [`supervisor`]: serializes executions, owns bus/router/watchdog, handles shutdown;
//! - [`watchdog`]: deadline-based liveness guard;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`builder`]: assembles a supervisor.

mod builder;
mod config;
mod runner;
mod shutdown;
mod supervisor;
mod watchdog;

pub use builder::SupervisorBuilder;
pub use config::Config;
pub use supervisor::ExecutionSupervisor;
pub use watchdog::{Watchdog, WatchdogStatus};
