//! # Supervision event subscribers.
//!
//! ```text
//! Supervisor / RemoteTaskMonitor ── publish(Event) ──► Bus ──► SubscriberSet
//!                                                                │
//!                                                   ┌────────────┼──────────┐
//!                                                   ▼            ▼          ▼
//!                                               LogWriter     Metrics    Custom
//! ```
//!
//! - [`Subscribe`] trait for custom subscribers
//! - [`SubscriberSet`] bounded, panic-isolated fan-out
//! - [`LogWriter`] built-in `tracing` renderer

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
