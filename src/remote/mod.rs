//! Supervision of tasks delegated to a remote execution service.
//!
//! - [`client`]: the remote service boundary ([`RemoteTaskClient`], progress notifications);
//! - [`alert`]: operator alerting ([`AlertService`]) and sample metadata extraction;
//! - [`monitor`]: the [`RemoteTaskMonitor`] escalation state machine.

mod alert;
mod client;
mod monitor;

pub use alert::{extract_alert_metadata, AlertMetadata, AlertRecord, AlertService, MetadataKey};
pub use client::{ProgressNotification, RemoteEvent, RemoteTaskClient, StatusView, TaskOutcome};
pub use monitor::{MonitorPhase, MonitorScope, RemoteTaskMonitor};
