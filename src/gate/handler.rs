//! # Gated handler trait.
//!
//! A [`GatedHandler`] is the observer-specific half of a gated listener: it only
//! sees the documents its [`ActivationGate`](crate::ActivationGate) lets through.
//! Every method has a no-op default, so observers implement only what they need.
//!
//! ## Example
//! ```rust
//! use std::sync::Mutex;
//! use runvisor::{DataEvent, GatedHandler, HandlerError};
//!
//! #[derive(Default)]
//! struct CountingWriter {
//!     events: Mutex<usize>,
//! }
//!
//! impl GatedHandler for CountingWriter {
//!     fn name(&self) -> &str { "CountingWriter" }
//!
//!     fn event(&self, _doc: &DataEvent) -> Result<(), HandlerError> {
//!         *self.events.lock().unwrap() += 1;
//!         Ok(())
//!     }
//! }
//! ```

use crate::documents::{DataEvent, Descriptor, RunStart, RunStop};
use crate::error::HandlerError;

/// Observer logic behind an activation gate.
///
/// Handlers are called synchronously on the dispatching task and must not block
/// for long. Errors are logged by the gate and propagated to the dispatcher.
pub trait GatedHandler: Send + Sync + 'static {
    /// Name matched against a run's `activate_callbacks`.
    fn name(&self) -> &str;

    fn start(&self, _doc: &RunStart) -> Result<(), HandlerError> {
        Ok(())
    }

    fn descriptor(&self, _doc: &Descriptor) -> Result<(), HandlerError> {
        Ok(())
    }

    fn event(&self, _doc: &DataEvent) -> Result<(), HandlerError> {
        Ok(())
    }

    fn stop(&self, _doc: &RunStop) -> Result<(), HandlerError> {
        Ok(())
    }
}
