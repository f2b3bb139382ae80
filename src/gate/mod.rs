//! Run-activation gating for document observers.
//!
//! - [`GatedHandler`] observer logic (file writers, status recorders, alerting hooks)
//! - [`ActivationGate`] wraps a handler and restricts it to one run at a time
//!
//! A gate is a [`DocumentListener`](crate::DocumentListener), so it plugs
//! directly into a [`DocumentRouter`](crate::DocumentRouter).

mod activation;
mod handler;

pub use activation::ActivationGate;
pub use handler::GatedHandler;
