//! Event documents and their synchronous delivery.
//!
//! ## Contents
//! - [`Document`] closed set of {RunStart, Descriptor, DataEvent, RunStop}
//! - [`DocumentRouter`] ordered, synchronous fan-out to [`DocumentListener`]s

mod document;
mod router;

pub use document::{DataEvent, Descriptor, Document, ExitStatus, RunStart, RunStop};
pub use router::{DocumentListener, DocumentRouter, ListenerId};
