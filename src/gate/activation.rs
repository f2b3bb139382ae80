//! # Run-activation gate.
//!
//! [`ActivationGate`] wraps a [`GatedHandler`] so that it reacts to the
//! documents of exactly one run at a time.
//!
//! ## State machine
//! ```text
//!            RunStart (activates)                 RunStop{run_start == activation_run_uid}
//! Inactive ───────────────────────► Active(uid) ──────────────────────────────────────► Inactive
//!    │                                 │
//!    │ other documents: passed through │ every document forwarded (nested runs included),
//!    │ (handler not called)            │ nested RunStart/RunStop do not change the state
//! ```
//!
//! ## Activation rule
//! An inactive gate activates on a RunStart when:
//! - the start lists this handler's name in `activate_callbacks`, or
//! - the start has no `activate_callbacks` and either the gate has no run key
//!   (first run encountered is adopted) or the start's `run_name` equals the key.
//!
//! An empty `activate_callbacks` list counts as no list.
//!
//! ## Rules
//! - State changes only on RunStart/RunStop; Descriptor/DataEvent never touch it.
//! - The matching RunStop is forwarded *before* deactivation takes effect for the handler.
//! - Handler errors are logged and returned, never swallowed.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use crate::documents::{Document, DocumentListener, RunStart, RunStop};
use crate::error::{DispatchError, HandlerError};
use crate::gate::GatedHandler;

#[derive(Debug, Default)]
struct GateState {
    active: bool,
    activation_run_uid: Option<String>,
}

/// Per-listener gate restricting a handler to a single run's documents.
pub struct ActivationGate<H: GatedHandler> {
    handler: Arc<H>,
    run_key: Option<String>,
    state: Mutex<GateState>,
}

impl<H: GatedHandler> ActivationGate<H> {
    /// Gate that adopts the first run it sees unless told otherwise by `activate_callbacks`.
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            run_key: None,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Convenience: wraps `handler` and returns the gate behind an `Arc`.
    pub fn arc(handler: Arc<H>) -> Arc<Self> {
        Arc::new(Self::new(handler))
    }

    /// Only adopt unlisted runs whose `run_name` equals `key`.
    pub fn with_run_key(mut self, key: impl Into<String>) -> Self {
        self.run_key = Some(key.into());
        self
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn activation_run_uid(&self) -> Option<String> {
        self.lock().activation_run_uid.clone()
    }

    /// Handles a RunStart; returns whether the handler was called.
    pub fn on_run_start(&self, doc: &RunStart) -> Result<bool, DispatchError> {
        let forward = {
            let mut state = self.lock();
            if !state.active && self.should_activate(doc) {
                debug!(
                    listener = self.handler.name(),
                    run_uid = %doc.run_uid,
                    "gate activated"
                );
                state.active = true;
                state.activation_run_uid = Some(doc.run_uid.clone());
            }
            state.active
        };
        if forward {
            self.guard("start", self.handler.start(doc))?;
        }
        Ok(forward)
    }

    /// Handles a RunStop; returns whether the handler was called.
    pub fn on_run_stop(&self, doc: &RunStop) -> Result<bool, DispatchError> {
        let forward = {
            let mut state = self.lock();
            let forward = state.active;
            if state.activation_run_uid.as_deref() == Some(doc.run_start.as_str()) {
                debug!(
                    listener = self.handler.name(),
                    run_uid = %doc.run_start,
                    "gate deactivated"
                );
                state.active = false;
                state.activation_run_uid = None;
            }
            forward
        };
        if forward {
            self.guard("stop", self.handler.stop(doc))?;
        }
        Ok(forward)
    }

    fn should_activate(&self, doc: &RunStart) -> bool {
        if doc.activate_callbacks.as_ref().is_some_and(|names| !names.is_empty()) {
            return doc.activates(self.handler.name());
        }
        match &self.run_key {
            None => true,
            Some(key) => doc.run_name.as_deref() == Some(key.as_str()),
        }
    }

    fn guard(&self, document: &'static str, res: Result<(), HandlerError>) -> Result<(), DispatchError> {
        res.map_err(|source| {
            error!(
                listener = self.handler.name(),
                document,
                error = %source,
                "gated handler failed"
            );
            DispatchError::Handler {
                listener: self.handler.name().to_string(),
                document,
                source,
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl<H: GatedHandler> DocumentListener for ActivationGate<H> {
    fn on_document(&self, doc: &Document) -> Result<(), DispatchError> {
        match doc {
            Document::RunStart(d) => self.on_run_start(d).map(drop),
            Document::RunStop(d) => self.on_run_stop(d).map(drop),
            Document::Descriptor(d) => {
                if self.is_active() {
                    self.guard("descriptor", self.handler.descriptor(d))?;
                }
                Ok(())
            }
            Document::DataEvent(d) => {
                if self.is_active() {
                    self.guard("event", self.handler.event(d))?;
                }
                Ok(())
            }
        }
    }

    fn name(&self) -> &str {
        self.handler.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{DataEvent, Descriptor, ExitStatus};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_events: bool,
    }

    impl Recorder {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl GatedHandler for Recorder {
        fn name(&self) -> &str {
            "Recorder"
        }

        fn start(&self, doc: &RunStart) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(format!("start:{}", doc.run_uid));
            Ok(())
        }

        fn descriptor(&self, doc: &Descriptor) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(format!("descriptor:{}", doc.descriptor_uid));
            Ok(())
        }

        fn event(&self, doc: &DataEvent) -> Result<(), HandlerError> {
            if self.fail_events {
                return Err(HandlerError::new("disk full"));
            }
            self.seen.lock().unwrap().push(format!("event:{}", doc.descriptor_uid));
            Ok(())
        }

        fn stop(&self, doc: &RunStop) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(format!("stop:{}", doc.run_start));
            Ok(())
        }
    }

    fn stop(uid: &str) -> RunStop {
        RunStop {
            run_start: uid.into(),
            exit_status: ExitStatus::Success,
            reason: None,
        }
    }

    fn event(descriptor: &str) -> Document {
        DataEvent {
            descriptor_uid: descriptor.into(),
            data: BTreeMap::new(),
        }
        .into()
    }

    #[test]
    fn listed_run_is_bracketed() {
        let gate = ActivationGate::new(Arc::new(Recorder::default()));

        gate.on_document(&event("early")).unwrap();
        gate.on_document(&RunStart::new("r1").with_activate_callbacks(["Recorder"]).into())
            .unwrap();
        assert!(gate.is_active());
        assert_eq!(gate.activation_run_uid().as_deref(), Some("r1"));
        gate.on_document(&event("d1")).unwrap();
        gate.on_document(&stop("r1").into()).unwrap();
        gate.on_document(&event("late")).unwrap();

        assert!(!gate.is_active());
        assert_eq!(gate.activation_run_uid(), None);
        assert_eq!(gate.handler().seen(), vec!["start:r1", "event:d1", "stop:r1"]);
    }

    #[test]
    fn unlisted_run_is_ignored_when_list_present() {
        let gate = ActivationGate::new(Arc::new(Recorder::default()));

        let called = gate
            .on_run_start(&RunStart::new("r1").with_activate_callbacks(["Other"]))
            .unwrap();

        assert!(!called);
        assert!(!gate.is_active());
        assert!(gate.handler().seen().is_empty());
    }

    #[test]
    fn nested_run_does_not_move_activation() {
        let gate = ActivationGate::new(Arc::new(Recorder::default()));

        gate.on_run_start(&RunStart::new("outer")).unwrap();
        gate.on_run_start(&RunStart::new("inner").with_activate_callbacks(["Recorder"]))
            .unwrap();
        assert_eq!(gate.activation_run_uid().as_deref(), Some("outer"));

        gate.on_run_stop(&stop("inner")).unwrap();
        assert!(gate.is_active(), "inner stop must not deactivate");

        gate.on_run_stop(&stop("outer")).unwrap();
        assert!(!gate.is_active());
        assert_eq!(
            gate.handler().seen(),
            vec!["start:outer", "start:inner", "stop:inner", "stop:outer"]
        );
    }

    #[test]
    fn run_key_restricts_adoption() {
        let gate = ActivationGate::new(Arc::new(Recorder::default())).with_run_key("collect");

        gate.on_run_start(&RunStart::new("r1").with_run_name("move_to_sample"))
            .unwrap();
        assert!(!gate.is_active());

        gate.on_run_start(&RunStart::new("r2").with_run_name("collect"))
            .unwrap();
        assert_eq!(gate.activation_run_uid().as_deref(), Some("r2"));
    }

    #[test]
    fn empty_activation_list_falls_back_to_adoption() {
        let gate = ActivationGate::new(Arc::new(Recorder::default()));
        let start = RunStart::new("r1").with_activate_callbacks(Vec::<String>::new());

        assert!(gate.on_run_start(&start).unwrap());
        assert_eq!(gate.activation_run_uid().as_deref(), Some("r1"));
    }

    #[test]
    fn stop_for_other_run_is_not_forwarded_while_inactive() {
        let gate = ActivationGate::new(Arc::new(Recorder::default()));
        assert!(!gate.on_run_stop(&stop("ghost")).unwrap());
        assert!(gate.handler().seen().is_empty());
    }

    #[test]
    fn handler_fault_is_returned() {
        let gate = ActivationGate::new(Arc::new(Recorder {
            fail_events: true,
            ..Default::default()
        }));
        gate.on_document(&RunStart::new("r1").into()).unwrap();

        let err = gate.on_document(&event("d1")).unwrap_err();
        let DispatchError::Handler {
            listener,
            document,
            source,
        } = err;
        assert_eq!(listener, "Recorder");
        assert_eq!(document, "event");
        assert_eq!(source, HandlerError::new("disk full"));
        assert!(gate.is_active(), "a fault does not change gating state");
    }
}
