//! # Synchronous document fan-out.
//!
//! [`DocumentRouter`] delivers each [`Document`] to every subscribed
//! [`DocumentListener`] on the calling task, in subscription order.
//!
//! ## Rules
//! - **Synchronous**: `dispatch()` returns only after every listener handled the document.
//! - **Fail loud**: the first listener fault stops the dispatch and is returned to the caller.
//! - **Strong ownership**: the router holds an `Arc` to each listener until it is unsubscribed.
//!
//! ```text
//! Plan/remote pump ── dispatch(&doc) ──► listener 1 ──► listener 2 ──► ... ──► listener N
//!                           ▲                 │
//!                           └──── Err ────────┘ (first fault wins)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::documents::Document;
use crate::error::DispatchError;

/// Something that consumes documents.
///
/// [`ActivationGate`](crate::ActivationGate) is the main implementation.
pub trait DocumentListener: Send + Sync + 'static {
    /// Handles a single document.
    fn on_document(&self, doc: &Document) -> Result<(), DispatchError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Registration handle returned by [`DocumentRouter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of listeners fed synchronously.
#[derive(Default)]
pub struct DocumentRouter {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn DocumentListener>)>>,
    next_id: AtomicU64,
}

impl DocumentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router pre-populated with `listeners`.
    pub fn with_listeners(listeners: Vec<Arc<dyn DocumentListener>>) -> Self {
        let router = Self::new();
        for l in listeners {
            router.subscribe(l);
        }
        router
    }

    /// Adds a listener at the end of the delivery order.
    pub fn subscribe(&self, listener: Arc<dyn DocumentListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push((id, listener));
        id
    }

    /// Removes a listener; returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `doc` to every listener, stopping at the first fault.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe from inside a handler without deadlocking.
    pub fn dispatch(&self, doc: &Document) -> Result<(), DispatchError> {
        let snapshot: Vec<Arc<dyn DocumentListener>> =
            self.read().iter().map(|(_, l)| Arc::clone(l)).collect();

        for listener in snapshot {
            listener.on_document(doc)?;
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(ListenerId, Arc<dyn DocumentListener>)>> {
        self.listeners.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, Vec<(ListenerId, Arc<dyn DocumentListener>)>> {
        self.listeners.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{RunStart, RunStop, ExitStatus};
    use crate::error::HandlerError;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                seen: Mutex::new(Vec::new()),
                fail_on: None,
            })
        }
    }

    impl DocumentListener for Recorder {
        fn on_document(&self, doc: &Document) -> Result<(), DispatchError> {
            self.seen.lock().unwrap().push(doc.kind());
            if self.fail_on == Some(doc.kind()) {
                return Err(DispatchError::Handler {
                    listener: self.name.to_string(),
                    document: doc.kind(),
                    source: HandlerError::new("boom"),
                });
            }
            Ok(())
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn delivers_in_subscription_order_until_unsubscribed() {
        let router = DocumentRouter::new();
        let a = Recorder::new("a");
        let b = Recorder::new("b");
        router.subscribe(a.clone());
        let id_b = router.subscribe(b.clone());

        router.dispatch(&RunStart::new("r1").into()).unwrap();
        assert!(router.unsubscribe(id_b));
        assert!(!router.unsubscribe(id_b));
        router
            .dispatch(
                &RunStop {
                    run_start: "r1".into(),
                    exit_status: ExitStatus::Success,
                    reason: None,
                }
                .into(),
            )
            .unwrap();

        assert_eq!(*a.seen.lock().unwrap(), vec!["start", "stop"]);
        assert_eq!(*b.seen.lock().unwrap(), vec!["start"]);
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn first_fault_stops_delivery() {
        let router = DocumentRouter::new();
        let failing = Arc::new(Recorder {
            name: "failing",
            seen: Mutex::new(Vec::new()),
            fail_on: Some("start"),
        });
        let after = Recorder::new("after");
        router.subscribe(failing.clone());
        router.subscribe(after.clone());

        let err = router.dispatch(&RunStart::new("r1").into()).unwrap_err();
        assert_eq!(err.as_label(), "dispatch_handler_fault");
        assert!(after.seen.lock().unwrap().is_empty());
    }
}
