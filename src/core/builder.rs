use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{supervisor::ExecutionSupervisor, Config};
use crate::{
    documents::{DocumentListener, DocumentRouter},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for an [`ExecutionSupervisor`].
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    listeners: Vec<Arc<dyn DocumentListener>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Sets supervision event subscribers (logging, metrics, paging).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the document observers, in delivery order.
    ///
    /// Usually [`ActivationGate`](crate::ActivationGate)s.
    pub fn with_listeners(mut self, listeners: Vec<Arc<dyn DocumentListener>>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Builds the supervisor and spawns the event fan-out.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<ExecutionSupervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let router = Arc::new(DocumentRouter::with_listeners(self.listeners));

        let listener_token = CancellationToken::new();
        let listener = spawn_event_listener(&bus, Arc::clone(&subs), listener_token.clone());
        Arc::new(ExecutionSupervisor::new_internal(
            self.cfg,
            bus,
            subs,
            router,
            listener_token,
            listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until `stop` is cancelled.
///
/// The subscriber set keeps its own bus sender (for overflow/panic events), so
/// the channel never closes on its own; `stop` is what ends the loop. Events
/// already queued on the bus are forwarded before stopping.
fn spawn_event_listener(
    bus: &Bus,
    subs: Arc<SubscriberSet>,
    stop: CancellationToken,
) -> Option<JoinHandle<()>> {
    if subs.is_empty() {
        return None;
    }
    let mut rx = bus.subscribe();
    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "supervision event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => break,
            }
        }
    }))
}
