//! # Per-observer queues and workers.
//!
//! ```text
//! emit(event) ──try_send──► [queue] ──► worker ──► observer.on_event()
//!                 │                        └─ panic ─► Bus: ObserverPanicked
//!                 └─ full / closed ─► Bus: ObserverOverflow
//! ```
//!
//! `emit` never waits. Each observer sees events in emit order, and a slow or
//! panicking observer only loses its own events. Reports about observers are
//! never re-reported when they overflow or panic themselves.
//!
//! The set counts events queued but not yet handled; [`ObserverSet::idle`]
//! resolves once every worker has caught up, which lets the hub forward
//! late panic reports before closing the queues.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};
use crate::observers::Observe;

/// Fan-out of runtime events to a fixed list of observers.
pub struct ObserverSet {
    queues: Vec<(&'static str, mpsc::Sender<Arc<Event>>)>,
    workers: Vec<JoinHandle<()>>,
    in_flight: Arc<watch::Sender<usize>>,
    bus: Bus,
}

impl ObserverSet {
    /// Spawns one worker per observer. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observe>>, bus: Bus) -> Self {
        let in_flight = Arc::new(watch::Sender::new(0usize));
        let (queues, workers) = observers
            .into_iter()
            .map(|obs| {
                let (tx, rx) = mpsc::channel(obs.queue_capacity().max(1));
                let name = obs.name();
                let worker = tokio::spawn(drive(obs, rx, Arc::clone(&in_flight), bus.clone()));
                ((name, tx), worker)
            })
            .unzip();

        Self {
            queues,
            workers,
            in_flight,
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queues `event` for every observer without waiting.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        for (name, tx) in &self.queues {
            self.in_flight.send_modify(|n| *n += 1);
            let reason = match tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            self.in_flight.send_modify(|n| *n -= 1);
            if !event.is_observer_internal() {
                self.bus.publish(Event::observer_overflow(*name, reason));
            }
        }
    }

    /// Resolves once every queued event has been handled.
    pub async fn idle(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Closes the queues and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.queues);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn drive(
    obs: Arc<dyn Observe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    in_flight: Arc<watch::Sender<usize>>,
    bus: Bus,
) {
    while let Some(ev) = rx.recv().await {
        let handled = AssertUnwindSafe(obs.on_event(&ev)).catch_unwind().await;
        if let Err(panic) = handled {
            if !ev.is_observer_internal() {
                bus.publish(Event::observer_panicked(obs.name(), panic_message(&*panic)));
            }
        }
        // Published before the decrement so `idle` never hides a report.
        in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
