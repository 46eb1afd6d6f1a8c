//! # Hub: owns the registry and the termination signal, drives graceful shutdown.
//!
//! The [`Hub`] is the top-level coordinator. It owns the event bus, the
//! [`Registry`], the [`AliveTracker`] and the single [`CancellationToken`] used as
//! the process-wide termination signal.
//!
//! ## High-level architecture
//! ```text
//! run_until(signal):
//!   observer_listener: Bus.subscribe() ─► ObserverSet::emit(&Event)
//!   spawn Membership::run(token)   ── alive["membership"]
//!   spawn Dispatcher::run(token)   ── alive["dispatcher"]
//!
//!   Membership ──► Subscriber::start() ── alive["worker{i}"] ──► Registry::add
//!   Dispatcher ──► Registry::snapshot / for_each ──► Subscriber inboxes
//!
//! Shutdown path (signal fires or Hub::shutdown() is called):
//!   └─► Bus.publish(ShutdownRequested)      (once)
//!   └─► token.cancel()                      (idempotent)
//!   └─► wait alive == 0 within cfg.grace:
//!          ├─ Ok       → Bus.publish(AllStoppedWithin)
//!          └─ Timeout  → Bus.publish(GraceExceeded), RuntimeError::GraceExceeded{stuck}
//!   └─► drain observer queues (panic reports raised while draining are forwarded too)
//! ```
//!
//! Shutdown is strictly cooperative: no loop is aborted.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::{
    alive::AliveTracker, builder::HubBuilder, config::Config, dispatcher::Dispatcher,
    membership::Membership, registry::Registry, shutdown,
};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::observers::ObserverSet;

/// Coordinates membership, dispatch, observers and graceful shutdown.
pub struct Hub {
    cfg: Config,
    bus: Bus,
    registry: Arc<Registry>,
    alive: Arc<AliveTracker>,
    token: CancellationToken,
    observers: Mutex<Option<ObserverSet>>,
    started: AtomicBool,
    shutdown_requested: AtomicBool,
}

impl Hub {
    /// Returns a builder for a hub with the given configuration.
    pub fn builder(cfg: Config) -> HubBuilder {
        HubBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: Config, bus: Bus, observers: ObserverSet) -> Self {
        Self {
            cfg,
            bus,
            registry: Registry::new(),
            alive: Arc::new(AliveTracker::new()),
            token: CancellationToken::new(),
            observers: Mutex::new(Some(observers)),
            started: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    /// Runs until the process receives a termination signal, then shuts down gracefully.
    ///
    /// If signal listeners cannot be registered the hub shuts down immediately and
    /// returns [`RuntimeError::Signal`].
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let mut signal_err = None;
        let res = self
            .run_until(async {
                if let Err(e) = shutdown::wait_for_shutdown_signal().await {
                    signal_err = Some(e);
                }
            })
            .await;

        match signal_err {
            Some(e) if res.is_ok() => Err(RuntimeError::from(e)),
            _ => res,
        }
    }

    /// Runs until `signal` completes or [`shutdown`](Self::shutdown) is called.
    ///
    /// A hub runs once: a second call waits for the termination signal and then
    /// for the loops of the first run, under the same grace bound.
    pub async fn run_until<F>(&self, signal: F) -> Result<(), RuntimeError>
    where
        F: Future,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            self.token.cancelled().await;
            return self.wait_idle_within_grace().await;
        }

        let listener_stop = CancellationToken::new();
        let listener = self.observer_listener(listener_stop.clone());
        self.spawn_membership();
        self.spawn_dispatcher();

        tokio::select! {
            _ = signal => {}
            _ = self.token.cancelled() => {}
        }
        self.shutdown();
        let res = self.wait_all_with_grace().await;

        listener_stop.cancel();
        if let Some(handle) = listener {
            let _ = time::timeout(self.cfg.grace, handle).await;
        }
        res
    }

    /// Requests termination: publishes `ShutdownRequested` once and closes the signal.
    ///
    /// Safe to call any number of times, from any task.
    pub fn shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::AcqRel) {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
        }
        self.token.cancel();
    }

    /// Returns true once the termination signal has closed.
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The shared registry of subscribers.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Tracker of the loops that have not exited yet.
    pub fn alive(&self) -> &Arc<AliveTracker> {
        &self.alive
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Creates a receiver for subsequent runtime events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Spawns the task forwarding bus events to the observers, if there are any.
    fn observer_listener(&self, stop: CancellationToken) -> Option<JoinHandle<()>> {
        let set = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        if set.is_empty() {
            return None;
        }
        Some(tokio::spawn(forward_events(self.bus.subscribe(), set, stop)))
    }

    fn spawn_membership(&self) {
        let membership = Membership::new(
            self.cfg.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.alive),
            self.bus.clone(),
        );
        let guard = self.alive.enter("membership");
        let token = self.token.clone();
        tokio::spawn(async move {
            let _guard = guard;
            membership.run(token).await;
        });
    }

    fn spawn_dispatcher(&self) {
        let dispatcher = Dispatcher::new(
            self.cfg.clone(),
            Arc::clone(&self.registry),
            self.bus.clone(),
        );
        let guard = self.alive.enter("dispatcher");
        let token = self.token.clone();
        tokio::spawn(async move {
            let _guard = guard;
            dispatcher.run(token).await;
        });
    }

    /// Waits for every tracked loop to exit within [`Config::grace`] and reports the outcome.
    async fn wait_all_with_grace(&self) -> Result<(), RuntimeError> {
        let res = self.wait_idle_within_grace().await;
        match &res {
            Ok(()) => self.bus.publish(Event::new(EventKind::AllStoppedWithin)),
            Err(RuntimeError::GraceExceeded { stuck, .. }) => self
                .bus
                .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(","))),
            Err(_) => {}
        }
        res
    }

    async fn wait_idle_within_grace(&self) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        match time::timeout(grace, self.alive.wait_idle()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(RuntimeError::GraceExceeded {
                grace,
                stuck: self.alive.snapshot(),
            }),
        }
    }
}

/// Forwards bus events to `set` until `stop` fires, then drains.
///
/// Draining alternates between waiting for the observers to go idle and
/// forwarding what they published meanwhile, so a panic report raised on the
/// last events still reaches the other observers.
async fn forward_events(
    mut rx: broadcast::Receiver<Event>,
    set: ObserverSet,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(ev) => set.emit(&ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => set.emit(&lagged(skipped)),
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = stop.cancelled() => break,
        }
    }

    loop {
        set.idle().await;
        let mut forwarded = false;
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => set.emit(&lagged(skipped)),
                Err(_) => break,
            }
            forwarded = true;
        }
        if !forwarded {
            break;
        }
    }
    set.shutdown().await;
}

/// Report for events the listener skipped.
///
/// Emitted straight to the observers: publishing it would push the lagging
/// receiver further behind.
fn lagged(skipped: u64) -> Event {
    Event::observer_overflow("bus", "lagged")
        .with_count(usize::try_from(skipped).unwrap_or(usize::MAX))
}
