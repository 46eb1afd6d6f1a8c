//! # Subscriber: one named endpoint with an inbox and a delivery loop.
//!
//! ## Architecture
//! ```text
//! Dispatcher ── send / deliver ──► [inbox (bounded mpsc)] ──► delivery loop
//!                                                               │
//!                               select! (biased) ───────────────┤
//!                                 ├─ token.cancelled() ─► SubscriberStopped, exit
//!                                 └─ inbox.recv()      ─► MessageReceived, continue
//! ```
//!
//! ## Rules
//! - The loop races every wait against the termination signal; cancellation wins ties.
//! - Messages are processed in inbox order (per-subscriber FIFO).
//! - Once the loop exits it never resumes; the inbox closes with it.
//! - A subscriber that was never started never drains its inbox: senders block
//!   once the buffer is full.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::alive::AliveTracker;
use crate::core::message::Message;
use crate::error::DeliveryError;
use crate::events::{Bus, Event, EventKind};

/// A named endpoint receiving broadcast messages until the termination signal closes.
pub struct Subscriber {
    name: Arc<str>,
    inbox: mpsc::Sender<Message>,
    /// Receiving half, held until [`Subscriber::start`] moves it into the loop.
    pending: Mutex<Option<mpsc::Receiver<Message>>>,
    token: CancellationToken,
    bus: Bus,
}

impl Subscriber {
    /// Creates a subscriber with an inbox of `capacity` messages (min 1).
    ///
    /// `token` is the shared termination signal; the subscriber observes it but never cancels it.
    pub fn new(
        name: impl Into<Arc<str>>,
        capacity: usize,
        token: CancellationToken,
        bus: Bus,
    ) -> Arc<Self> {
        let (inbox, rx) = mpsc::channel(capacity.max(1));
        Arc::new(Self {
            name: name.into(),
            inbox,
            pending: Mutex::new(Some(rx)),
            token,
            bus,
        })
    }

    /// Subscriber name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once [`start`](Self::start) has launched the delivery loop.
    pub fn is_started(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Launches the delivery loop as an independent task.
    ///
    /// The loop is registered in `alive` before it is spawned. Returns `None` if the
    /// subscriber was already started.
    pub fn start(&self, alive: &Arc<AliveTracker>) -> Option<JoinHandle<()>> {
        let rx = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        let guard = alive.enter(Arc::clone(&self.name));
        let name = Arc::clone(&self.name);
        let token = self.token.clone();
        let bus = self.bus.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            delivery_loop(name, rx, token, bus).await;
        }))
    }

    /// Sends `msg` to the inbox, waiting as long as it takes for buffer space.
    ///
    /// Fails only if the delivery loop has exited.
    pub async fn send(&self, msg: Message) -> Result<(), DeliveryError> {
        self.inbox
            .send(msg)
            .await
            .map_err(|_| DeliveryError::Closed {
                subscriber: Arc::clone(&self.name),
            })
    }

    /// Sends `msg`, giving up after `timeout` if the inbox stays full.
    ///
    /// `None` behaves like [`send`](Self::send).
    pub async fn deliver(
        &self,
        msg: Message,
        timeout: Option<Duration>,
    ) -> Result<(), DeliveryError> {
        let Some(timeout) = timeout else {
            return self.send(msg).await;
        };
        self.inbox
            .send_timeout(msg, timeout)
            .await
            .map_err(|e| match e {
                mpsc::error::SendTimeoutError::Timeout(_) => DeliveryError::Stalled {
                    subscriber: Arc::clone(&self.name),
                    waited: timeout,
                },
                mpsc::error::SendTimeoutError::Closed(_) => DeliveryError::Closed {
                    subscriber: Arc::clone(&self.name),
                },
            })
    }

    /// Number of free slots in the inbox.
    pub fn inbox_space(&self) -> usize {
        self.inbox.capacity()
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name)
            .field("started", &self.is_started())
            .finish()
    }
}

async fn delivery_loop(
    name: Arc<str>,
    mut rx: mpsc::Receiver<Message>,
    token: CancellationToken,
    bus: Bus,
) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                bus.publish(Event::new(EventKind::SubscriberStopped).with_subscriber(Arc::clone(&name)));
                return;
            }
            msg = rx.recv() => match msg {
                Some(msg) => {
                    bus.publish(
                        Event::new(EventKind::MessageReceived)
                            .with_subscriber(Arc::clone(&name))
                            .with_message(&msg),
                    );
                }
                // All senders gone: the subscriber itself was dropped.
                None => return,
            },
        }
    }
}
