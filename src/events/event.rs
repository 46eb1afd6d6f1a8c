//! # Runtime events emitted by the hub, its loops and observer workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Membership events**: subscribers joining, the join schedule finishing
//! - **Delivery events**: ticks dispatched, messages received, stalled/closed deliveries
//! - **Shutdown events**: signal observed, loops stopped, grace outcome
//! - **Observer events**: overflow and panics inside observer workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, subscriber
//! name, message sequence and payload.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use fanvisor::{Event, EventKind, Message};
//!
//! let msg = Message::new(3, "test-3");
//! let ev = Event::new(EventKind::MessageReceived)
//!     .with_subscriber("worker0")
//!     .with_message(&msg);
//!
//! assert_eq!(ev.kind, EventKind::MessageReceived);
//! assert_eq!(ev.subscriber.as_deref(), Some("worker0"));
//! assert_eq!(ev.msg_seq, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::Message;
use crate::error::DeliveryError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Membership events ===
    /// A subscriber was started and added to the registry.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `count`: registry size after the join
    SubscriberJoined,

    /// The membership manager performed its last join and exited.
    ///
    /// Sets:
    /// - `count`: number of joins performed
    MembershipFinished,

    // === Delivery events ===
    /// The dispatcher produced a message and is fanning it out.
    ///
    /// Sets:
    /// - `msg_seq`, `payload`: the message
    /// - `count`: number of recipients (registry snapshot size); unset in
    ///   [`DeliveryMode::Locked`](crate::DeliveryMode::Locked), where membership is only
    ///   fixed while the traversal holds the registry guard
    MessageDispatched,

    /// A subscriber's delivery loop processed a message.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `msg_seq`, `payload`: the message
    MessageReceived,

    /// A delivery gave up because the subscriber's inbox stayed full.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `msg_seq`: dropped message
    /// - `waited_ms`: how long the dispatcher waited
    DeliveryStalled,

    /// A delivery failed because the subscriber's loop has already exited.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `msg_seq`: dropped message
    DeliveryClosed,

    // === Shutdown events ===
    /// Termination requested (OS signal or programmatic shutdown).
    ShutdownRequested,

    /// A subscriber's delivery loop observed the termination signal and exited.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    SubscriberStopped,

    /// The dispatcher observed the termination signal and reached `Stopped`.
    ///
    /// Sets:
    /// - `msg_seq`: last dispatched sequence (0 if none)
    DispatcherStopped,

    /// All loops exited within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some loops did not exit in time.
    ///
    /// Sets:
    /// - `reason`: comma-separated names of the stuck loops
    GraceExceeded,

    // === Observer events ===
    /// Observers missed an event.
    ///
    /// Sets:
    /// - `subscriber`: observer name, or "bus" when the forwarding listener lagged
    /// - `reason`: "full", "closed" or "lagged"
    /// - `count`: number of skipped events (lagged only)
    ObserverOverflow,

    /// An observer panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: observer name
    /// - `reason`: panic message
    ObserverPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Subscriber (or observer) name, if applicable.
    pub subscriber: Option<Arc<str>>,
    /// Sequence number of the message concerned.
    pub msg_seq: Option<u64>,
    /// Message payload.
    pub payload: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Time spent waiting on a delivery in milliseconds (compact).
    pub waited_ms: Option<u32>,
    /// Count attached to the event (recipients, registry size, joins).
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subscriber: None,
            msg_seq: None,
            payload: None,
            reason: None,
            waited_ms: None,
            count: None,
        }
    }

    /// Attaches a subscriber name.
    #[inline]
    pub fn with_subscriber(mut self, name: impl Into<Arc<str>>) -> Self {
        self.subscriber = Some(name.into());
        self
    }

    /// Attaches a message (sequence and payload).
    #[inline]
    pub fn with_message(mut self, msg: &Message) -> Self {
        self.msg_seq = Some(msg.seq());
        self.payload = Some(msg.payload_arc());
        self
    }

    /// Attaches a bare message sequence number.
    #[inline]
    pub fn with_msg_seq(mut self, seq: u64) -> Self {
        self.msg_seq = Some(seq);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a waited duration (stored as milliseconds).
    #[inline]
    pub fn with_waited(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.waited_ms = Some(ms);
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Creates the event reporting a failed delivery of `msg`.
    pub fn delivery_failed(err: &DeliveryError, msg: &Message) -> Self {
        match err {
            DeliveryError::Stalled { subscriber, waited } => {
                Event::new(EventKind::DeliveryStalled)
                    .with_subscriber(Arc::clone(subscriber))
                    .with_msg_seq(msg.seq())
                    .with_waited(*waited)
                    .with_reason(err.to_string())
            }
            DeliveryError::Closed { subscriber } => Event::new(EventKind::DeliveryClosed)
                .with_subscriber(Arc::clone(subscriber))
                .with_msg_seq(msg.seq())
                .with_reason(err.to_string()),
        }
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ObserverOverflow)
            .with_subscriber(observer)
            .with_reason(reason)
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        Event::new(EventKind::ObserverPanicked)
            .with_subscriber(observer)
            .with_reason(info)
    }

    /// Returns true for events produced by observer workers themselves.
    #[inline]
    pub fn is_observer_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ObserverOverflow | EventKind::ObserverPanicked
        )
    }
}
