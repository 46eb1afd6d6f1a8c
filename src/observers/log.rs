//! # LogWriter — event renderer over `tracing`
//!
//! Renders incoming [`Event`]s as structured `tracing` records. Install any
//! `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO fanvisor: subscriber joined subscriber="worker0" members=1
//! INFO fanvisor: message dispatched payload="test-3" seq=3 recipients=2
//! DEBUG fanvisor: message received subscriber="worker1" payload="test-3"
//! WARN fanvisor: delivery stalled subscriber="worker4" seq=9 waited_ms=1000
//! INFO fanvisor: shutdown requested
//! INFO fanvisor: subscriber stopped subscriber="worker1"
//! INFO fanvisor: all loops stopped within grace
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Event writer observer.
#[derive(Default, Debug)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let subscriber = e.subscriber.as_deref().unwrap_or("-");
        let payload = e.payload.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::SubscriberJoined => {
                info!(target: "fanvisor", subscriber, members = ?e.count, "subscriber joined");
            }
            EventKind::MembershipFinished => {
                info!(target: "fanvisor", joins = ?e.count, "membership finished");
            }
            EventKind::MessageDispatched => {
                info!(target: "fanvisor", payload, seq = ?e.msg_seq, recipients = ?e.count, "message dispatched");
            }
            EventKind::MessageReceived => {
                debug!(target: "fanvisor", subscriber, payload, "message received");
            }
            EventKind::DeliveryStalled => {
                warn!(target: "fanvisor", subscriber, seq = ?e.msg_seq, waited_ms = ?e.waited_ms, "delivery stalled");
            }
            EventKind::DeliveryClosed => {
                warn!(target: "fanvisor", subscriber, seq = ?e.msg_seq, "delivery to closed inbox");
            }
            EventKind::ShutdownRequested => {
                info!(target: "fanvisor", "shutdown requested");
            }
            EventKind::SubscriberStopped => {
                info!(target: "fanvisor", subscriber, "subscriber stopped");
            }
            EventKind::DispatcherStopped => {
                info!(target: "fanvisor", last_seq = ?e.msg_seq, "dispatcher stopped");
            }
            EventKind::AllStoppedWithin => {
                info!(target: "fanvisor", "all loops stopped within grace");
            }
            EventKind::GraceExceeded => {
                warn!(target: "fanvisor", stuck = e.reason.as_deref().unwrap_or(""), "grace exceeded");
            }
            EventKind::ObserverOverflow => {
                warn!(target: "fanvisor", observer = subscriber, reason = ?e.reason, skipped = ?e.count, "observer overflow");
            }
            EventKind::ObserverPanicked => {
                warn!(target: "fanvisor", observer = subscriber, info = ?e.reason, "observer panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
