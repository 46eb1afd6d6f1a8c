//! # Membership manager: periodic subscriber joins.
//!
//! ```text
//! loop (index = 0..max_joins, or forever when max_joins = 0) {
//!   ├─► wait join_interval        (races the termination signal)
//!   ├─► Subscriber::new("{name_prefix}{index}")
//!   ├─► subscriber.start()
//!   ├─► registry.add(subscriber)
//!   └─► publish SubscriberJoined
//! }
//! publish MembershipFinished
//! ```
//!
//! No join is performed once the termination signal has closed: the wait is biased
//! toward cancellation and the signal is checked again before every join.

use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::{alive::AliveTracker, config::Config, registry::Registry, subscriber::Subscriber};
use crate::events::{Bus, Event, EventKind};

/// Produces join events on a fixed interval.
pub struct Membership {
    cfg: Config,
    registry: Arc<Registry>,
    alive: Arc<AliveTracker>,
    bus: Bus,
}

impl Membership {
    /// Creates a membership manager bound to `registry`.
    pub fn new(cfg: Config, registry: Arc<Registry>, alive: Arc<AliveTracker>, bus: Bus) -> Self {
        Self {
            cfg,
            registry,
            alive,
            bus,
        }
    }

    /// Runs joins until the cap is reached or `token` is cancelled.
    ///
    /// Returns the number of joins performed.
    pub async fn run(self, token: CancellationToken) -> usize {
        let limit = self.cfg.join_limit();
        let mut joined = 0usize;

        while limit.is_none_or(|max| joined < max) {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = time::sleep(self.cfg.join_interval) => {}
            }
            if token.is_cancelled() {
                break;
            }
            if !self.join(joined, &token).await {
                break;
            }
            joined += 1;
        }

        self.bus
            .publish(Event::new(EventKind::MembershipFinished).with_count(joined));
        joined
    }

    /// Returns false if the signal closed while waiting for the registry guard.
    async fn join(&self, index: usize, token: &CancellationToken) -> bool {
        let name = self.cfg.subscriber_name(index);
        let sub = Subscriber::new(
            name.as_str(),
            self.cfg.inbox_capacity_clamped(),
            token.clone(),
            self.bus.clone(),
        );
        // Detached: the loop ends on its own when the signal closes.
        let _ = sub.start(&self.alive);

        // The guard may be held by a stalled traversal in locked delivery mode.
        let size = tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            size = self.registry.add(sub) => size,
        };
        self.bus.publish(
            Event::new(EventKind::SubscriberJoined)
                .with_subscriber(name)
                .with_count(size),
        );
        true
    }
}
