//! # Dispatcher: periodic fan-out to every registered subscriber.
//!
//! ## State machine
//! ```text
//!  Running ──(termination signal observed)──► Stopped   (terminal, fires once)
//! ```
//! [`Dispatcher::run`] consumes the dispatcher, so `Stopped` cannot be left;
//! the transition is announced with `DispatcherStopped`.
//!
//! ## Tick
//! ```text
//! every dispatch_interval (first tick one interval after start) {
//!   ├─► seq += 1, message = "{message_prefix}-{seq}"
//!   ├─► DeliveryMode::Snapshot:
//!   │      snapshot = registry.snapshot()             (guard released here)
//!   │      publish MessageDispatched{count = snapshot.len()}
//!   │      join_all(sub.deliver(msg, send_timeout))   (concurrent, bounded)
//!   │        └─ Err ─► publish DeliveryStalled / DeliveryClosed
//!   └─► DeliveryMode::Locked:
//!          registry.for_each(|sub| sub.send(msg))     (guard held, unbounded)
//! }
//! ```
//!
//! ## Rules
//! - Every suspension point races the termination signal; cancellation wins ties.
//! - One tick completes before the next one starts, so each subscriber sees messages in dispatch order.
//! - In snapshot mode a tick lasts at most `send_timeout`, which `Config::validate` keeps
//!   below `dispatch_interval`: stalled subscribers never delay the schedule.
//! - A subscriber registered after a tick's snapshot never receives that tick.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::{
    config::{Config, DeliveryMode},
    message::Message,
    registry::Registry,
};
use crate::events::{Bus, Event, EventKind};

/// Generates one message per tick and fans it out to the registry.
pub struct Dispatcher {
    cfg: Config,
    registry: Arc<Registry>,
    bus: Bus,
    seq: u64,
}

impl Dispatcher {
    /// Creates a dispatcher bound to `registry`.
    pub fn new(cfg: Config, registry: Arc<Registry>, bus: Bus) -> Self {
        Self {
            cfg,
            registry,
            bus,
            seq: 0,
        }
    }

    /// Runs ticks until `token` is cancelled, then stops for good.
    ///
    /// Returns the number of messages dispatched.
    pub async fn run(mut self, token: CancellationToken) -> u64 {
        let period = self.cfg.dispatch_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let msg = self.next_message();
            let completed = tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = self.fan_out(&msg) => true,
            };
            if !completed {
                break;
            }
        }

        self.bus
            .publish(Event::new(EventKind::DispatcherStopped).with_msg_seq(self.seq));
        self.seq
    }

    fn next_message(&mut self) -> Message {
        self.seq += 1;
        Message::new(self.seq, self.cfg.message_payload(self.seq))
    }

    async fn fan_out(&self, msg: &Message) {
        match self.cfg.delivery {
            DeliveryMode::Snapshot => self.fan_out_snapshot(msg).await,
            DeliveryMode::Locked => self.fan_out_locked(msg).await,
        }
    }

    async fn fan_out_snapshot(&self, msg: &Message) {
        let members = self.registry.snapshot().await;
        self.publish_dispatched(msg, members.len());

        let timeout = Some(self.cfg.send_timeout);
        let results = join_all(
            members
                .iter()
                .map(|sub| sub.deliver(msg.clone(), timeout)),
        )
        .await;

        for err in results.into_iter().filter_map(Result::err) {
            self.bus.publish(Event::delivery_failed(&err, msg));
        }
    }

    async fn fan_out_locked(&self, msg: &Message) {
        // Recipients are only fixed inside the traversal, so `count` stays unset.
        self.bus
            .publish(Event::new(EventKind::MessageDispatched).with_message(msg));

        let bus = &self.bus;
        self.registry
            .for_each(|sub| {
                let msg = msg.clone();
                async move {
                    if let Err(err) = sub.send(msg.clone()).await {
                        bus.publish(Event::delivery_failed(&err, &msg));
                    }
                }
            })
            .await;
    }

    fn publish_dispatched(&self, msg: &Message, recipients: usize) {
        self.bus.publish(
            Event::new(EventKind::MessageDispatched)
                .with_message(msg)
                .with_count(recipients),
        );
    }
}
