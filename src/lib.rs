//! # fanvisor
//!
//! **fanvisor** is a small dynamic fan-out broadcast runtime for tokio.
//!
//! Subscribers join at runtime, a single dispatcher broadcasts one message per
//! tick to every subscriber currently registered, and one shared termination
//! signal brings the whole system down cooperatively within a grace period.
//!
//! ## Architecture
//! ```text
//!   OS signal / Hub::shutdown()
//!              │
//!              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Hub (coordinator)                                                │
//! │  - CancellationToken (single write-once termination signal)       │
//! │  - Registry (Mutex<Vec<Arc<Subscriber>>>, insertion ordered)      │
//! │  - AliveTracker (live loops, waited on during shutdown)           │
//! │  - Bus + ObserverSet (status events → observers)                  │
//! └──────┬──────────────────────────────────┬─────────────────────────┘
//!        ▼                                  ▼
//! ┌──────────────┐                   ┌──────────────┐
//! │  Membership  │  add(worker{i})   │  Dispatcher  │  snapshot → deliver (bounded)
//! │ (every 1s)   ├──────► Registry ◄─┤ (every 0.5s) │  or for_each → send (locked)
//! └──────────────┘                   └──────┬───────┘
//!                                           ▼
//!                         [inbox] worker0  [inbox] worker1  ...  [inbox] workerN
//!                            │                 │                    │
//!                        select! { cancelled ⇒ exit, recv ⇒ MessageReceived }
//! ```
//!
//! ## Guarantees
//! - every subscriber registered when a tick is taken receives that tick exactly once;
//!   later joiners never see earlier ticks
//! - per-subscriber FIFO; no ordering across subscribers
//! - closing the termination signal is idempotent
//! - best-effort, at-most-once delivery; a stalled subscriber is reported
//!   (`DeliveryStalled`), never retried
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] observer (renders events via `tracing`).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fanvisor::{Config, Hub};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         join_interval: Duration::from_millis(20),
//!         dispatch_interval: Duration::from_millis(10),
//!         send_timeout: Duration::from_millis(5),
//!         max_joins: 3,
//!         ..Config::default()
//!     };
//!     let hub = Hub::builder(cfg).build()?;
//!
//!     // Stop after a short while instead of waiting for Ctrl-C.
//!     hub.run_until(tokio::time::sleep(Duration::from_millis(100))).await?;
//!     assert!(hub.is_shutdown());
//!     assert_eq!(hub.alive().count(), 0);
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod observers;

// ---- Public re-exports ----

pub use crate::core::{
    AliveGuard, AliveTracker, Config, DeliveryMode, Dispatcher, Hub, HubBuilder, Membership,
    Message, Registry, Subscriber, wait_for_shutdown_signal,
};
pub use error::{ConfigError, DeliveryError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use observers::{Observe, ObserverSet};

// Optional: expose a simple built-in logger observer.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
