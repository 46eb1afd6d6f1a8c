//! Runtime core: membership, dispatch, shutdown.
//!
//! Internal modules:
//! - [`subscriber`]: one endpoint with an inbox and a cancellable delivery loop;
//! - [`registry`]: guarded, insertion-ordered set of subscribers;
//! - [`membership`]: periodic joins;
//! - [`dispatcher`]: periodic fan-out;
//! - [`alive`]: live-loop tracking used to bound shutdown;
//! - [`hub`]: top-level coordinator and graceful shutdown;
//! - [`shutdown`]: OS termination signals.
//!
//! ```text
//!                      ┌──────────── Hub ────────────┐
//!                      │  CancellationToken (signal) │
//!                      │  Registry   AliveTracker    │
//!                      └──────┬───────────────┬──────┘
//!                             ▼               ▼
//!                        Membership       Dispatcher
//!                       (join / 1s)     (tick / 500ms)
//!                             │               │
//!                 add(sub) ───┴──► Registry ◄─┴─── snapshot / for_each
//!                                     │
//!                        ┌────────────┼────────────┐
//!                        ▼            ▼            ▼
//!                     worker0      worker1  ...  workerN
//!                  (inbox+loop)  (inbox+loop)  (inbox+loop)
//! ```

mod alive;
mod builder;
mod config;
mod dispatcher;
mod hub;
mod membership;
mod message;
mod registry;
mod shutdown;
mod subscriber;

pub use alive::{AliveGuard, AliveTracker};
pub use builder::HubBuilder;
pub use config::{Config, DeliveryMode};
pub use dispatcher::Dispatcher;
pub use hub::Hub;
pub use membership::Membership;
pub use message::Message;
pub use registry::Registry;
pub use shutdown::wait_for_shutdown_signal;
pub use subscriber::Subscriber;
