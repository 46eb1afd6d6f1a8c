//! # Core observer trait
//!
//! `Observe` is the extension point for plugging custom event handlers into the
//! hub. Each observer is driven by a dedicated worker loop fed by a bounded
//! queue that is owned by the [`ObserverSet`](crate::ObserverSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) – they do **not** block
//!   the dispatcher, subscribers or other observers.
//! - Each observer **declares** its preferred queue capacity via
//!   [`Observe::queue_capacity`]. If a queue overflows, events for that
//!   observer are **dropped** and an `ObserverOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use fanvisor::{Event, EventKind, Observe};
//!
//! #[derive(Default)]
//! struct Receipts(AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl Observe for Receipts {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::MessageReceived {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "receipts" }
//! }
//! ```

use crate::events::Event;
use async_trait::async_trait;

/// Contract for event observers.
///
/// Called from an observer-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this observer's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
