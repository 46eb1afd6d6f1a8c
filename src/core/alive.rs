//! # Live-loop tracker.
//!
//! Keeps the set of long-running loops (subscriber delivery loops, the dispatcher,
//! the membership manager) that have not exited yet. The hub waits for this set
//! to drain during shutdown and reports whatever is left as stuck.
//!
//! ## Architecture
//! ```text
//! Subscriber::start ─┐                       ┌─► count() / snapshot()
//! Dispatcher        ─┼─► enter(name) → Guard ┤
//! Membership        ─┘        │ drop         └─► wait_idle()  (Hub shutdown)
//!                             ▼
//!                      watch<BTreeSet<name>>
//! ```
//!
//! ## Rules
//! - `enter` is synchronous, so a loop is counted **before** it is spawned
//! - the returned [`AliveGuard`] removes the name when dropped, including on panic
//! - names are unique per hub; entering the same name twice is counted once

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

/// Thread-safe set of live loop names.
#[derive(Debug)]
pub struct AliveTracker {
    state: watch::Sender<BTreeSet<Arc<str>>>,
}

impl AliveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(BTreeSet::new());
        Self { state }
    }

    /// Marks `name` as alive until the returned guard is dropped.
    #[must_use = "the loop is reported as exited as soon as the guard is dropped"]
    pub fn enter(self: &Arc<Self>, name: impl Into<Arc<str>>) -> AliveGuard {
        let name = name.into();
        self.state.send_modify(|set| {
            set.insert(Arc::clone(&name));
        });
        AliveGuard {
            tracker: Arc::clone(self),
            name,
        }
    }

    fn leave(&self, name: &str) {
        self.state.send_modify(|set| {
            set.remove(name);
        });
    }

    /// Number of loops that have not exited yet.
    pub fn count(&self) -> usize {
        self.state.borrow().len()
    }

    /// Returns true if `name` is still running.
    pub fn is_alive(&self, name: &str) -> bool {
        self.state.borrow().contains(name)
    }

    /// Returns the sorted names of loops that have not exited yet.
    pub fn snapshot(&self) -> Vec<String> {
        self.state.borrow().iter().map(|n| n.to_string()).collect()
    }

    /// Completes once no loop is alive.
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(BTreeSet::is_empty).await;
    }
}

impl Default for AliveTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration of one live loop; dropping it marks the loop as exited.
#[derive(Debug)]
pub struct AliveGuard {
    tracker: Arc<AliveTracker>,
    name: Arc<str>,
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.tracker.leave(&self.name);
    }
}
