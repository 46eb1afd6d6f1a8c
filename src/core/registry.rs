//! # Registry - guarded, insertion-ordered set of active subscribers.
//!
//! ## Architecture
//! ```text
//! Membership ── add(sub) ──┐
//!                          ├──► Mutex<Vec<Arc<Subscriber>>>
//! Dispatcher ── for_each ──┤        (one exclusive guard, no read/write split)
//!            └─ snapshot ──┘
//! ```
//!
//! ## Rules
//! - Every mutation and every traversal holds the same exclusive guard for its duration.
//! - `for_each` sees a consistent membership: an `add` arriving mid-traversal waits
//!   until the traversal completes.
//! - `for_each` releases the guard only when `action` has finished for every member,
//!   so an action that never completes blocks every other caller (head-of-line blocking).
//! - `snapshot` copies the members under the guard and releases it immediately.
//! - Members are never removed; the registry reaches subscribers but cannot stop them.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::subscriber::Subscriber;

/// Concurrency-safe collection of active subscribers.
#[derive(Debug, Default)]
pub struct Registry {
    members: Mutex<Vec<Arc<Subscriber>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends `subscriber`; visible to every traversal that starts after this returns.
    ///
    /// Returns the registry size after the append.
    pub async fn add(&self, subscriber: Arc<Subscriber>) -> usize {
        let mut members = self.members.lock().await;
        members.push(subscriber);
        members.len()
    }

    /// Invokes `action` once per member, in insertion order, while holding the guard.
    ///
    /// Each invocation is awaited before the next one starts. The guard is released
    /// after the last invocation completes.
    pub async fn for_each<F, Fut>(&self, mut action: F)
    where
        F: FnMut(Arc<Subscriber>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let members = self.members.lock().await;
        for sub in members.iter() {
            action(Arc::clone(sub)).await;
        }
    }

    /// Returns a point-in-time copy of the members without holding the guard afterwards.
    pub async fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.members.lock().await.clone()
    }

    /// Number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    /// Returns true if no subscriber has joined yet.
    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }

    /// Names of the registered subscribers in insertion order.
    pub async fn names(&self) -> Vec<String> {
        self.members
            .lock()
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }
}
