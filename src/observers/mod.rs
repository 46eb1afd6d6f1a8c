//! # Event observers for the fanvisor runtime.
//!
//! This module provides the [`Observe`] trait and the [`ObserverSet`] that feeds
//! runtime events broadcast through the [`Bus`](crate::events::Bus) to them.
//!
//! ## Architecture
//! ```text
//! Membership / Dispatcher / Subscriber loops / Hub
//!        └── publish(Event) ──► Bus ──► Hub observer listener ──► ObserverSet::emit
//!                                                                   ├──► LogWriter
//!                                                                   └──► custom observers
//! ```

mod observer;
mod set;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observer::Observe;
pub use set::ObserverSet;
