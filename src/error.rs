//! Error types used by the fanvisor runtime.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`] — errors raised by the hub while shutting down.
//! - [`DeliveryError`] — a single message could not reach a subscriber's inbox.
//! - [`ConfigError`] — a [`Config`](crate::Config) was rejected before startup.
//!
//! Registry operations and closing the termination signal are infallible and have no error type.
//! All enums provide `as_label` for logs/metrics.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the fanvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some loops were still running when the hub returned.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the loops that did not exit in time.
        stuck: Vec<String>,
    },

    /// Registering OS signal listeners failed.
    ///
    /// The hub still shuts down gracefully before returning this error.
    #[error("failed to listen for termination signals: {source}")]
    Signal {
        /// Underlying I/O error from the signal driver.
        #[from]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fanvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(1), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal { .. } => "runtime_signal",
        }
    }
}

/// # Errors produced while delivering one message to one subscriber.
///
/// A delivery error never aborts a fan-out: it only concerns the named subscriber.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's inbox stayed full for the whole delivery bound.
    #[error("subscriber {subscriber} stalled: inbox full for {waited:?}")]
    Stalled {
        /// Subscriber name.
        subscriber: Arc<str>,
        /// How long the dispatcher waited before giving up.
        waited: Duration,
    },

    /// The subscriber's delivery loop has exited; its inbox is closed.
    #[error("subscriber {subscriber} closed its inbox")]
    Closed {
        /// Subscriber name.
        subscriber: Arc<str>,
    },
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fanvisor::DeliveryError;
    ///
    /// let err = DeliveryError::Closed { subscriber: "worker0".into() };
    /// assert_eq!(err.as_label(), "delivery_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Stalled { .. } => "delivery_stalled",
            DeliveryError::Closed { .. } => "delivery_closed",
        }
    }

    /// Name of the subscriber the delivery was addressed to.
    pub fn subscriber(&self) -> &str {
        match self {
            DeliveryError::Stalled { subscriber, .. } | DeliveryError::Closed { subscriber } => {
                subscriber
            }
        }
    }
}

/// # Errors produced by [`Config::validate`](crate::Config::validate).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration that must be non-zero (loop interval or delivery bound) was zero.
    #[error("{field} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The dispatch tick must be strictly shorter than the join interval.
    #[error("dispatch interval {dispatch:?} must be shorter than join interval {join:?}")]
    DispatchNotFaster {
        /// Configured dispatch interval.
        dispatch: Duration,
        /// Configured join interval.
        join: Duration,
    },

    /// In snapshot mode every delivery must give up before the next tick is due.
    #[error("send timeout {send_timeout:?} must be shorter than dispatch interval {dispatch:?}")]
    SendTimeoutNotBelowTick {
        /// Configured per-delivery bound.
        send_timeout: Duration,
        /// Configured dispatch interval.
        dispatch: Duration,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroInterval { .. } => "config_zero_interval",
            ConfigError::DispatchNotFaster { .. } => "config_dispatch_not_faster",
            ConfigError::SendTimeoutNotBelowTick { .. } => "config_send_timeout_not_below_tick",
        }
    }
}
