//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the hub and [`DeliveryMode`].
//!
//! ## Sentinel values
//! - `max_joins = 0` → joins continue until shutdown

use std::time::Duration;

use crate::error::ConfigError;

/// How the dispatcher fans a message out to the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Snapshot the members under the registry guard, release it, then deliver
    /// concurrently with each send bounded by [`Config::send_timeout`].
    ///
    /// A slow subscriber only loses its own messages; joins are never blocked.
    #[default]
    Snapshot,

    /// Deliver inside [`Registry::for_each`](crate::Registry::for_each), awaiting each
    /// send while the guard is held.
    ///
    /// A subscriber that stops draining its inbox blocks the dispatcher **and** every
    /// `Registry::add` caller until shutdown (head-of-line blocking).
    Locked,
}

/// Global configuration for the hub.
///
/// ## Field semantics
/// - `join_interval`: delay between two membership joins
/// - `dispatch_interval`: dispatcher tick; must be non-zero and shorter than `join_interval`
/// - `max_joins`: number of join events (`0` = until shutdown)
/// - `grace`: maximum wait for loops to exit after the signal closes
/// - `inbox_capacity`: per-subscriber inbox buffer (min 1)
/// - `send_timeout`: per-delivery bound in [`DeliveryMode::Snapshot`]; must be non-zero and
///   shorter than `dispatch_interval` so a stalled subscriber cannot stretch the tick
/// - `delivery`: fan-out strategy
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `name_prefix`: subscriber names are `{name_prefix}{join_index}`
/// - `message_prefix`: payloads are `{message_prefix}-{seq}`
#[derive(Clone, Debug)]
pub struct Config {
    /// Interval between two join events.
    pub join_interval: Duration,
    /// Interval between two dispatch ticks.
    pub dispatch_interval: Duration,
    /// Number of join events before the membership manager stops (`0` = unbounded).
    pub max_joins: usize,
    /// Maximum time to wait for all loops to exit once shutdown starts.
    pub grace: Duration,
    /// Capacity of each subscriber's inbox.
    pub inbox_capacity: usize,
    /// Upper bound for a single delivery in snapshot mode.
    pub send_timeout: Duration,
    /// Fan-out strategy used by the dispatcher.
    pub delivery: DeliveryMode,
    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
    /// Prefix of generated subscriber names.
    pub name_prefix: String,
    /// Prefix of generated message payloads.
    pub message_prefix: String,
}

impl Config {
    /// Returns the join cap as an `Option` (`None` → run until shutdown).
    #[inline]
    pub fn join_limit(&self) -> Option<usize> {
        if self.max_joins == 0 {
            None
        } else {
            Some(self.max_joins)
        }
    }

    /// Returns the inbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn inbox_capacity_clamped(&self) -> usize {
        self.inbox_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Name of the subscriber created by join number `index` (0-based).
    pub fn subscriber_name(&self, index: usize) -> String {
        format!("{}{}", self.name_prefix, index)
    }

    /// Payload of the message with sequence `seq` (1-based).
    pub fn message_payload(&self, seq: u64) -> String {
        format!("{}-{}", self.message_prefix, seq)
    }

    /// Checks the interval invariants the periodic loops rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.join_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "join_interval",
            });
        }
        if self.dispatch_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "dispatch_interval",
            });
        }
        if self.dispatch_interval >= self.join_interval {
            return Err(ConfigError::DispatchNotFaster {
                dispatch: self.dispatch_interval,
                join: self.join_interval,
            });
        }
        if self.delivery == DeliveryMode::Snapshot {
            if self.send_timeout.is_zero() {
                return Err(ConfigError::ZeroInterval {
                    field: "send_timeout",
                });
            }
            if self.send_timeout >= self.dispatch_interval {
                return Err(ConfigError::SendTimeoutNotBelowTick {
                    send_timeout: self.send_timeout,
                    dispatch: self.dispatch_interval,
                });
            }
        }
        Ok(())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `join_interval = 1s`, `dispatch_interval = 500ms`
    /// - `max_joins = 10`
    /// - `grace = 1s`
    /// - `inbox_capacity = 16`, `send_timeout = 250ms`, `delivery = Snapshot`
    /// - `bus_capacity = 1024`
    /// - `name_prefix = "worker"`, `message_prefix = "test"`
    fn default() -> Self {
        Self {
            join_interval: Duration::from_secs(1),
            dispatch_interval: Duration::from_millis(500),
            max_joins: 10,
            grace: Duration::from_secs(1),
            inbox_capacity: 16,
            send_timeout: Duration::from_millis(250),
            delivery: DeliveryMode::default(),
            bus_capacity: 1024,
            name_prefix: "worker".to_string(),
            message_prefix: "test".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn test_dispatch_must_be_faster_than_join() {
        let cfg = Config {
            dispatch_interval: Duration::from_secs(1),
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DispatchNotFaster { .. })
        ));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let cfg = Config {
            join_interval: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroInterval {
                field: "join_interval"
            })
        );

        let cfg = Config {
            dispatch_interval: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroInterval {
                field: "dispatch_interval"
            })
        );
    }

    #[test]
    fn test_sentinels() {
        let cfg = Config {
            max_joins: 0,
            inbox_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.join_limit(), None);
        assert_eq!(cfg.inbox_capacity_clamped(), 1);
    }

    #[test]
    fn test_send_timeout_must_stay_below_tick() {
        let cfg = Config {
            send_timeout: Duration::from_millis(500),
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::SendTimeoutNotBelowTick {
                send_timeout: Duration::from_millis(500),
                dispatch: Duration::from_millis(500),
            })
        );

        let cfg = Config {
            send_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroInterval {
                field: "send_timeout"
            })
        );

        // The bound is unused while the registry guard is held.
        let cfg = Config {
            send_timeout: Duration::from_secs(5),
            delivery: DeliveryMode::Locked,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_derived_names() {
        let cfg = Config::default();
        assert_eq!(cfg.subscriber_name(0), "worker0");
        assert_eq!(cfg.subscriber_name(9), "worker9");
        assert_eq!(cfg.message_payload(4), "test-4");
    }
}
