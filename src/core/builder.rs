use std::sync::Arc;

use super::{config::Config, hub::Hub};
use crate::{
    error::ConfigError,
    events::Bus,
    observers::{Observe, ObserverSet},
};

/// Builder for constructing a [`Hub`].
pub struct HubBuilder {
    cfg: Config,
    observers: Vec<Arc<dyn Observe>>,
}

impl HubBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
        }
    }

    /// Sets event observers.
    ///
    /// Observers receive runtime events (joins, dispatches, receipts, shutdown progress)
    /// through dedicated workers with bounded queues.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Validates the configuration and builds the hub.
    ///
    /// Observer workers are spawned here, so this must be called within a tokio runtime.
    pub fn build(self) -> Result<Arc<Hub>, ConfigError> {
        self.cfg.validate()?;
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let observers = ObserverSet::new(self.observers, bus.clone());
        Ok(Arc::new(Hub::new_internal(self.cfg, bus, observers)))
    }
}
