//! # Example: broadcast
//!
//! Subscribers join every second, a message is broadcast every 500ms, and
//! Ctrl-C (or SIGTERM) stops everything within the grace period.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► tracing_subscriber (RUST_LOG, default "info")
//!   ├─► Hub::builder(cfg).with_observers([LogWriter]).build()
//!   └─► hub.run()
//!         ├─► Membership: worker0 .. worker9
//!         ├─► Dispatcher: test-1, test-2, ...
//!         └─► on signal: ShutdownRequested → loops stop → AllStoppedWithin
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example broadcast --features logging
//! ```

use std::sync::Arc;

use fanvisor::{Config, Hub, LogWriter, Observe};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let observers: Vec<Arc<dyn Observe>> = vec![Arc::new(LogWriter::new())];
    let hub = Hub::builder(Config::default())
        .with_observers(observers)
        .build()?;

    hub.run().await?;
    Ok(())
}
