//! Ambient stack shared by every binary: tracing setup, Prometheus
//! metrics, the `system_events` tracing bridge, and graceful shutdown.

mod events;
mod metrics;
mod shutdown;
mod tracing_init;

pub use events::SystemEventLayer;
pub use metrics::{metrics_handler, Metrics};
pub use shutdown::shutdown_signal;
pub use tracing_init::init_tracing;
