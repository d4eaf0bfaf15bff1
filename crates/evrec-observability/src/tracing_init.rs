//! Process-wide tracing initialization, configured from environment
//! variables.

use std::sync::Arc;

use evrec_dr::SystemEventsRepository;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::events::SystemEventLayer;

/// Installs the global tracing subscriber. `log_level` is the fallback
/// filter when `RUST_LOG` is unset; `log_format` selects `"json"` or
/// (anything else) pretty human-readable output. When `events` is
/// provided, every ERROR-level event is additionally mirrored into
/// `system_events` through a [`SystemEventLayer`].
pub fn init_tracing(
    log_level: &str,
    log_format: &str,
    events: Option<Arc<dyn SystemEventsRepository>>,
) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(events.map(SystemEventLayer::new));

    if log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}
