//! Prometheus metrics, registered once at startup and exposed at
//! `/metrics` through a shared `Registry`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Request-latency buckets in milliseconds, tuned for an in-process
/// recommendation call.
fn latency_buckets_ms() -> Vec<f64> {
    vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0]
}

pub struct Metrics {
    registry: Registry,
    pub messages_processed: IntCounterVec,
    pub scores_computed: IntCounterVec,
    pub cache_hits: IntCounterVec,
    pub cache_misses: IntCounterVec,
    pub breaker_trips: IntCounterVec,
    pub request_latency_ms: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let messages_processed = IntCounterVec::new(
            Opts::new("evrec_messages_processed_total", "MB messages processed per topic"),
            &["topic", "outcome"],
        )?;
        let scores_computed = IntCounterVec::new(
            Opts::new("evrec_scores_computed_total", "Station scores computed"),
            &["outcome"],
        )?;
        let cache_hits = IntCounterVec::new(
            Opts::new("evrec_cache_hits_total", "SSS cache hits per key kind"),
            &["kind"],
        )?;
        let cache_misses = IntCounterVec::new(
            Opts::new("evrec_cache_misses_total", "SSS cache misses per key kind"),
            &["kind"],
        )?;
        let breaker_trips = IntCounterVec::new(
            Opts::new("evrec_breaker_trips_total", "Circuit breaker trips per model"),
            &["model"],
        )?;
        let request_latency_ms = HistogramVec::new(
            prometheus::HistogramOpts::new("evrec_request_latency_ms", "HTTP request latency")
                .buckets(latency_buckets_ms()),
            &["route"],
        )?;

        registry.register(Box::new(messages_processed.clone()))?;
        registry.register(Box::new(scores_computed.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(breaker_trips.clone()))?;
        registry.register(Box::new(request_latency_ms.clone()))?;

        Ok(Self {
            registry,
            messages_processed,
            scores_computed,
            cache_hits,
            cache_misses,
            breaker_trips,
            request_latency_ms,
        })
    }

    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Axum handler for `GET /metrics`.
pub async fn metrics_handler(
    metrics: axum::extract::State<std::sync::Arc<Metrics>>,
) -> impl IntoResponse {
    match metrics.gather_text() {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to gather metrics: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_without_duplicate_metric_errors() {
        let metrics = Metrics::new().unwrap();
        metrics.messages_processed.with_label_values(&["station.telemetry", "ok"]).inc();
        let text = metrics.gather_text().unwrap();
        assert!(text.contains("evrec_messages_processed_total"));
    }
}
