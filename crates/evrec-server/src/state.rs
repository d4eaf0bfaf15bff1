use std::sync::Arc;

use axum::extract::FromRef;
use evrec_ingest::IngestionHandler;
use evrec_observability::Metrics;
use evrec_recommend::RecommendationHandler;
use evrec_sss::SharedStateStore;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestionHandler>,
    pub recommend: Arc<RecommendationHandler>,
    pub sss: Arc<dyn SharedStateStore>,
    pub metrics: Arc<Metrics>,
}

/// Lets `metrics_handler`'s `State<Arc<Metrics>>` extractor work inside a
/// router whose top-level state is `AppState`.
impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
