//! Recommendation Handler (RH): the per-query orchestrator. Validates the
//! request, runs OPT, attaches auxiliary operational predictions through
//! PG, builds the NG explanation, logs to DR, and caches the response in
//! SSS.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use evrec_dr::{RecommendationLogRepository, RequestLogRepository};
use evrec_gateway::{ExplanationContext, NarrationGateway, PredictionGateway};
use evrec_optimizer::{Optimizer, OptimizerQuery};
use evrec_sss::{Keys, SharedStateStore, SharedStateStoreExt};
use evrec_types::model::{ChargerType, Recommendation, RecommendationRequest};
use evrec_types::prediction::ModelId;
use evrec_types::validation::validate_recommendation_request;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::RecommendError;

/// Response cache TTL and lifetime, both 5 minutes.
const RESPONSE_TTL_SECS: i64 = 300;

/// Per-request deadline past which outstanding PG/NG calls are cancelled
/// without counting as circuit-breaker failures.
const REQUEST_DEADLINE: std::time::Duration = std::time::Duration::from_secs(5);

/// Every named auxiliary operational model the handler attaches to each
/// ranked station, independent of the six scoring-time penalties the
/// scorer already applies.
const AUXILIARY_MODELS: [ModelId; 8] = [
    ModelId::Traffic,
    ModelId::MicroTraffic,
    ModelId::BatteryRebalance,
    ModelId::StockOrder,
    ModelId::StaffDiversion,
    ModelId::TieUpStorage,
    ModelId::CustomerArrival,
    ModelId::BatteryDemand,
];

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

pub struct RecommendationHandler {
    sss: Arc<dyn SharedStateStore>,
    requests: Arc<dyn RequestLogRepository>,
    recommendations: Arc<dyn RecommendationLogRepository>,
    gateway: Arc<PredictionGateway>,
    narration: Arc<NarrationGateway>,
    optimizer: Arc<Optimizer>,
}

impl RecommendationHandler {
    pub fn new(
        sss: Arc<dyn SharedStateStore>,
        requests: Arc<dyn RequestLogRepository>,
        recommendations: Arc<dyn RecommendationLogRepository>,
        gateway: Arc<PredictionGateway>,
        narration: Arc<NarrationGateway>,
        optimizer: Arc<Optimizer>,
    ) -> Self {
        Self { sss, requests, recommendations, gateway, narration, optimizer }
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendation, RecommendError> {
        validate_recommendation_request(request).map_err(RecommendError::Invalid)?;

        let request_id = Uuid::new_v4().to_string();
        let ctx = RequestContext::new(request_id.clone());
        ctx.cancel_after(REQUEST_DEADLINE);
        let request_json = serde_json::to_value(request).unwrap_or_default();
        self.requests.record_pending(&request_id, &request.user_id, &request_json).await?;

        match self.build_recommendation(&request_id, request, ctx.cancellation_token()).await {
            Ok(recommendation) => {
                self.finish(&request_id, request, &recommendation, ctx.elapsed_ms()).await?;
                Ok(recommendation)
            }
            Err(err) => {
                self.requests.fail(&request_id, &err.to_string()).await.ok();
                Err(err)
            }
        }
    }

    async fn build_recommendation(
        &self,
        request_id: &str,
        request: &RecommendationRequest,
        cancel: &CancellationToken,
    ) -> Result<Recommendation, RecommendError> {
        let query = OptimizerQuery {
            location: request.location,
            max_distance: request.max_distance,
            max_wait_time: request.max_wait_time,
            preferred_charger_type: request.preferred_charger_type,
            prefer_nearby: request.prefer_nearby,
            prefer_reliable: request.prefer_reliable,
            limit: request.limit,
        };
        // Preference re-weighting (step 5) happens inside `Optimizer::recommend`
        // itself, driven by the query fields above; RH does not re-apply it.
        let mut stations = self.optimizer.recommend(&query).await?;

        for station in stations.iter_mut() {
            attach_auxiliary_predictions(&self.gateway, station, cancel).await;
        }

        let total_candidates = stations.len();
        let explanation = match stations.first() {
            Some(top) => {
                let ctx = ExplanationContext {
                    top: top.clone(),
                    alternatives: stations.iter().skip(1).take(2).cloned().collect(),
                    total_candidates,
                    preferred_charger_type_matched: preference_matched(top, request),
                };
                self.narration.explain(&ctx).await
            }
            None => String::new(),
        };

        let generated_at = now_secs();
        Ok(Recommendation {
            request_id: request_id.to_string(),
            user_id: request.user_id.clone(),
            stations,
            explanation,
            generated_at,
            expires_at: generated_at + RESPONSE_TTL_SECS,
        })
    }

    async fn finish(
        &self,
        request_id: &str,
        request: &RecommendationRequest,
        recommendation: &Recommendation,
        elapsed_ms: u64,
    ) -> Result<(), RecommendError> {
        let response_json = serde_json::to_value(recommendation).unwrap_or_default();
        self.requests.complete(request_id, &response_json, elapsed_ms).await?;

        let station_ids: Vec<String> =
            recommendation.stations.iter().map(|s| s.station_id.clone()).collect();
        let metadata = serde_json::json!({ "userId": request.user_id, "totalCandidates": station_ids.len() });
        self.recommendations.log(request_id, &request.user_id, &station_ids, &metadata).await?;

        self.sss
            .set_json(&Keys::recommendation(request_id), recommendation, Some(RESPONSE_TTL_SECS as u64))
            .await?;

        Ok(())
    }

    /// `GET /recommend/{requestId}`. Expiry is checked explicitly against
    /// `now` rather than relying solely on the cache entry's own TTL having
    /// lapsed, so the 5-minute cutoff is testable without a real clock.
    pub async fn get_cached(
        &self,
        request_id: &str,
        now: i64,
    ) -> Result<Recommendation, RecommendError> {
        let cached: Option<Recommendation> =
            self.sss.get_json(&Keys::recommendation(request_id)).await?;
        match cached {
            Some(recommendation) if !recommendation.is_expired(now) => Ok(recommendation),
            Some(_) => Err(RecommendError::NotFound(format!(
                "recommendation {request_id} expired"
            ))),
            None => Err(RecommendError::NotFound(format!(
                "recommendation {request_id} not found"
            ))),
        }
    }

    pub async fn select_station(
        &self,
        request_id: &str,
        station_id: &str,
    ) -> Result<(), RecommendError> {
        self.recommendations.record_selection(request_id, station_id).await?;
        Ok(())
    }

    pub async fn record_feedback(&self, request_id: &str, rating: u8) -> Result<(), RecommendError> {
        if !(1..=5).contains(&rating) {
            return Err(RecommendError::Invalid(vec![evrec_types::validation::FieldError {
                field: "rating".to_string(),
                message: "must be in [1, 5]".to_string(),
            }]));
        }
        self.recommendations.record_feedback(request_id, rating).await?;
        Ok(())
    }
}

fn preference_matched(
    top: &evrec_types::model::RankedStation,
    request: &RecommendationRequest,
) -> bool {
    match request.preferred_charger_type {
        Some(ChargerType::Any) | None => false,
        Some(preferred) => top.charger_types.contains(&preferred),
    }
}

async fn attach_auxiliary_predictions(
    gateway: &PredictionGateway,
    station: &mut evrec_types::model::RankedStation,
    cancel: &CancellationToken,
) {
    let station_id = station.station_id.clone();
    let results = futures::future::join_all(
        AUXILIARY_MODELS.iter().map(|&model| gateway.predict(model, &station_id, cancel)),
    )
    .await;

    for (model, result) in AUXILIARY_MODELS.into_iter().zip(results) {
        match result {
            Ok(prediction) => match serde_json::to_value(&prediction) {
                Ok(value) => {
                    station.predictions.insert(model.as_str().to_string(), value);
                }
                Err(err) => warn!(error = %err, %model, "failed to encode auxiliary prediction"),
            },
            Err(_) => {
                // Individual auxiliary failures degrade silently.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evrec_dr::StationRepository;
    use evrec_sss::memory::MemorySss;
    use evrec_types::config::{CircuitBreakerConfig, GatewayConfig};
    use evrec_types::geo::LatLng;
    use evrec_types::model::Station;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeRequestLog {
        pending: Mutex<Vec<String>>,
        completed: Mutex<Vec<String>>,
        failed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RequestLogRepository for FakeRequestLog {
        async fn record_pending(
            &self,
            request_id: &str,
            _user_id: &str,
            _request: &serde_json::Value,
        ) -> evrec_dr::Result<()> {
            self.pending.lock().push(request_id.to_string());
            Ok(())
        }
        async fn complete(
            &self,
            request_id: &str,
            _response: &serde_json::Value,
            _processing_time_ms: u64,
        ) -> evrec_dr::Result<()> {
            self.completed.lock().push(request_id.to_string());
            Ok(())
        }
        async fn fail(&self, request_id: &str, _reason: &str) -> evrec_dr::Result<()> {
            self.failed.lock().push(request_id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRecommendationLog {
        logged: Mutex<Vec<String>>,
        selected: Mutex<Vec<(String, String)>>,
        feedback: Mutex<Vec<(String, u8)>>,
    }

    #[async_trait]
    impl RecommendationLogRepository for FakeRecommendationLog {
        async fn log(
            &self,
            request_id: &str,
            _user_id: &str,
            _station_ids: &[String],
            _metadata: &serde_json::Value,
        ) -> evrec_dr::Result<()> {
            self.logged.lock().push(request_id.to_string());
            Ok(())
        }
        async fn record_selection(&self, request_id: &str, station_id: &str) -> evrec_dr::Result<()> {
            self.selected.lock().push((request_id.to_string(), station_id.to_string()));
            Ok(())
        }
        async fn record_feedback(&self, request_id: &str, rating: u8) -> evrec_dr::Result<()> {
            self.feedback.lock().push((request_id.to_string(), rating));
            Ok(())
        }
    }

    struct FakeStations {
        by_id: HashMap<String, Station>,
    }

    #[async_trait]
    impl StationRepository for FakeStations {
        async fn find_by_id(&self, station_id: &str) -> evrec_dr::Result<Option<Station>> {
            Ok(self.by_id.get(station_id).cloned())
        }
        async fn find_all(&self) -> evrec_dr::Result<Vec<Station>> {
            Ok(self.by_id.values().cloned().collect())
        }
    }

    fn station(id: &str, lat: f64, lon: f64) -> Station {
        Station {
            station_id: id.to_string(),
            name: format!("{id} Station"),
            address: "addr".to_string(),
            location: LatLng::new(lat, lon),
            total_chargers: 10,
            charger_types: vec![evrec_types::model::ChargerType::Fast],
            max_capacity: 500.0,
            region: "r".to_string(),
            grid_id: "g".to_string(),
        }
    }

    fn unreachable_gateway_config() -> GatewayConfig {
        GatewayConfig {
            model_service_url: "http://127.0.0.1:1".to_string(),
            llm_api_key: None,
            timeout_ms: 200,
            breaker: CircuitBreakerConfig { failure_threshold: 5, window_secs: 30, cooldown_secs: 30 },
        }
    }

    fn handler(stations: Vec<Station>) -> RecommendationHandler {
        let sss: Arc<dyn SharedStateStore> = Arc::new(MemorySss::new());
        let by_id = stations.into_iter().map(|s| (s.station_id.clone(), s)).collect();
        let station_repo: Arc<dyn StationRepository> = Arc::new(FakeStations { by_id });
        let optimizer = Arc::new(Optimizer::new(sss.clone(), station_repo));
        let gateway = Arc::new(PredictionGateway::new(unreachable_gateway_config(), sss.clone()));
        let narration = Arc::new(NarrationGateway::new(unreachable_gateway_config()));
        RecommendationHandler::new(
            sss,
            Arc::new(FakeRequestLog::default()),
            Arc::new(FakeRecommendationLog::default()),
            gateway,
            narration,
            optimizer,
        )
    }

    fn request(lat: f64, lon: f64) -> RecommendationRequest {
        RecommendationRequest {
            user_id: "u1".to_string(),
            location: LatLng::new(lat, lon),
            vehicle_type: None,
            battery_level: None,
            preferred_charger_type: None,
            max_wait_time: None,
            max_distance: None,
            limit: 3,
            prefer_nearby: false,
            prefer_reliable: false,
        }
    }

    #[tokio::test]
    async fn cold_start_recommendation_round_trips_through_cache() {
        let stations = vec![station("ST_101", 37.7749, -122.4194), station("ST_102", 38.5, -121.5)];
        let h = handler(stations);
        let recommendation = h.recommend(&request(37.7749, -122.4194)).await.unwrap();
        assert_eq!(recommendation.stations[0].station_id, "ST_101");
        assert!(!recommendation.explanation.is_empty());

        let cached = h.get_cached(&recommendation.request_id, recommendation.generated_at).await.unwrap();
        assert_eq!(cached.request_id, recommendation.request_id);
    }

    #[tokio::test]
    async fn cached_recommendation_expires_after_five_minutes() {
        let stations = vec![station("ST_201", 37.7749, -122.4194)];
        let h = handler(stations);
        let recommendation = h.recommend(&request(37.7749, -122.4194)).await.unwrap();

        let past_expiry = recommendation.expires_at + 1;
        let err = h.get_cached(&recommendation.request_id, past_expiry).await.unwrap_err();
        assert!(matches!(err, RecommendError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_any_dr_write() {
        let h = handler(vec![station("ST_301", 37.7749, -122.4194)]);
        let mut bad = request(200.0, 0.0);
        bad.user_id = "u1".to_string();
        let err = h.recommend(&bad).await.unwrap_err();
        assert!(matches!(err, RecommendError::Invalid(_)));
    }

    #[tokio::test]
    async fn degrades_gracefully_when_prediction_gateway_is_unreachable() {
        let stations = vec![station("ST_401", 37.7749, -122.4194)];
        let h = handler(stations);
        let recommendation = h.recommend(&request(37.7749, -122.4194)).await.unwrap();
        assert_eq!(recommendation.stations.len(), 1);
        assert!(recommendation.stations[0].predictions.is_empty());
    }

    #[tokio::test]
    async fn record_feedback_rejects_out_of_range_rating() {
        let h = handler(vec![station("ST_501", 37.7749, -122.4194)]);
        let err = h.record_feedback("req-1", 9).await.unwrap_err();
        assert!(matches!(err, RecommendError::Invalid(_)));
    }
}
