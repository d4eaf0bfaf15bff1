//! Prediction Gateway: the pipeline's only outbound call to the external
//! model service, wrapping every call in a cache check, a bounded retry,
//! and a per-model circuit breaker.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use evrec_sss::{Keys, SharedStateStore, SharedStateStoreExt};
use evrec_types::config::GatewayConfig;
use evrec_types::model::RiskLevel;
use evrec_types::prediction::{
    FaultPrediction, LoadForecast, ModelId, Prediction, PredictionMeta, ScalarPrediction,
};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::breaker::CircuitBreaker;
use crate::error::GatewayError;
use crate::retry::{with_retry, RetryPolicy};

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    value: f64,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    flag: Option<bool>,
}

pub struct PredictionGateway {
    client: reqwest::Client,
    config: GatewayConfig,
    sss: Arc<dyn SharedStateStore>,
    breaker: CircuitBreaker,
}

impl PredictionGateway {
    pub fn new(config: GatewayConfig, sss: Arc<dyn SharedStateStore>) -> Self {
        let breaker = CircuitBreaker::new(config.breaker.clone());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("reqwest client configuration is valid");
        Self { client, config, sss, breaker }
    }

    /// Resolve a single model's prediction for a station, checking the
    /// shared cache first and degrading to `GatewayError` when the service
    /// or breaker won't serve a fresh value. Callers that tolerate a
    /// missing prediction should treat any `Err` as "no signal".
    #[instrument(skip(self, cancel), fields(model = %model, station_id))]
    pub async fn predict(
        &self,
        model: ModelId,
        station_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Prediction, GatewayError> {
        let cache_key = Keys::prediction(model.as_str(), station_id);
        if let Ok(Some(cached)) = self.sss.get_json::<Prediction>(&cache_key).await {
            return Ok(cached);
        }

        if self.breaker.is_open(model) {
            return Err(GatewayError::BreakerOpen(model.to_string()));
        }

        let result = self.call_with_retry(model, station_id, cancel).await;
        match &result {
            Ok(prediction) => {
                self.breaker.record_success(model);
                let ttl = Some(self.config.breaker.window_secs.max(30));
                if let Err(err) = self.sss.set_json(&cache_key, prediction, ttl).await {
                    warn!(error = %err, "failed to cache prediction");
                }
            }
            Err(err) if err.counts_as_breaker_failure() => self.breaker.record_failure(model),
            Err(_) => {}
        }
        result
    }

    async fn call_with_retry(
        &self,
        model: ModelId,
        station_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Prediction, GatewayError> {
        let policy = RetryPolicy::exponential(3);
        let outcome = with_retry(
            &policy,
            |err: &GatewayError| matches!(err, GatewayError::Unreachable(_)),
            || self.call_once(model, station_id, cancel),
        )
        .await;
        outcome.map(|p| p.clamp_unit_interval())
    }

    async fn call_once(
        &self,
        model: ModelId,
        station_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Prediction, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let url = format!("{}/predict/{}", self.config.model_service_url, model.as_str());
        let body = serde_json::json!({ "station_id": station_id });

        let send = self.client.post(&url).json(&body).send();
        let response = tokio::select! {
            res = send => res.map_err(|e| GatewayError::Unreachable(e.to_string()))?,
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
        };

        if !response.status().is_success() {
            return Err(GatewayError::ModelError(format!(
                "model service returned status {}",
                response.status()
            )));
        }

        let raw: Value =
            response.json().await.map_err(|e| GatewayError::Decode(e.to_string()))?;
        let parsed: ModelResponse =
            serde_json::from_value(raw).map_err(|e| GatewayError::Decode(e.to_string()))?;

        let meta = PredictionMeta { confidence: parsed.confidence.unwrap_or(0.8), timestamp: now_millis() };

        let prediction = match model {
            ModelId::Load => Prediction::Load(LoadForecast { predicted_load: parsed.value, meta }),
            ModelId::Fault => Prediction::Fault(FaultPrediction {
                fault_probability: parsed.value,
                risk_level: risk_level_for(parsed.value),
                meta,
            }),
            _ => Prediction::Scalar(ScalarPrediction {
                value: parsed.value,
                flag: parsed.flag.unwrap_or(false),
                meta,
            }),
        };
        Ok(prediction)
    }
}

fn risk_level_for(fault_probability: f64) -> RiskLevel {
    if fault_probability >= 0.66 {
        RiskLevel::High
    } else if fault_probability >= 0.33 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evrec_sss::memory::MemorySss;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_config(url: String) -> GatewayConfig {
        GatewayConfig {
            model_service_url: url,
            llm_api_key: None,
            timeout_ms: 1000,
            breaker: evrec_types::config::CircuitBreakerConfig {
                failure_threshold: 2,
                window_secs: 30,
                cooldown_secs: 30,
            },
        }
    }

    #[tokio::test]
    async fn predicts_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/load"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": 0.42,
                "confidence": 0.9
            })))
            .mount(&server)
            .await;

        let sss: Arc<dyn SharedStateStore> = Arc::new(MemorySss::new());
        let gateway = PredictionGateway::new(gateway_config(server.uri()), sss.clone());
        let cancel = CancellationToken::new();

        let prediction = gateway.predict(ModelId::Load, "station-1", &cancel).await.unwrap();
        match prediction {
            Prediction::Load(p) => assert!((p.predicted_load - 0.42).abs() < 1e-9),
            _ => panic!("expected a load forecast"),
        }

        let cached: Option<Prediction> =
            sss.get_json(&Keys::prediction("load", "station-1")).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn clamps_out_of_range_fault_probability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/fault"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": 4.0
            })))
            .mount(&server)
            .await;

        let sss: Arc<dyn SharedStateStore> = Arc::new(MemorySss::new());
        let gateway = PredictionGateway::new(gateway_config(server.uri()), sss);
        let cancel = CancellationToken::new();

        let prediction = gateway.predict(ModelId::Fault, "station-2", &cancel).await.unwrap();
        match prediction {
            Prediction::Fault(p) => {
                assert_eq!(p.fault_probability, 1.0);
                assert_eq!(p.risk_level, RiskLevel::High);
            }
            _ => panic!("expected a fault prediction"),
        }
    }

    #[tokio::test]
    async fn opens_breaker_after_repeated_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/queue"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sss: Arc<dyn SharedStateStore> = Arc::new(MemorySss::new());
        let gateway = PredictionGateway::new(gateway_config(server.uri()), sss);
        let cancel = CancellationToken::new();

        assert!(gateway.predict(ModelId::Queue, "station-3", &cancel).await.is_err());
        assert!(gateway.predict(ModelId::Queue, "station-3", &cancel).await.is_err());

        let err = gateway.predict(ModelId::Queue, "station-3", &cancel).await.unwrap_err();
        assert!(matches!(err, GatewayError::BreakerOpen(_)));
    }

    #[tokio::test]
    async fn cancellation_short_circuits_without_tripping_breaker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/wait"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": 0.1})))
            .mount(&server)
            .await;

        let sss: Arc<dyn SharedStateStore> = Arc::new(MemorySss::new());
        let gateway = PredictionGateway::new(gateway_config(server.uri()), sss);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gateway.predict(ModelId::Wait, "station-4", &cancel).await.unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
        assert!(!gateway.breaker.is_open(ModelId::Wait));
    }
}
