//! Narration Gateway: turns a ranked result set into a one- or two-sentence
//! human explanation, either via the configured LLM endpoint or a
//! deterministic rule-based fallback that never performs network I/O.

use evrec_types::config::GatewayConfig;
use evrec_types::model::RankedStation;
use tracing::warn;

/// Everything NG needs to describe a recommendation; assembled by RH from
/// the request and the ranked result before calling into NG.
#[derive(Debug, Clone)]
pub struct ExplanationContext {
    pub top: RankedStation,
    pub alternatives: Vec<RankedStation>,
    pub total_candidates: usize,
    pub preferred_charger_type_matched: bool,
}

pub struct NarrationGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl NarrationGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .expect("reqwest client configuration is valid");
        Self { client, config }
    }

    /// Produce an explanation, calling the LLM endpoint when configured and
    /// falling back to the deterministic rule-based text on any failure or
    /// when no API key is set.
    pub async fn explain(&self, ctx: &ExplanationContext) -> String {
        let Some(api_key) = &self.config.llm_api_key else {
            return rule_based(ctx);
        };

        match self.call_llm(api_key, ctx).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "narration LLM call failed, using rule-based fallback");
                rule_based(ctx)
            }
        }
    }

    async fn call_llm(&self, api_key: &str, ctx: &ExplanationContext) -> Result<String, String> {
        #[derive(serde::Deserialize)]
        struct LlmResponse {
            explanation: String,
        }

        let body = serde_json::json!({
            "station_id": ctx.top.station_id,
            "estimated_wait_time": ctx.top.estimated_wait_time,
            "estimated_distance": ctx.top.estimated_distance,
            "total_candidates": ctx.total_candidates,
        });

        let response = self
            .client
            .post(format!("{}/narrate", self.config.model_service_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("narration service returned status {}", response.status()));
        }

        let parsed: LlmResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(parsed.explanation)
    }
}

/// Deterministic, sub-millisecond text generation with no network I/O:
/// distance bucket, wait-time bucket, a comparison against the next-best
/// alternative, and a reliability mention when the top pick's features are
/// available.
pub fn rule_based(ctx: &ExplanationContext) -> String {
    let mut parts = Vec::new();

    let distance_phrase = match ctx.top.estimated_distance {
        d if d < 1.0 => "very close by".to_string(),
        d if d < 5.0 => format!("{d:.1} km away"),
        d => format!("{d:.0} km away"),
    };
    let wait_phrase = match ctx.top.estimated_wait_time {
        w if w < 2.0 => "with virtually no wait".to_string(),
        w if w < 10.0 => format!("with about a {w:.0}-minute wait"),
        w => format!("with a longer {w:.0}-minute wait"),
    };
    parts.push(format!(
        "{} is {distance_phrase} {wait_phrase}.",
        ctx.top.station_name
    ));

    if let Some(alt) = ctx.alternatives.first() {
        if alt.estimated_wait_time > ctx.top.estimated_wait_time + 1.0 {
            parts.push(format!(
                "It also has a shorter wait than the next option, which is about {:.0} minutes.",
                alt.estimated_wait_time
            ));
        }
    }

    if let Some(features) = &ctx.top.features {
        if features.station_reliability_score >= 0.8 {
            parts.push("It has a strong reliability record.".to_string());
        }
    }

    if ctx.preferred_charger_type_matched {
        parts.push("It offers your preferred charger type.".to_string());
    }

    if ctx.total_candidates > 1 {
        parts.push(format!("Ranked from {} nearby candidates.", ctx.total_candidates));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use evrec_types::model::{ChargerType, StationFeatures};

    fn station(distance: f64, wait: f64) -> RankedStation {
        RankedStation {
            station_id: "s1".to_string(),
            station_name: "Market Street Station".to_string(),
            rank: 1,
            score: 0.9,
            estimated_wait_time: wait,
            estimated_distance: distance,
            available_chargers: 3,
            charger_types: vec![ChargerType::Fast],
            features: None,
            predictions: Default::default(),
        }
    }

    fn ctx(distance: f64, wait: f64) -> ExplanationContext {
        ExplanationContext {
            top: station(distance, wait),
            alternatives: Vec::new(),
            total_candidates: 1,
            preferred_charger_type_matched: false,
        }
    }

    #[test]
    fn mentions_short_distance_and_no_wait() {
        let text = rule_based(&ctx(0.5, 1.0));
        assert!(text.contains("very close by"));
        assert!(text.contains("virtually no wait"));
    }

    #[test]
    fn mentions_top_station_name() {
        let text = rule_based(&ctx(1.0, 2.0));
        assert!(text.contains("Market Street Station"));
    }

    #[test]
    fn mentions_longer_wait_bucket() {
        let text = rule_based(&ctx(8.0, 15.0));
        assert!(text.contains("8.0 km away"));
        assert!(text.contains("longer"));
    }

    #[test]
    fn compares_against_next_best_alternative() {
        let mut context = ctx(2.0, 3.0);
        context.alternatives.push(station(3.0, 9.0));
        let text = rule_based(&context);
        assert!(text.contains("shorter wait"));
    }

    #[test]
    fn mentions_reliability_when_high() {
        let mut context = ctx(2.0, 3.0);
        context.top.features = Some(StationFeatures {
            station_id: "s1".to_string(),
            effective_wait_time: 3.0,
            station_reliability_score: 0.95,
            energy_stability_index: 0.9,
            charger_availability_ratio: 0.5,
            distance_penalty: 0.1,
            normalized_features: evrec_types::model::NormalizedFeatures {
                wait_time: 0.9,
                availability: 0.5,
                reliability: 0.95,
                distance: 0.8,
                energy_stability: 0.9,
            },
            timestamp: 0,
        });
        let text = rule_based(&context);
        assert!(text.contains("reliability"));
    }

    #[test]
    fn mentions_preferred_charger_type_match() {
        let mut context = ctx(2.0, 3.0);
        context.preferred_charger_type_matched = true;
        let text = rule_based(&context);
        assert!(text.contains("preferred charger type"));
    }

    #[tokio::test]
    async fn gateway_falls_back_without_api_key() {
        let config = GatewayConfig {
            model_service_url: "http://127.0.0.1:1".to_string(),
            llm_api_key: None,
            timeout_ms: 500,
            breaker: evrec_types::config::CircuitBreakerConfig {
                failure_threshold: 5,
                window_secs: 30,
                cooldown_secs: 30,
            },
        };
        let gateway = NarrationGateway::new(config);
        let text = gateway.explain(&ctx(1.0, 2.0)).await;
        assert!(!text.is_empty());
    }
}
