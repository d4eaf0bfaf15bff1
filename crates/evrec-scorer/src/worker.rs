//! Consumer-loop wiring for the Scorer: subscribes to `station.features`,
//! combines component scores with weights and PG penalties, writes the
//! score to SSS, upserts the ranking sorted set, and republishes.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use evrec_gateway::PredictionGateway;
use evrec_mb::{decode_or_skip, MbConsumer, MbProducer, Outcome, Topic};
use evrec_sss::{Keys, SharedStateStore, SharedStateStoreExt};
use evrec_types::config::ScoringWeights;
use evrec_types::model::{StationFeatures, StationScore};
use evrec_types::rounding::round4;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::components::component_scores;
use crate::confidence::confidence;
use crate::penalties::compute_penalty_multiplier;
use crate::weighting::weighted_score;

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

pub struct ScorerWorker {
    sss: Arc<dyn SharedStateStore>,
    producer: Arc<MbProducer>,
    gateway: Arc<PredictionGateway>,
    weights: ScoringWeights,
    score_cache_ttl_secs: u64,
}

impl ScorerWorker {
    pub fn new(
        sss: Arc<dyn SharedStateStore>,
        producer: Arc<MbProducer>,
        gateway: Arc<PredictionGateway>,
        weights: ScoringWeights,
        score_cache_ttl_secs: u64,
    ) -> Self {
        Self { sss, producer, gateway, weights, score_cache_ttl_secs }
    }

    pub async fn run(&self, consumer: &MbConsumer, shutdown: CancellationToken) -> evrec_mb::Result<()> {
        consumer.subscribe(&[Topic::StationFeatures])?;
        consumer
            .run(shutdown, |key, payload| async move { self.handle(&key, &payload).await })
            .await
    }

    async fn handle(&self, _key: &str, payload: &[u8]) -> Outcome {
        let Some(features): Option<StationFeatures> = decode_or_skip(payload, "station.features")
        else {
            return Outcome::Skipped;
        };

        let components = component_scores(&features.normalized_features);
        let base_score = weighted_score(&components, &self.weights);

        let cancel = CancellationToken::new();
        let multiplier =
            compute_penalty_multiplier(&self.gateway, &features.station_id, &cancel).await;
        let overall_score = round4((base_score * multiplier).clamp(0.0, 1.0));

        let conf = confidence(features.timestamp, now_secs(), &features.normalized_features);

        let score = StationScore {
            station_id: features.station_id.clone(),
            overall_score,
            component_scores: components,
            confidence: conf,
            timestamp: now_secs(),
            rank: None,
        };

        if let Err(err) = self
            .sss
            .set_json(&Keys::score(&score.station_id), &score, Some(self.score_cache_ttl_secs))
            .await
        {
            warn!(error = %err, station_id = %score.station_id, "failed to cache score, treating as retryable");
            return Outcome::Retryable;
        }

        if let Err(err) = self.sss.zadd(Keys::RANKING, &score.station_id, score.overall_score).await
        {
            warn!(error = %err, station_id = %score.station_id, "failed to update ranking, treating as retryable");
            return Outcome::Retryable;
        }

        if let Err(err) =
            self.producer.publish_json(Topic::StationScores, &score.station_id, &score).await
        {
            warn!(error = %err, station_id = %score.station_id, "failed to publish score, treating as retryable");
            return Outcome::Retryable;
        }

        Outcome::Ok
    }
}
