//! Consumer-loop wiring for the Feature Engineer: subscribes to
//! `station.telemetry`, computes features per message, caches them in SSS
//! with a short TTL, and republishes on `station.features`.

use std::sync::Arc;

use evrec_dr::StationHistoryRepository;
use evrec_mb::{decode_or_skip, MbConsumer, MbProducer, Outcome, Topic};
use evrec_sss::{Keys, SharedStateStore, SharedStateStoreExt};
use evrec_types::config::FeatureRanges;
use evrec_types::model::StationTelemetry;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::engineer::compute_features;

pub struct FeatureEngineerWorker {
    sss: Arc<dyn SharedStateStore>,
    producer: Arc<MbProducer>,
    history: Arc<dyn StationHistoryRepository>,
    ranges: FeatureRanges,
    feature_cache_ttl_secs: u64,
}

impl FeatureEngineerWorker {
    pub fn new(
        sss: Arc<dyn SharedStateStore>,
        producer: Arc<MbProducer>,
        history: Arc<dyn StationHistoryRepository>,
        ranges: FeatureRanges,
        feature_cache_ttl_secs: u64,
    ) -> Self {
        Self { sss, producer, history, ranges, feature_cache_ttl_secs }
    }

    pub async fn run(&self, consumer: &MbConsumer, shutdown: CancellationToken) -> evrec_mb::Result<()> {
        consumer.subscribe(&[Topic::StationTelemetry])?;
        consumer
            .run(shutdown, |key, payload| async move { self.handle(&key, &payload).await })
            .await
    }

    async fn handle(&self, _key: &str, payload: &[u8]) -> Outcome {
        let Some(telemetry): Option<StationTelemetry> = decode_or_skip(payload, "station.telemetry")
        else {
            return Outcome::Skipped;
        };

        if let Err(err) = evrec_types::validation::validate_telemetry(&telemetry) {
            warn!(station_id = %telemetry.station_id, errors = ?err, "dropping invalid telemetry");
            return Outcome::Skipped;
        }

        // Rolling sample into the history table: best-effort, never
        // blocks or retries the rest of the pipeline on a history-write
        // failure.
        if let Err(err) = self.history.sample(&telemetry).await {
            warn!(error = %err, station_id = %telemetry.station_id, "failed to sample telemetry into station history");
        }

        let features = compute_features(&telemetry, &self.ranges);

        if let Err(err) = self
            .sss
            .set_json(
                &Keys::features(&features.station_id),
                &features,
                Some(self.feature_cache_ttl_secs),
            )
            .await
        {
            warn!(error = %err, station_id = %features.station_id, "failed to cache features, treating as retryable");
            return Outcome::Retryable;
        }

        if let Err(err) = self
            .producer
            .publish_json(Topic::StationFeatures, &features.station_id, &features)
            .await
        {
            warn!(error = %err, station_id = %features.station_id, "failed to publish features, treating as retryable");
            return Outcome::Retryable;
        }

        Outcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evrec_sss::memory::MemorySss;

    #[derive(Default)]
    struct NullHistory;

    #[async_trait]
    impl StationHistoryRepository for NullHistory {
        async fn sample(&self, _telemetry: &StationTelemetry) -> evrec_dr::Result<()> {
            Ok(())
        }
    }

    fn worker() -> FeatureEngineerWorker {
        let sss: Arc<dyn SharedStateStore> = Arc::new(MemorySss::new());
        let producer = MbProducer::new("127.0.0.1:1", "test").unwrap();
        FeatureEngineerWorker::new(
            sss,
            Arc::new(producer),
            Arc::new(NullHistory),
            FeatureRanges::from_env(),
            30,
        )
    }

    #[tokio::test]
    async fn drops_malformed_payload() {
        let outcome = worker().handle("ST_1", b"not json").await;
        assert_eq!(outcome, Outcome::Skipped);
    }
}
