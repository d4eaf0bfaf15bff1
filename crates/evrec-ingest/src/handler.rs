//! Ingestion Handler: validate, mirror into the shared state store with
//! a short TTL, publish to the message bus keyed by the submission's
//! natural id, and acknowledge without waiting on downstream pipeline
//! processing.

use std::sync::Arc;

use evrec_mb::{MbProducer, Topic};
use evrec_sss::{Keys, SharedStateStore, SharedStateStoreExt};
use evrec_types::model::{GridStatus, StationHealth, StationTelemetry, UserContext};
use evrec_types::validation;
use tracing::warn;

use crate::error::IngestError;

/// Short mirror TTL: long enough for downstream stages to read a
/// just-submitted value before their own computed caches take over, short
/// enough that a stale mirror never outlives a real update.
const MIRROR_TTL_SECS: u64 = 30;

pub struct IngestionHandler {
    sss: Arc<dyn SharedStateStore>,
    producer: Arc<MbProducer>,
}

impl IngestionHandler {
    pub fn new(sss: Arc<dyn SharedStateStore>, producer: Arc<MbProducer>) -> Self {
        Self { sss, producer }
    }

    pub async fn ingest_telemetry(&self, telemetry: StationTelemetry) -> Result<(), IngestError> {
        validation::validate_telemetry(&telemetry).map_err(IngestError::Invalid)?;

        self.sss
            .set_json(
                &Keys::telemetry(&telemetry.station_id),
                &telemetry,
                Some(MIRROR_TTL_SECS),
            )
            .await?;

        self.producer
            .publish_json(Topic::StationTelemetry, &telemetry.station_id, &telemetry)
            .await?;

        Ok(())
    }

    pub async fn ingest_user_context(&self, context: UserContext) -> Result<(), IngestError> {
        validation::validate_user_context(&context).map_err(IngestError::Invalid)?;

        self.sss
            .set_json(
                &Keys::user_context(&context.user_id),
                &context,
                Some(MIRROR_TTL_SECS),
            )
            .await?;

        self.producer
            .publish_json(Topic::UserContext, &context.user_id, &context)
            .await?;

        Ok(())
    }

    pub async fn ingest_grid_status(&self, status: GridStatus) -> Result<(), IngestError> {
        validation::validate_grid_status(&status).map_err(IngestError::Invalid)?;

        self.sss
            .set_json(
                &Keys::grid_status(&status.grid_id),
                &status,
                Some(MIRROR_TTL_SECS),
            )
            .await?;

        self.producer
            .publish_json(Topic::GridStatus, &status.grid_id, &status)
            .await?;

        Ok(())
    }

    pub async fn ingest_health(&self, health: StationHealth) -> Result<(), IngestError> {
        validation::validate_health(&health).map_err(IngestError::Invalid)?;

        self.sss
            .set_json(
                &Keys::health(&health.station_id),
                &health,
                Some(MIRROR_TTL_SECS),
            )
            .await?;

        if let Err(err) = self
            .producer
            .publish_json(Topic::StationHealth, &health.station_id, &health)
            .await
        {
            warn!(error = %err, station_id = %health.station_id, "health publish failed after SSS mirror succeeded");
            return Err(err.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evrec_sss::memory::MemorySss;
    use evrec_types::model::HealthStatus;

    fn handler() -> IngestionHandler {
        let sss: Arc<dyn SharedStateStore> = Arc::new(MemorySss::new());
        let producer = Arc::new(MbProducer::new("127.0.0.1:1", "test").unwrap());
        IngestionHandler::new(sss, producer)
    }

    fn telemetry() -> StationTelemetry {
        StationTelemetry {
            station_id: "ST_1".into(),
            queue_length: 2,
            avg_service_time: 5.0,
            available_chargers: 3,
            total_chargers: 5,
            fault_rate: 0.05,
            available_power: 50.0,
            max_capacity: 100.0,
            timestamp: 1000,
        }
    }

    #[tokio::test]
    async fn accepts_and_mirrors_valid_telemetry() {
        let h = handler();
        h.ingest_telemetry(telemetry()).await.unwrap();
        let cached: Option<StationTelemetry> =
            h.sss.get_json(&Keys::telemetry("ST_1")).await.unwrap();
        assert_eq!(cached.unwrap().station_id, "ST_1");
    }

    #[tokio::test]
    async fn rejects_telemetry_with_available_exceeding_total() {
        let h = handler();
        let mut t = telemetry();
        t.available_chargers = 10;
        let err = h.ingest_telemetry(t).await.unwrap_err();
        assert!(matches!(err, IngestError::Invalid(_)));
    }

    #[tokio::test]
    async fn accepts_user_context_without_optional_fields() {
        let h = handler();
        let ctx = UserContext {
            user_id: "U_1".into(),
            vehicle_type: None,
            battery_level: None,
            last_location: None,
            timestamp: 1000,
        };
        h.ingest_user_context(ctx).await.unwrap();
        let cached: Option<UserContext> =
            h.sss.get_json(&Keys::user_context("U_1")).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn rejects_user_context_with_battery_out_of_range() {
        let h = handler();
        let ctx = UserContext {
            user_id: "U_1".into(),
            vehicle_type: None,
            battery_level: Some(150.0),
            last_location: None,
            timestamp: 1000,
        };
        let err = h.ingest_user_context(ctx).await.unwrap_err();
        assert!(matches!(err, IngestError::Invalid(_)));
    }

    #[tokio::test]
    async fn accepts_and_mirrors_grid_status() {
        let h = handler();
        let status = GridStatus { grid_id: "G_1".into(), load_factor: 0.6, timestamp: 1000 };
        h.ingest_grid_status(status).await.unwrap();
        let cached: Option<GridStatus> =
            h.sss.get_json(&Keys::grid_status("G_1")).await.unwrap();
        assert_eq!(cached.unwrap().load_factor, 0.6);
    }

    #[tokio::test]
    async fn rejects_grid_status_with_load_factor_out_of_range() {
        let h = handler();
        let status = GridStatus { grid_id: "G_1".into(), load_factor: 1.5, timestamp: 1000 };
        let err = h.ingest_grid_status(status).await.unwrap_err();
        assert!(matches!(err, IngestError::Invalid(_)));
    }

    #[tokio::test]
    async fn accepts_and_mirrors_health() {
        let h = handler();
        let health = StationHealth {
            station_id: "ST_1".into(),
            status: HealthStatus::Operational,
            health_score: 95.0,
            timestamp: 1000,
        };
        h.ingest_health(health).await.unwrap();
        let cached: Option<StationHealth> = h.sss.get_json(&Keys::health("ST_1")).await.unwrap();
        assert_eq!(cached.unwrap().status, HealthStatus::Operational);
    }
}
