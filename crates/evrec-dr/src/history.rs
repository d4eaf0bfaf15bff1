use async_trait::async_trait;
use deadpool_postgres::Pool;
use evrec_types::model::StationTelemetry;

use crate::Result;

/// `station_history`: a rolling sample of accepted telemetry, not a
/// durable record of every computed score.
#[async_trait]
pub trait StationHistoryRepository: Send + Sync {
    async fn sample(&self, telemetry: &StationTelemetry) -> Result<()>;
}

pub struct PgStationHistoryRepository {
    pool: Pool,
}

impl PgStationHistoryRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StationHistoryRepository for PgStationHistoryRepository {
    async fn sample(&self, telemetry: &StationTelemetry) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO station_history \
                 (station_id, queue_length, avg_service_time, available_chargers, \
                  fault_rate, available_power, recorded_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, to_timestamp($7))",
                &[
                    &telemetry.station_id,
                    &(telemetry.queue_length as i32),
                    &telemetry.avg_service_time,
                    &(telemetry.available_chargers as i32),
                    &telemetry.fault_rate,
                    &telemetry.available_power,
                    &(telemetry.timestamp as f64),
                ],
            )
            .await?;
        Ok(())
    }
}
