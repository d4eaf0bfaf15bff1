use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde_json::Value;

use crate::Result;

/// `recommendation_logs` table; `request_id` is unique.
#[async_trait]
pub trait RecommendationLogRepository: Send + Sync {
    async fn log(
        &self,
        request_id: &str,
        user_id: &str,
        station_ids: &[String],
        metadata: &Value,
    ) -> Result<()>;

    /// `POST /recommend/{requestId}/select`.
    async fn record_selection(&self, request_id: &str, station_id: &str) -> Result<()>;

    /// `POST /recommend/{requestId}/feedback`.
    async fn record_feedback(&self, request_id: &str, rating: u8) -> Result<()>;
}

pub struct PgRecommendationLogRepository {
    pool: Pool,
}

impl PgRecommendationLogRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationLogRepository for PgRecommendationLogRepository {
    async fn log(
        &self,
        request_id: &str,
        user_id: &str,
        station_ids: &[String],
        metadata: &Value,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO recommendation_logs (request_id, user_id, station_ids, metadata) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (request_id) DO UPDATE SET station_ids = EXCLUDED.station_ids, \
                 metadata = EXCLUDED.metadata",
                &[&request_id, &user_id, &station_ids, metadata],
            )
            .await?;
        Ok(())
    }

    async fn record_selection(&self, request_id: &str, station_id: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE recommendation_logs SET selected_station_id = $2 WHERE request_id = $1",
                &[&request_id, &station_id],
            )
            .await?;
        Ok(())
    }

    async fn record_feedback(&self, request_id: &str, rating: u8) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE recommendation_logs SET feedback = $2 WHERE request_id = $1",
                &[&request_id, &(rating as i16)],
            )
            .await?;
        Ok(())
    }
}
