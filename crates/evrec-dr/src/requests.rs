use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde_json::Value;

use crate::Result;

/// `user_requests` table: request + response + processingTime + status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Completed,
    Failed,
}

impl RequestStatus {
    fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }
}

#[async_trait]
pub trait RequestLogRepository: Send + Sync {
    /// Record a pending request row before the optimizer runs.
    async fn record_pending(&self, request_id: &str, user_id: &str, request: &Value) -> Result<()>;
    /// Update with response and elapsed time once the request succeeds.
    async fn complete(
        &self,
        request_id: &str,
        response: &Value,
        processing_time_ms: u64,
    ) -> Result<()>;
    /// Record the failure reason on the request row before it surfaces
    /// to the caller.
    async fn fail(&self, request_id: &str, reason: &str) -> Result<()>;
}

pub struct PgRequestLogRepository {
    pool: Pool,
}

impl PgRequestLogRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestLogRepository for PgRequestLogRepository {
    async fn record_pending(&self, request_id: &str, user_id: &str, request: &Value) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO user_requests (request_id, user_id, request, status) \
                 VALUES ($1, $2, $3, $4)",
                &[&request_id, &user_id, request, &RequestStatus::Pending.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn complete(
        &self,
        request_id: &str,
        response: &Value,
        processing_time_ms: u64,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE user_requests SET response = $2, processing_time_ms = $3, status = $4 \
                 WHERE request_id = $1",
                &[
                    &request_id,
                    response,
                    &(processing_time_ms as i64),
                    &RequestStatus::Completed.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn fail(&self, request_id: &str, reason: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE user_requests SET status = $2, failure_reason = $3 WHERE request_id = $1",
                &[&request_id, &RequestStatus::Failed.as_str(), &reason],
            )
            .await?;
        Ok(())
    }
}
