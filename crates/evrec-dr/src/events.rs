use async_trait::async_trait;
use deadpool_postgres::Pool;

use crate::Result;

/// Unexpected failures are logged here with severity=error.
#[async_trait]
pub trait SystemEventsRepository: Send + Sync {
    async fn record(&self, severity: &str, source: &str, message: &str) -> Result<()>;
}

pub struct PgSystemEventsRepository {
    pool: Pool,
}

impl PgSystemEventsRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SystemEventsRepository for PgSystemEventsRepository {
    async fn record(&self, severity: &str, source: &str, message: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO system_events (severity, source, message) VALUES ($1, $2, $3)",
                &[&severity, &source, &message],
            )
            .await?;
        Ok(())
    }
}
