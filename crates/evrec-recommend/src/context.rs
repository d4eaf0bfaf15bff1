//! Request-scoped orchestration context: a single cancellation-carrying
//! handle threaded through every prediction-gateway, narration-gateway,
//! and repository call the handler makes for one query.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub struct RequestContext {
    pub request_id: String,
    started: Instant,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(request_id: String) -> Self {
        Self { request_id, started: Instant::now(), cancel: CancellationToken::new() }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wall-clock time elapsed since this context was constructed, for
    /// the `user_requests.processing_time_ms` column.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Cancels every outstanding PG/NG call launched against this context
    /// after `timeout` elapses.
    pub fn cancel_after(&self, timeout: Duration) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        });
    }
}
