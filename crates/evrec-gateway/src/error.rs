use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("model service unreachable: {0}")]
    Unreachable(String),

    #[error("model service returned an error: {0}")]
    ModelError(String),

    #[error("circuit breaker open for {0}")]
    BreakerOpen(String),

    /// Raised when the caller's cancellation token fires mid-request. Never
    /// counted as a breaker failure: cancellation reflects the caller
    /// giving up, not the service misbehaving.
    #[error("request cancelled")]
    Cancelled,

    #[error("response decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether this outcome should count toward the circuit breaker's
    /// sliding-window failure tally.
    pub fn counts_as_breaker_failure(&self) -> bool {
        !matches!(self, GatewayError::Cancelled | GatewayError::BreakerOpen(_))
    }
}
