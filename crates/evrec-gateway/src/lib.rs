//! Prediction Gateway and Narration Gateway: the pipeline's two outbound
//! calls to external services, each wrapped in cache-first reads and
//! failure isolation so a degraded dependency never blocks scoring or
//! recommendation assembly.

mod breaker;
mod error;
mod narration;
mod prediction_gateway;
mod retry;

pub use breaker::CircuitBreaker;
pub use error::GatewayError;
pub use narration::{rule_based, ExplanationContext, NarrationGateway};
pub use prediction_gateway::PredictionGateway;
pub use retry::{with_retry, RetryPolicy};
