use evrec_types::error::ApiError;
use evrec_types::validation::FieldError;
use thiserror::Error;
use tracing::error;

/// Crate-local error, converted to `ApiError` via an inherent method rather
/// than a `From` impl (the orphan rule blocks that from here).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecommendError {
    #[error("invalid request")]
    Invalid(Vec<FieldError>),

    #[error("requested entity not found: {0}")]
    NotFound(String),

    #[error("shared state store unavailable: {0}")]
    Sss(#[from] evrec_sss::SssError),

    #[error("durable repository unavailable: {0}")]
    Dr(#[from] evrec_dr::DrError),

    #[error("optimizer failed: {0}")]
    Opt(#[from] evrec_optimizer::OptError),
}

impl RecommendError {
    pub fn into_api_error(self) -> ApiError {
        let api_error = match self {
            RecommendError::Invalid(fields) => ApiError::invalid_fields(fields),
            RecommendError::NotFound(message) => ApiError::not_found(message),
            RecommendError::Sss(e) => ApiError::internal(e.to_string()),
            RecommendError::Dr(e) => ApiError::internal(e.to_string()),
            RecommendError::Opt(e) => ApiError::internal(e.to_string()),
        };
        // Log every system-error-kind failure (DependencyUnavailable /
        // InternalFailure) so `SystemEventLayer` persists it to
        // `system_events`; InvalidInput/NotFound are request errors, not
        // system errors, and stay unlogged.
        if api_error.is_system_error() {
            error!(kind = ?api_error.kind, message = %api_error.message, "recommendation request failed");
        }
        api_error
    }
}
