use evrec_types::error::ApiError;
use evrec_types::validation::FieldError;
use thiserror::Error;

/// Mirrors the shape of `OptError`/`GatewayError`: one variant per
/// dependency IH can fail against. Kept crate-local (rather than
/// implementing `From<IngestError> for ApiError`, which the orphan rule
/// forbids here) and converted explicitly at the HTTP boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    #[error("invalid payload")]
    Invalid(Vec<FieldError>),

    #[error("shared state store unavailable: {0}")]
    Sss(#[from] evrec_sss::SssError),

    #[error("message bus unavailable: {0}")]
    Mb(#[from] evrec_mb::MbError),
}

impl IngestError {
    pub fn into_api_error(self) -> ApiError {
        match self {
            IngestError::Invalid(fields) => ApiError::invalid_fields(fields),
            IngestError::Sss(e) => ApiError::dependency_unavailable(e.to_string()),
            IngestError::Mb(e) => ApiError::dependency_unavailable(e.to_string()),
        }
    }
}
