use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OptError {
    #[error("shared state store unavailable: {0}")]
    Sss(#[from] evrec_sss::SssError),

    #[error("durable repository unavailable: {0}")]
    Dr(#[from] evrec_dr::DrError),
}
