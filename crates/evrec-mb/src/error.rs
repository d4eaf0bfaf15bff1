use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MbError {
    #[error("MB client error: {0}")]
    Client(String),

    #[error("MB serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rdkafka::error::KafkaError> for MbError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        MbError::Client(err.to_string())
    }
}
