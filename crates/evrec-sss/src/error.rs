use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SssError {
    #[error("SSS connection error: {0}")]
    Connection(String),

    #[error("SSS command error: {0}")]
    Command(String),

    #[error("SSS serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for SssError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            SssError::Connection(err.to_string())
        } else {
            SssError::Command(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SssError {
    fn from(err: serde_json::Error) -> Self {
        SssError::Serialization(err.to_string())
    }
}
