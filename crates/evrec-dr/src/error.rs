use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DrError {
    #[error("DR connection error: {0}")]
    Connection(String),

    #[error("DR query error: {0}")]
    Query(String),

    #[error("DR row decode error: {0}")]
    Decode(String),
}

impl From<tokio_postgres::Error> for DrError {
    fn from(err: tokio_postgres::Error) -> Self {
        DrError::Query(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for DrError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        DrError::Connection(err.to_string())
    }
}
