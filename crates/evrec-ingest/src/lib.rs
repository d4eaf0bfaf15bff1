//! Ingestion Handler: the entry point for all four raw submission kinds
//! (telemetry, user context, grid status, station health). A synchronous
//! HTTP-request handler that validates, caches, and publishes without
//! ever touching the message bus's consumer side.

mod error;
mod handler;

pub use error::IngestError;
pub use handler::IngestionHandler;
