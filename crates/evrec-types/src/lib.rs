//! Shared data model, validation, and cross-cutting helpers for the EV
//! station recommendation backend.
//!
//! Every stage (Feature Engineer, Scorer, Optimizer, Recommendation
//! Handler, Ingestion Handler) depends on this crate for the wire/cache
//! schemas so the envelopes stored in the shared state store and published
//! on the message bus are typed once, not re-derived per consumer.

pub mod config;
pub mod error;
pub mod geo;
pub mod model;
pub mod prediction;
pub mod rounding;
pub mod validation;

pub use error::{ApiError, ErrorKind};
pub use rounding::round4;
