//! Feature Engineer: consumes station telemetry, computes normalized
//! per-station features, caches them in SSS, and republishes them for the
//! Scorer.

mod engineer;
mod normalize;
mod worker;

pub use engineer::compute_features;
pub use normalize::normalize;
pub use worker::FeatureEngineerWorker;
