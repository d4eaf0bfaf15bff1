//! Scorer: consumes station features, blends them with configured weights
//! and Prediction Gateway penalties into a single `overallScore`, writes
//! the result to SSS, and upserts the global ranking.

mod components;
mod confidence;
mod penalties;
mod weighting;
mod worker;

pub use components::component_scores;
pub use confidence::confidence;
pub use penalties::compute_penalty_multiplier;
pub use weighting::weighted_score;
pub use worker::ScorerWorker;
