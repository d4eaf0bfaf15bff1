//! The data model: entities that flow through telemetry → features →
//! scores → ranking → recommendation.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

pub type StationId = String;
pub type UserId = String;
pub type GridId = String;

/// Raw periodic observation of a station, as submitted by IH.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationTelemetry {
    pub station_id: StationId,
    pub queue_length: u32,
    /// Minutes.
    pub avg_service_time: f64,
    pub available_chargers: u32,
    pub total_chargers: u32,
    /// In [0, 1].
    pub fault_rate: f64,
    pub available_power: f64,
    pub max_capacity: f64,
    /// Unix seconds.
    pub timestamp: i64,
}

/// The five features normalized to [0, 1], oriented so higher is always
/// better for the objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFeatures {
    pub wait_time: f64,
    pub availability: f64,
    pub reliability: f64,
    pub distance: f64,
    pub energy_stability: f64,
}

/// Engineered per-station signal, produced by FE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationFeatures {
    pub station_id: StationId,
    pub effective_wait_time: f64,
    pub station_reliability_score: f64,
    pub energy_stability_index: f64,
    pub charger_availability_ratio: f64,
    pub distance_penalty: f64,
    pub normalized_features: NormalizedFeatures,
    pub timestamp: i64,
}

/// Per-component utility breakdown, identity-mapped from normalized
/// features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScores {
    pub wait: f64,
    pub availability: f64,
    pub reliability: f64,
    pub distance: f64,
    pub energy_stability: f64,
}

/// Scalar utility and component breakdown, produced by SC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationScore {
    pub station_id: StationId,
    pub overall_score: f64,
    pub component_scores: ComponentScores,
    pub confidence: f64,
    pub timestamp: i64,
    /// Set by OPT only; never authoritative in the SSS cache entry.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rank: Option<u32>,
}

/// Risk bucket attached to `FaultPrediction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Charger type a driver may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargerType {
    Fast,
    Standard,
    Any,
}

/// Station master record (immutable-ish registry), owned exclusively by DR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub station_id: StationId,
    pub name: String,
    pub address: String,
    pub location: LatLng,
    pub total_chargers: u32,
    pub charger_types: Vec<ChargerType>,
    pub max_capacity: f64,
    pub region: String,
    pub grid_id: GridId,
}

/// Station health state machine. Only `Operational`/`Degraded` are
/// selectable by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Operational,
    Degraded,
    Offline,
    Maintenance,
}

impl HealthStatus {
    pub fn is_selectable(self) -> bool {
        matches!(self, HealthStatus::Operational | HealthStatus::Degraded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationHealth {
    pub station_id: StationId,
    pub status: HealthStatus,
    /// 0-100.
    pub health_score: f64,
    pub timestamp: i64,
}

/// A user query for the best station given location and trip context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub user_id: UserId,
    pub location: LatLng,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub preferred_charger_type: Option<ChargerType>,
    #[serde(default)]
    pub max_wait_time: Option<f64>,
    #[serde(default)]
    pub max_distance: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Drives the distance-preference boost in OPT's re-weighting pass.
    #[serde(default)]
    pub prefer_nearby: bool,
    /// Drives the reliability-preference boost in OPT's re-weighting pass.
    #[serde(default)]
    pub prefer_reliable: bool,
}

fn default_limit() -> u32 {
    5
}

/// Single result row, constructed per-request by OPT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStation {
    pub station_id: StationId,
    pub station_name: String,
    pub rank: u32,
    pub score: f64,
    pub estimated_wait_time: f64,
    pub estimated_distance: f64,
    pub available_chargers: u32,
    pub charger_types: Vec<ChargerType>,
    pub features: Option<StationFeatures>,
    #[serde(default)]
    pub predictions: std::collections::BTreeMap<String, serde_json::Value>,
}

/// Response payload assembled by RH.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub request_id: String,
    pub user_id: UserId,
    pub stations: Vec<RankedStation>,
    pub explanation: String,
    /// Unix seconds.
    pub generated_at: i64,
    /// `generated_at + 300`.
    pub expires_at: i64,
}

impl Recommendation {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// A raw user-context submission (IH's second validated schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: UserId,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub last_location: Option<LatLng>,
    pub timestamp: i64,
}

/// Grid-level status submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStatus {
    pub grid_id: GridId,
    pub load_factor: f64,
    pub timestamp: i64,
}
