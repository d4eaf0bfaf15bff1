//! Tagged prediction variants: every model kind gets its own struct and
//! its own cache representation instead of a free-form object. Unknown
//! kinds fail `ModelId::parse` at configuration time, not at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::RiskLevel;

/// Every model kind SC or RH may call through PG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    Load,
    Fault,
    Traffic,
    MicroTraffic,
    BatteryRebalance,
    StockOrder,
    StaffDiversion,
    TieUpStorage,
    CustomerArrival,
    BatteryDemand,
    Queue,
    Wait,
    Action,
    Recommender,
}

impl ModelId {
    pub const ALL: &'static [ModelId] = &[
        ModelId::Load,
        ModelId::Fault,
        ModelId::Traffic,
        ModelId::MicroTraffic,
        ModelId::BatteryRebalance,
        ModelId::StockOrder,
        ModelId::StaffDiversion,
        ModelId::TieUpStorage,
        ModelId::CustomerArrival,
        ModelId::BatteryDemand,
        ModelId::Queue,
        ModelId::Wait,
        ModelId::Action,
        ModelId::Recommender,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelId::Load => "load",
            ModelId::Fault => "fault",
            ModelId::Traffic => "traffic",
            ModelId::MicroTraffic => "micro_traffic",
            ModelId::BatteryRebalance => "battery_rebalance",
            ModelId::StockOrder => "stock_order",
            ModelId::StaffDiversion => "staff_diversion",
            ModelId::TieUpStorage => "tie_up_storage",
            ModelId::CustomerArrival => "customer_arrival",
            ModelId::BatteryDemand => "battery_demand",
            ModelId::Queue => "queue",
            ModelId::Wait => "wait",
            ModelId::Action => "action",
            ModelId::Recommender => "recommender",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown model id: {0}")]
pub struct UnknownModelId(pub String);

impl FromStr for ModelId {
    type Err = UnknownModelId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownModelId(s.to_string()))
    }
}

/// Common envelope fields carried by every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionMeta {
    pub confidence: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadForecast {
    /// Clamped to [0, 1] at the gateway's boundary; an upstream model
    /// response can report a raw class index instead of a probability.
    pub predicted_load: f64,
    pub meta: PredictionMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultPrediction {
    /// Clamped to [0, 1] at PG's boundary.
    pub fault_probability: f64,
    pub risk_level: RiskLevel,
    pub meta: PredictionMeta,
}

/// Generic scalar model output used for the scorer's queue/wait/
/// maintenance-action multipliers and the recommendation handler's
/// auxiliary operational calls: a single comparable scalar plus an
/// optional flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarPrediction {
    pub value: f64,
    pub flag: bool,
    pub meta: PredictionMeta,
}

/// The result of a single PG call, tagged by which model produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    Load(LoadForecast),
    Fault(FaultPrediction),
    Scalar(ScalarPrediction),
}

impl Prediction {
    pub fn meta(&self) -> PredictionMeta {
        match self {
            Prediction::Load(p) => p.meta,
            Prediction::Fault(p) => p.meta,
            Prediction::Scalar(p) => p.meta,
        }
    }

    /// Clamp any out-of-range scalar to [0, 1] so a misbehaving model
    /// response can never push an invalid value into scoring.
    pub fn clamp_unit_interval(mut self) -> Self {
        match &mut self {
            Prediction::Load(p) => p.predicted_load = p.predicted_load.clamp(0.0, 1.0),
            Prediction::Fault(p) => p.fault_probability = p.fault_probability.clamp(0.0, 1.0),
            Prediction::Scalar(_) => {}
        }
        self
    }
}
