//! Multiplicative score penalties sourced from the Prediction Gateway.
//!
//! Every auxiliary call degrades independently: a PG failure for one model
//! simply omits that penalty rather than failing the whole computation, so
//! a score is always produced once features parse.

use evrec_gateway::PredictionGateway;
use evrec_types::model::RiskLevel;
use evrec_types::prediction::{ModelId, Prediction};
use tokio_util::sync::CancellationToken;

const LOAD_PENALTY_THRESHOLD: f64 = 0.8;
const LOAD_PENALTY_SLOPE: f64 = 0.5;

const FAULT_HIGH_MULTIPLIER: f64 = 0.7;
const FAULT_MEDIUM_MULTIPLIER: f64 = 0.9;

/// Queue-surge threshold, retained as the default named in the scoring
/// design note (`queuePrediction.prediction[0] > 8`).
const QUEUE_SURGE_THRESHOLD: f64 = 8.0;
const QUEUE_SURGE_MULTIPLIER: f64 = 0.9;

const WAIT_SURGE_THRESHOLD_MINUTES: f64 = 15.0;
const WAIT_SURGE_MULTIPLIER: f64 = 0.9;

const RECOMMENDER_LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;
const RECOMMENDER_LOW_CONFIDENCE_MULTIPLIER: f64 = 0.95;

const MAINTENANCE_ACTION_MULTIPLIER: f64 = 0.8;

fn load_multiplier(prediction: &Prediction) -> f64 {
    let Prediction::Load(p) = prediction else { return 1.0 };
    if p.predicted_load > LOAD_PENALTY_THRESHOLD {
        1.0 - LOAD_PENALTY_SLOPE * (p.predicted_load - LOAD_PENALTY_THRESHOLD)
    } else {
        1.0
    }
}

fn fault_multiplier(prediction: &Prediction) -> f64 {
    let Prediction::Fault(p) = prediction else { return 1.0 };
    match p.risk_level {
        RiskLevel::High => FAULT_HIGH_MULTIPLIER,
        RiskLevel::Medium => FAULT_MEDIUM_MULTIPLIER,
        RiskLevel::Low => 1.0,
    }
}

fn queue_multiplier(prediction: &Prediction) -> f64 {
    let Prediction::Scalar(p) = prediction else { return 1.0 };
    if p.value > QUEUE_SURGE_THRESHOLD {
        QUEUE_SURGE_MULTIPLIER
    } else {
        1.0
    }
}

fn wait_multiplier(prediction: &Prediction) -> f64 {
    let Prediction::Scalar(p) = prediction else { return 1.0 };
    if p.value > WAIT_SURGE_THRESHOLD_MINUTES {
        WAIT_SURGE_MULTIPLIER
    } else {
        1.0
    }
}

fn recommender_multiplier(prediction: &Prediction) -> f64 {
    let Prediction::Scalar(p) = prediction else { return 1.0 };
    if p.value < RECOMMENDER_LOW_CONFIDENCE_THRESHOLD {
        RECOMMENDER_LOW_CONFIDENCE_MULTIPLIER
    } else {
        1.0
    }
}

fn action_multiplier(prediction: &Prediction) -> f64 {
    let Prediction::Scalar(p) = prediction else { return 1.0 };
    if p.flag {
        MAINTENANCE_ACTION_MULTIPLIER
    } else {
        1.0
    }
}

/// Fetch every auxiliary prediction for `station_id` concurrently and fold
/// them into one multiplier, clamped to `[0, 1]`. Each call's failure
/// independently leaves that factor at 1.0 (no penalty).
pub async fn compute_penalty_multiplier(
    gateway: &PredictionGateway,
    station_id: &str,
    cancel: &CancellationToken,
) -> f64 {
    let (load, fault, queue, wait, recommender, action) = tokio::join!(
        gateway.predict(ModelId::Load, station_id, cancel),
        gateway.predict(ModelId::Fault, station_id, cancel),
        gateway.predict(ModelId::Queue, station_id, cancel),
        gateway.predict(ModelId::Wait, station_id, cancel),
        gateway.predict(ModelId::Recommender, station_id, cancel),
        gateway.predict(ModelId::Action, station_id, cancel),
    );

    let mut multiplier = 1.0;
    if let Ok(p) = &load {
        multiplier *= load_multiplier(p);
    }
    if let Ok(p) = &fault {
        multiplier *= fault_multiplier(p);
    }
    if let Ok(p) = &queue {
        multiplier *= queue_multiplier(p);
    }
    if let Ok(p) = &wait {
        multiplier *= wait_multiplier(p);
    }
    if let Ok(p) = &recommender {
        multiplier *= recommender_multiplier(p);
    }
    if let Ok(p) = &action {
        multiplier *= action_multiplier(p);
    }

    multiplier.clamp(0.0, 1.0)
}
