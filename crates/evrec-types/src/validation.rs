//! Validation rules centralized so the ingestion handler and the
//! recommendation handler share one source of truth instead of
//! re-deriving range checks per handler.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

fn in_range(field: &str, value: f64, lo: f64, hi: f64) -> Result<(), FieldError> {
    if value < lo || value > hi {
        Err(FieldError::new(
            field,
            format!("must be in [{lo}, {hi}], got {value}"),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_lat(lat: f64) -> Result<(), FieldError> {
    in_range("lat", lat, -90.0, 90.0)
}

pub fn validate_lon(lon: f64) -> Result<(), FieldError> {
    in_range("lon", lon, -180.0, 180.0)
}

pub fn validate_battery_level(level: f64) -> Result<(), FieldError> {
    in_range("batteryLevel", level, 0.0, 100.0)
}

pub fn validate_total_chargers(total: u32) -> Result<(), FieldError> {
    if total < 1 {
        Err(FieldError::new("totalChargers", "must be >= 1"))
    } else {
        Ok(())
    }
}

pub fn validate_fault_rate(rate: f64) -> Result<(), FieldError> {
    in_range("faultRate", rate, 0.0, 1.0)
}

pub fn validate_limit(limit: u32) -> Result<(), FieldError> {
    if !(1..=20).contains(&limit) {
        Err(FieldError::new("limit", "must be in [1, 20]"))
    } else {
        Ok(())
    }
}

/// Collects field errors instead of failing fast, so a caller can report
/// every violation in one 400 response rather than one-at-a-time.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, result: Result<(), FieldError>) -> &mut Self {
        if let Err(e) = result {
            self.errors.push(e);
        }
        self
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

use crate::model::{GridStatus, RecommendationRequest, StationHealth, StationTelemetry, UserContext};

pub fn validate_telemetry(t: &StationTelemetry) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.check(validate_fault_rate(t.fault_rate));
    v.check(validate_total_chargers(t.total_chargers));
    if t.available_chargers > t.total_chargers {
        v.check(Err(FieldError::new(
            "availableChargers",
            "must be <= totalChargers",
        )));
    }
    if t.available_power > t.max_capacity && t.max_capacity > 0.0 {
        v.check(Err(FieldError::new(
            "availablePower",
            "must be <= maxCapacity",
        )));
    }
    if t.station_id.trim().is_empty() {
        v.check(Err(FieldError::new("stationId", "must not be empty")));
    }
    v.finish()
}

pub fn validate_user_context(c: &UserContext) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    if c.user_id.trim().is_empty() {
        v.check(Err(FieldError::new("userId", "must not be empty")));
    }
    if let Some(b) = c.battery_level {
        v.check(validate_battery_level(b));
    }
    if let Some(loc) = c.last_location {
        v.check(validate_lat(loc.latitude));
        v.check(validate_lon(loc.longitude));
    }
    v.finish()
}

pub fn validate_grid_status(g: &GridStatus) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    if g.grid_id.trim().is_empty() {
        v.check(Err(FieldError::new("gridId", "must not be empty")));
    }
    v.check(in_range("loadFactor", g.load_factor, 0.0, 1.0));
    v.finish()
}

pub fn validate_health(h: &StationHealth) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    if h.station_id.trim().is_empty() {
        v.check(Err(FieldError::new("stationId", "must not be empty")));
    }
    v.check(in_range("healthScore", h.health_score, 0.0, 100.0));
    v.finish()
}

pub fn validate_recommendation_request(r: &RecommendationRequest) -> Result<(), Vec<FieldError>> {
    let mut v = Validator::new();
    v.check(validate_lat(r.location.latitude));
    v.check(validate_lon(r.location.longitude));
    v.check(validate_limit(r.limit));
    if let Some(b) = r.battery_level {
        v.check(validate_battery_level(b));
    }
    if r.user_id.trim().is_empty() {
        v.check(Err(FieldError::new("userId", "must not be empty")));
    }
    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;

    #[test]
    fn lat_out_of_range_is_rejected() {
        assert!(validate_lat(91.0).is_err());
        assert!(validate_lat(-91.0).is_err());
        assert!(validate_lat(0.0).is_ok());
    }

    #[test]
    fn limit_bounds() {
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(21).is_err());
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(20).is_ok());
    }

    #[test]
    fn telemetry_rejects_available_exceeding_total() {
        let t = StationTelemetry {
            station_id: "ST_1".into(),
            queue_length: 0,
            avg_service_time: 1.0,
            available_chargers: 5,
            total_chargers: 3,
            fault_rate: 0.1,
            available_power: 10.0,
            max_capacity: 100.0,
            timestamp: 0,
        };
        assert!(validate_telemetry(&t).is_err());
    }

    #[test]
    fn request_collects_multiple_errors() {
        let r = RecommendationRequest {
            user_id: String::new(),
            location: LatLng::new(200.0, 0.0),
            vehicle_type: None,
            battery_level: None,
            preferred_charger_type: None,
            max_wait_time: None,
            max_distance: None,
            limit: 99,
            prefer_nearby: false,
            prefer_reliable: false,
        };
        let errs = validate_recommendation_request(&r).unwrap_err();
        assert!(errs.len() >= 3);
    }
}
