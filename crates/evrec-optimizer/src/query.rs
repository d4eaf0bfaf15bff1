use evrec_types::geo::LatLng;
use evrec_types::model::ChargerType;

#[derive(Debug, Clone)]
pub struct OptimizerQuery {
    pub location: LatLng,
    pub max_distance: Option<f64>,
    pub max_wait_time: Option<f64>,
    pub preferred_charger_type: Option<ChargerType>,
    pub prefer_nearby: bool,
    pub prefer_reliable: bool,
    pub limit: u32,
}
