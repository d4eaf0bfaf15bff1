//! Query-time ranking: candidate selection, feasibility filtering, distance
//! decay, and preference re-weighting over the global ranking sorted set.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use evrec_dr::StationRepository;
use evrec_sss::{Keys, SharedStateStore, SharedStateStoreExt};
use evrec_types::geo::haversine_km;
use evrec_types::model::{
    ChargerType, HealthStatus, RankedStation, Station, StationFeatures, StationHealth,
};
use evrec_types::prediction::{FaultPrediction, Prediction};
use evrec_types::rounding::round4;

use crate::error::OptError;
use crate::query::OptimizerQuery;

type Result<T> = std::result::Result<T, OptError>;

const CANDIDATE_MULTIPLIER: usize = 3;
const COLD_START_SCORE: f64 = 0.5;
const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;
const MIN_HEALTH_SCORE: f64 = 50.0;
const FAULT_PROBABILITY_CEILING: f64 = 0.3;
const MIN_AVAILABILITY_RATIO: f64 = 0.1;

const PREFERENCE_BOOST: f64 = 1.2;
const NEARBY_THRESHOLD_KM: f64 = 5.0;
const RELIABLE_FAULT_THRESHOLD: f64 = 0.1;

pub struct Optimizer {
    sss: Arc<dyn SharedStateStore>,
    stations: Arc<dyn StationRepository>,
}

impl Optimizer {
    pub fn new(sss: Arc<dyn SharedStateStore>, stations: Arc<dyn StationRepository>) -> Self {
        Self { sss, stations }
    }

    pub async fn recommend(&self, query: &OptimizerQuery) -> Result<Vec<RankedStation>> {
        let limit = query.limit as usize;
        let candidate_ids = self
            .sss
            .zrevrange(Keys::RANKING, limit.saturating_mul(CANDIDATE_MULTIPLIER))
            .await?;

        if candidate_ids.is_empty() {
            return self.cold_start(query).await;
        }

        let mut results = Vec::with_capacity(limit);
        for (station_id, base_score) in candidate_ids {
            if results.len() >= limit {
                break;
            }
            if let Some(ranked) = self.evaluate_candidate(&station_id, base_score, query).await? {
                results.push(ranked);
            }
        }

        finalize(&mut results, query);
        Ok(results)
    }

    async fn cold_start(&self, query: &OptimizerQuery) -> Result<Vec<RankedStation>> {
        let mut stations = self.stations.find_all().await?;
        stations.sort_by(|a, b| {
            let da = haversine_km(query.location, a.location);
            let db = haversine_km(query.location, b.location);
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        });

        let mut ranked = Vec::new();
        for (i, station) in stations.into_iter().take(query.limit as usize).enumerate() {
            let distance = haversine_km(query.location, station.location);
            ranked.push(RankedStation {
                station_id: station.station_id.clone(),
                station_name: station.name.clone(),
                rank: (i + 1) as u32,
                score: COLD_START_SCORE,
                estimated_wait_time: 0.0,
                estimated_distance: round4(distance),
                available_chargers: station.total_chargers,
                charger_types: station.charger_types,
                features: None,
                predictions: BTreeMap::new(),
            });
        }
        Ok(ranked)
    }

    async fn evaluate_candidate(
        &self,
        station_id: &str,
        base_score: f64,
        query: &OptimizerQuery,
    ) -> Result<Option<RankedStation>> {
        if let Some(health) = self.sss.get_json::<StationHealth>(&Keys::health(station_id)).await? {
            if !health.status.is_selectable() || health.health_score < MIN_HEALTH_SCORE {
                return Ok(None);
            }
        }

        let fault = self
            .sss
            .get_json::<Prediction>(&Keys::prediction("fault", station_id))
            .await?;
        let fault_probability = fault_probability_of(&fault);
        if fault_probability > FAULT_PROBABILITY_CEILING {
            return Ok(None);
        }

        let Some(features) =
            self.sss.get_json::<StationFeatures>(&Keys::features(station_id)).await?
        else {
            return Ok(None);
        };
        if features.charger_availability_ratio < MIN_AVAILABILITY_RATIO {
            return Ok(None);
        }
        if let Some(max_wait) = query.max_wait_time {
            if features.effective_wait_time > max_wait {
                return Ok(None);
            }
        }

        let Some(station) = self.stations.find_by_id(station_id).await? else {
            return Ok(None);
        };

        let distance = haversine_km(query.location, station.location);
        if let Some(max_distance) = query.max_distance {
            if distance > max_distance {
                return Ok(None);
            }
        }

        let decay_denominator = query.max_distance.unwrap_or(DEFAULT_MAX_DISTANCE_KM) / 3.0;
        let adjusted_score = round4(base_score * (-distance / decay_denominator).exp());

        let mut predictions = BTreeMap::new();
        if let Some(p) = &fault {
            if let Ok(value) = serde_json::to_value(p) {
                predictions.insert("fault".to_string(), value);
            }
        }
        if let Some(load) =
            self.sss.get_json::<Prediction>(&Keys::prediction("load", station_id)).await?
        {
            if let Ok(value) = serde_json::to_value(&load) {
                predictions.insert("load".to_string(), value);
            }
        }

        let available_chargers = estimate_available_chargers(&features, &station);

        Ok(Some(RankedStation {
            station_id: station.station_id.clone(),
            station_name: station.name.clone(),
            rank: 0,
            score: adjusted_score,
            estimated_wait_time: features.effective_wait_time,
            estimated_distance: round4(distance),
            available_chargers,
            charger_types: station.charger_types.clone(),
            features: Some(features),
            predictions,
        }))
    }
}

fn fault_probability_of(prediction: &Option<Prediction>) -> f64 {
    match prediction {
        Some(Prediction::Fault(FaultPrediction { fault_probability, .. })) => *fault_probability,
        _ => 0.0,
    }
}

fn estimate_available_chargers(features: &StationFeatures, station: &Station) -> u32 {
    (features.charger_availability_ratio * station.total_chargers as f64).round() as u32
}

fn preference_multiplier(ranked: &RankedStation, query: &OptimizerQuery) -> f64 {
    let mut multiplier = 1.0;
    if let Some(preferred) = query.preferred_charger_type {
        if preferred != ChargerType::Any && ranked.charger_types.contains(&preferred) {
            multiplier *= PREFERENCE_BOOST;
        }
    }
    if query.prefer_nearby && ranked.estimated_distance < NEARBY_THRESHOLD_KM {
        multiplier *= PREFERENCE_BOOST;
    }
    if query.prefer_reliable {
        let fault_probability = ranked
            .predictions
            .get("fault")
            .and_then(|v| serde_json::from_value::<Prediction>(v.clone()).ok())
            .map(|p| fault_probability_of(&Some(p)))
            .unwrap_or(0.0);
        if fault_probability < RELIABLE_FAULT_THRESHOLD {
            multiplier *= PREFERENCE_BOOST;
        }
    }
    multiplier
}

/// Resort by adjusted score descending (tie-break: lower distance, then
/// lexicographic stationId), apply preference re-weighting, resort again,
/// and assign 1-based contiguous ranks.
fn finalize(results: &mut Vec<RankedStation>, query: &OptimizerQuery) {
    sort_by_score(results);

    let has_preference =
        query.preferred_charger_type.is_some() || query.prefer_nearby || query.prefer_reliable;
    if has_preference {
        for ranked in results.iter_mut() {
            ranked.score = round4(ranked.score * preference_multiplier(ranked, query));
        }
        sort_by_score(results);
    }

    for (i, ranked) in results.iter_mut().enumerate() {
        ranked.rank = (i + 1) as u32;
    }
}

fn sort_by_score(results: &mut [RankedStation]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.estimated_distance.partial_cmp(&b.estimated_distance).unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.station_id.cmp(&b.station_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evrec_sss::memory::MemorySss;
    use evrec_types::geo::LatLng;
    use evrec_types::model::{NormalizedFeatures, RiskLevel};
    use evrec_types::prediction::PredictionMeta;
    use std::collections::HashMap;

    struct FakeStations {
        stations: HashMap<String, Station>,
    }

    #[async_trait]
    impl StationRepository for FakeStations {
        async fn find_by_id(&self, station_id: &str) -> evrec_dr::Result<Option<Station>> {
            Ok(self.stations.get(station_id).cloned())
        }
        async fn find_all(&self) -> evrec_dr::Result<Vec<Station>> {
            Ok(self.stations.values().cloned().collect())
        }
    }

    fn station(id: &str, lat: f64, lon: f64) -> Station {
        Station {
            station_id: id.to_string(),
            name: id.to_string(),
            address: "addr".to_string(),
            location: LatLng::new(lat, lon),
            total_chargers: 10,
            charger_types: vec![ChargerType::Fast],
            max_capacity: 500.0,
            region: "r".to_string(),
            grid_id: "g".to_string(),
        }
    }

    fn features(id: &str, availability: f64, wait: f64) -> StationFeatures {
        StationFeatures {
            station_id: id.to_string(),
            effective_wait_time: wait,
            station_reliability_score: 0.9,
            energy_stability_index: 0.9,
            charger_availability_ratio: availability,
            distance_penalty: 5.0,
            normalized_features: NormalizedFeatures {
                wait_time: 0.9,
                availability,
                reliability: 0.9,
                distance: 0.9,
                energy_stability: 0.9,
            },
            timestamp: 1_700_000_000,
        }
    }

    async fn setup(stations: Vec<Station>) -> (Arc<MemorySss>, Arc<FakeStations>) {
        let sss = Arc::new(MemorySss::new());
        let by_id = stations.into_iter().map(|s| (s.station_id.clone(), s)).collect();
        (sss, Arc::new(FakeStations { stations: by_id }))
    }

    fn query(location: LatLng, limit: u32) -> OptimizerQuery {
        OptimizerQuery {
            location,
            max_distance: None,
            max_wait_time: None,
            preferred_charger_type: None,
            prefer_nearby: false,
            prefer_reliable: false,
            limit,
        }
    }

    #[tokio::test]
    async fn cold_start_returns_distance_sorted_stubs_at_half_score() {
        let origin = LatLng::new(37.7749, -122.4194);
        let near = station("ST_101", 37.7749, -122.4194);
        let far = station("ST_102", 38.5, -121.5);
        let (sss, stations) = setup(vec![far.clone(), near.clone()]).await;
        let optimizer = Optimizer::new(sss, stations);

        let results = optimizer.recommend(&query(origin, 3)).await.unwrap();
        assert_eq!(results[0].station_id, "ST_101");
        assert_eq!(results[0].score, 0.5);
        assert!(results[0].estimated_distance < results[1].estimated_distance);
    }

    #[tokio::test]
    async fn filters_out_high_fault_probability_stations() {
        let origin = LatLng::new(37.7749, -122.4194);
        let s = station("ST_103", 37.7749, -122.4194);
        let (sss, stations) = setup(vec![s]).await;
        sss.zadd(Keys::RANKING, "ST_103", 0.9).await.unwrap();
        sss.set_json(&Keys::features("ST_103"), &features("ST_103", 0.6, 5.0), None).await.unwrap();
        sss.set_json(
            &Keys::prediction("fault", "ST_103"),
            &Prediction::Fault(FaultPrediction {
                fault_probability: 0.5,
                risk_level: RiskLevel::High,
                meta: PredictionMeta { confidence: 0.9, timestamp: 0 },
            }),
            None,
        )
        .await
        .unwrap();

        let optimizer = Optimizer::new(sss, stations);
        let results = optimizer.recommend(&query(origin, 3)).await.unwrap();
        assert!(results.iter().all(|r| r.station_id != "ST_103"));
    }

    #[tokio::test]
    async fn excludes_stations_beyond_max_distance() {
        let origin = LatLng::new(37.77, -122.41);
        let near = station("ST_104", 37.77, -122.41);
        let far = station("ST_105", 38.2, -121.0);
        let (sss, stations) = setup(vec![near.clone(), far.clone()]).await;
        for s in [&near, &far] {
            sss.zadd(Keys::RANKING, &s.station_id, 0.8).await.unwrap();
            sss.set_json(&Keys::features(&s.station_id), &features(&s.station_id, 0.5, 3.0), None)
                .await
                .unwrap();
        }

        let optimizer = Optimizer::new(sss, stations);
        let mut q = query(origin, 5);
        q.max_distance = Some(2.0);
        let results = optimizer.recommend(&q).await.unwrap();
        assert!(results.iter().all(|r| r.station_id != "ST_105"));
        assert!(results.iter().any(|r| r.station_id == "ST_104"));
    }

    #[tokio::test]
    async fn results_are_bounded_distinct_and_contiguously_ranked() {
        let origin = LatLng::new(37.77, -122.41);
        let mut stations = Vec::new();
        for i in 0..5 {
            stations.push(station(&format!("ST_{i}"), 37.77 + i as f64 * 0.01, -122.41));
        }
        let (sss, repo) = setup(stations.clone()).await;
        for s in &stations {
            sss.zadd(Keys::RANKING, &s.station_id, 0.7).await.unwrap();
            sss.set_json(&Keys::features(&s.station_id), &features(&s.station_id, 0.5, 3.0), None)
                .await
                .unwrap();
        }

        let optimizer = Optimizer::new(sss, repo);
        let results = optimizer.recommend(&query(origin, 3)).await.unwrap();
        assert_eq!(results.len(), 3);
        let ids: std::collections::HashSet<_> = results.iter().map(|r| &r.station_id).collect();
        assert_eq!(ids.len(), 3);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.rank, (i + 1) as u32);
        }
    }

    #[tokio::test]
    async fn preference_boost_favors_fast_charger_match() {
        let origin = LatLng::new(37.77, -122.41);
        let mut fast = station("ST_FAST", 37.77, -122.41);
        fast.charger_types = vec![ChargerType::Fast];
        let mut standard = station("ST_STD", 37.7701, -122.41);
        standard.charger_types = vec![ChargerType::Standard];
        let (sss, repo) = setup(vec![fast.clone(), standard.clone()]).await;
        for s in [&fast, &standard] {
            sss.zadd(Keys::RANKING, &s.station_id, 0.8).await.unwrap();
            sss.set_json(&Keys::features(&s.station_id), &features(&s.station_id, 0.5, 3.0), None)
                .await
                .unwrap();
        }

        let optimizer = Optimizer::new(sss, repo);
        let mut q = query(origin, 2);
        q.preferred_charger_type = Some(ChargerType::Fast);
        let results = optimizer.recommend(&q).await.unwrap();
        assert_eq!(results[0].station_id, "ST_FAST");
    }
}
