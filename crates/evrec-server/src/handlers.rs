//! Axum handlers for the core HTTP surface, plus the ingestion endpoints
//! for the other two submission schemas (grid status, station health).

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use evrec_sss::{Keys, SharedStateStoreExt};
use evrec_types::error::ApiError;
use evrec_types::model::{
    ChargerType, GridStatus, Recommendation, RecommendationRequest, StationHealth, StationScore,
    StationTelemetry, UserContext,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendMeta {
    processing_time: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendEnvelope<T> {
    success: bool,
    data: T,
    meta: RecommendMeta,
}

fn envelope(recommendation: Recommendation, started: Instant) -> impl IntoResponse {
    Json(RecommendEnvelope {
        success: true,
        data: recommendation,
        meta: RecommendMeta { processing_time: started.elapsed().as_millis() as u64 },
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendQuery {
    pub user_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub charger_type: Option<ChargerType>,
    #[serde(default)]
    pub max_wait_time: Option<f64>,
    #[serde(default)]
    pub max_distance: Option<f64>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl From<RecommendQuery> for RecommendationRequest {
    fn from(q: RecommendQuery) -> Self {
        RecommendationRequest {
            user_id: q.user_id,
            location: evrec_types::geo::LatLng::new(q.lat, q.lon),
            vehicle_type: q.vehicle_type,
            battery_level: q.battery_level,
            preferred_charger_type: q.charger_type,
            max_wait_time: q.max_wait_time,
            max_distance: q.max_distance,
            limit: q.limit.unwrap_or(5),
            prefer_nearby: false,
            prefer_reliable: false,
        }
    }
}

pub async fn recommend_get(
    State(state): State<AppState>,
    Query(query): Query<RecommendQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let request: RecommendationRequest = query.into();
    let recommendation =
        state.recommend.recommend(&request).await.map_err(|e| e.into_api_error())?;
    Ok(envelope(recommendation, started))
}

pub async fn recommend_post(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let recommendation =
        state.recommend.recommend(&request).await.map_err(|e| e.into_api_error())?;
    Ok(envelope(recommendation, started))
}

pub async fn recommend_get_cached(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recommendation = state
        .recommend
        .get_cached(&request_id, now_secs())
        .await
        .map_err(|e| e.into_api_error())?;
    Ok(Json(recommendation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBody {
    station_id: String,
}

pub async fn recommend_select(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<SelectBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .recommend
        .select_station(&request_id, &body.station_id)
        .await
        .map_err(|e| e.into_api_error())?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct FeedbackBody {
    rating: u8,
}

pub async fn recommend_feedback(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<FeedbackBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .recommend
        .record_feedback(&request_id, body.rating)
        .await
        .map_err(|e| e.into_api_error())?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn ingest_station(
    State(state): State<AppState>,
    Json(telemetry): Json<StationTelemetry>,
) -> Result<impl IntoResponse, ApiError> {
    let station_id = telemetry.station_id.clone();
    state.ingest.ingest_telemetry(telemetry).await.map_err(|e| e.into_api_error())?;
    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "stationId": station_id }))))
}

pub async fn ingest_user_context(
    State(state): State<AppState>,
    Json(context): Json<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    state.ingest.ingest_user_context(context).await.map_err(|e| e.into_api_error())?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn ingest_grid_status(
    State(state): State<AppState>,
    Json(status): Json<GridStatus>,
) -> Result<impl IntoResponse, ApiError> {
    state.ingest.ingest_grid_status(status).await.map_err(|e| e.into_api_error())?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn ingest_health(
    State(state): State<AppState>,
    Json(health): Json<StationHealth>,
) -> Result<impl IntoResponse, ApiError> {
    state.ingest.ingest_health(health).await.map_err(|e| e.into_api_error())?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn station_score(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let score: Option<StationScore> = state
        .sss
        .get_json(&Keys::score(&station_id))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    match score {
        Some(score) => Ok(Json(score)),
        None => Err(ApiError::not_found(format!("no score cached for station {station_id}"))),
    }
}

pub async fn station_health(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let health: Option<StationHealth> = state
        .sss
        .get_json(&Keys::health(&station_id))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    match health {
        Some(health) => Ok(Json(health)),
        None => Err(ApiError::not_found(format!("no health reported for station {station_id}"))),
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.gather_text() {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed: metrics unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "metrics unavailable")
        }
    }
}
