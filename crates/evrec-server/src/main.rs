//! `evrec-server`: wires every component crate into one process —
//! Ingestion Handler and Recommendation Handler behind axum, Feature
//! Engineer and Scorer as background MB consumer-loop workers, all sharing
//! the DR pool, SSS client, and MB producer constructed once here.

mod handlers;
mod routes;
mod state;
mod workers;

use std::sync::Arc;
use std::time::Duration;

use evrec_dr::{
    PgRecommendationLogRepository, PgRequestLogRepository, PgStationHistoryRepository,
    PgStationRepository, PgSystemEventsRepository,
};
use evrec_gateway::{NarrationGateway, PredictionGateway};
use evrec_ingest::IngestionHandler;
use evrec_mb::MbProducer;
use evrec_observability::Metrics;
use evrec_optimizer::Optimizer;
use evrec_recommend::RecommendationHandler;
use evrec_sss::RedisSss;
use evrec_types::config::AppConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Upper bound on how long graceful shutdown waits for in-flight workers
/// before the process force-exits anyway.
const SHUTDOWN_FORCE_EXIT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();

    let dr_pool = evrec_dr::build_pool(&config.dr).expect("failed to build DR connection pool");
    let events_repo: Arc<dyn evrec_dr::SystemEventsRepository> =
        Arc::new(PgSystemEventsRepository::new(dr_pool.clone()));
    evrec_observability::init_tracing(
        &config.server.log_level,
        &config.server.log_format,
        Some(events_repo),
    );

    info!("starting evrec-server");

    let sss: Arc<dyn evrec_sss::SharedStateStore> = Arc::new(
        RedisSss::connect(&config.sss.connection_url(), config.sss.key_prefix.clone())
            .await
            .expect("failed to connect to SSS"),
    );

    let mb_producer = Arc::new(
        MbProducer::new(&config.mb.brokers, &config.mb.client_id)
            .expect("failed to construct MB producer"),
    );

    let stations: Arc<dyn evrec_dr::StationRepository> =
        Arc::new(PgStationRepository::new(dr_pool.clone()));
    let requests: Arc<dyn evrec_dr::RequestLogRepository> =
        Arc::new(PgRequestLogRepository::new(dr_pool.clone()));
    let recommendations: Arc<dyn evrec_dr::RecommendationLogRepository> =
        Arc::new(PgRecommendationLogRepository::new(dr_pool.clone()));
    let station_history: Arc<dyn evrec_dr::StationHistoryRepository> =
        Arc::new(PgStationHistoryRepository::new(dr_pool.clone()));

    let gateway = Arc::new(PredictionGateway::new(config.gateway.clone(), sss.clone()));
    let narration = Arc::new(NarrationGateway::new(config.gateway.clone()));
    let optimizer = Arc::new(Optimizer::new(sss.clone(), stations.clone()));

    let ingest = Arc::new(IngestionHandler::new(sss.clone(), mb_producer.clone()));
    let recommend = Arc::new(RecommendationHandler::new(
        sss.clone(),
        requests,
        recommendations,
        gateway.clone(),
        narration,
        optimizer,
    ));
    let metrics = Arc::new(Metrics::new().expect("failed to register metrics"));

    let shutdown = CancellationToken::new();

    let mut worker_handles = workers::spawn_feature_workers(
        &config.mb,
        sss.clone(),
        mb_producer.clone(),
        station_history,
        config.feature_ranges.clone(),
        shutdown.clone(),
    )
    .expect("failed to start feature engineer workers");
    worker_handles.extend(
        workers::spawn_scorer_workers(
            &config.mb,
            sss.clone(),
            mb_producer.clone(),
            gateway.clone(),
            config.weights.clone(),
            shutdown.clone(),
        )
        .expect("failed to start scorer workers"),
    );

    let app_state = state::AppState { ingest, recommend, sss, metrics };
    let router = routes::build_router(app_state);

    let addr = format!("0.0.0.0:{}", config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(evrec_observability::shutdown_signal())
        .await
        .expect("server error");

    info!("shutdown signal received, draining workers");
    shutdown.cancel();

    let drain = async {
        for handle in worker_handles {
            let _ = handle.await;
        }
    };
    if tokio::time::timeout(SHUTDOWN_FORCE_EXIT, drain).await.is_err() {
        error!("workers did not drain within the shutdown deadline, exiting anyway");
    }
}
