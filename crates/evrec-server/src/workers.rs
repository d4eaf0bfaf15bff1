//! Spawns the N Feature Engineer and N Scorer consumer-loop workers:
//! each stage process runs N worker tasks pulling bus messages in
//! parallel.

use std::sync::Arc;

use evrec_dr::StationHistoryRepository;
use evrec_feature::FeatureEngineerWorker;
use evrec_gateway::PredictionGateway;
use evrec_mb::MbConsumer;
use evrec_scorer::ScorerWorker;
use evrec_sss::SharedStateStore;
use evrec_types::config::{FeatureRanges, MbConfig, ScoringWeights};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

const FEATURE_CACHE_TTL_SECS: u64 = 60;
const SCORE_CACHE_TTL_SECS: u64 = 30;

pub fn spawn_feature_workers(
    mb: &MbConfig,
    sss: Arc<dyn SharedStateStore>,
    producer: Arc<evrec_mb::MbProducer>,
    history: Arc<dyn StationHistoryRepository>,
    ranges: FeatureRanges,
    shutdown: CancellationToken,
) -> Result<Vec<JoinHandle<()>>, evrec_mb::MbError> {
    let mut handles = Vec::with_capacity(mb.feature_workers as usize);
    for worker_index in 0..mb.feature_workers {
        let consumer = MbConsumer::new(
            &mb.brokers,
            &format!("{}-fe", mb.group_id),
            &format!("{}-fe-{worker_index}", mb.client_id),
        )?;
        let worker = FeatureEngineerWorker::new(
            sss.clone(),
            producer.clone(),
            history.clone(),
            ranges.clone(),
            FEATURE_CACHE_TTL_SECS,
        );
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(err) = worker.run(&consumer, shutdown).await {
                error!(error = %err, worker_index, "feature engineer worker exited");
            }
        }));
    }
    Ok(handles)
}

pub fn spawn_scorer_workers(
    mb: &MbConfig,
    sss: Arc<dyn SharedStateStore>,
    producer: Arc<evrec_mb::MbProducer>,
    gateway: Arc<PredictionGateway>,
    weights: ScoringWeights,
    shutdown: CancellationToken,
) -> Result<Vec<JoinHandle<()>>, evrec_mb::MbError> {
    let mut handles = Vec::with_capacity(mb.scorer_workers as usize);
    for worker_index in 0..mb.scorer_workers {
        let consumer = MbConsumer::new(
            &mb.brokers,
            &format!("{}-sc", mb.group_id),
            &format!("{}-sc-{worker_index}", mb.client_id),
        )?;
        let worker = ScorerWorker::new(
            sss.clone(),
            producer.clone(),
            gateway.clone(),
            weights.clone(),
            SCORE_CACHE_TTL_SECS,
        );
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(err) = worker.run(&consumer, shutdown).await {
                error!(error = %err, worker_index, "scorer worker exited");
            }
        }));
    }
    Ok(handles)
}
