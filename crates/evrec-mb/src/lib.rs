//! Message Bus adapter: partitioned append-only topics, consumer groups
//! with at-least-once delivery, per-key partitioning. Message values are
//! UTF-8 JSON rather than a binary codec.

mod error;
pub mod outcome;
mod topics;

pub use error::MbError;
pub use outcome::Outcome;
pub use topics::Topic;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub type Result<T> = std::result::Result<T, MbError>;

const PRODUCE_TIMEOUT_SECS: u64 = 10;
/// Startup retry policy: retry-with-backoff up to this many attempts
/// before declaring the process unhealthy.
pub const STARTUP_MAX_ATTEMPTS: u32 = 30;

/// Singleton-per-process producer, constructed once at startup and
/// shared via `Arc` by every stage that publishes.
pub struct MbProducer {
    inner: FutureProducer,
}

impl MbProducer {
    pub fn new(brokers: &str, client_id: &str) -> Result<Self> {
        let inner: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("enable.idempotence", "true")
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(MbError::from)?;
        Ok(Self { inner })
    }

    /// Publish `value` as JSON on `topic`, partitioned by `key` (stationId
    /// / userId / gridId), with a `timestamp` header in ms.
    pub async fn publish_json<T: Serialize>(
        &self,
        topic: Topic,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let payload = serde_json::to_vec(value).map_err(MbError::Serialization)?;
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            .to_string();
        let headers = OwnedHeaders::new().insert(rdkafka::message::Header {
            key: "timestamp",
            value: Some(timestamp_ms.as_bytes()),
        });
        let record = FutureRecord::to(topic.as_str())
            .key(key)
            .payload(&payload)
            .headers(headers);
        self.inner
            .send(record, Timeout::After(Duration::from_secs(PRODUCE_TIMEOUT_SECS)))
            .await
            .map_err(|(e, _)| MbError::from(e))?;
        Ok(())
    }
}

/// A consumer bound to one or more topics within a consumer group.
pub struct MbConsumer {
    inner: StreamConsumer,
}

impl MbConsumer {
    pub fn new(brokers: &str, group_id: &str, client_id: &str) -> Result<Self> {
        let inner: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("client.id", client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .create()
            .map_err(MbError::from)?;
        Ok(Self { inner })
    }

    pub fn subscribe(&self, topics: &[Topic]) -> Result<()> {
        let names: Vec<&str> = topics.iter().map(|t| t.as_str()).collect();
        self.inner.subscribe(&names).map_err(MbError::from)
    }

    /// Drives the consumer loop for one worker task: fetch, hand to
    /// `handler`, commit only on `Outcome::Ok`/`Outcome::Skipped` — a
    /// poison message is skipped after a parse failure rather than
    /// retried indefinitely — and stop fetching once `shutdown` fires,
    /// draining the in-flight message and committing its offset first.
    pub async fn run<F, Fut>(&self, shutdown: CancellationToken, mut handler: F) -> Result<()>
    where
        F: FnMut(String, Vec<u8>) -> Fut,
        Fut: std::future::Future<Output = Outcome>,
    {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("MB consumer received shutdown signal, draining");
                    return Ok(());
                }
                msg = self.inner.recv() => {
                    let msg = match msg {
                        Ok(m) => m,
                        Err(KafkaError::NoMessageReceived) => continue,
                        Err(e) => {
                            warn!(error = %e, "MB fetch error");
                            continue;
                        }
                    };
                    let key = msg
                        .key()
                        .map(|k| String::from_utf8_lossy(k).to_string())
                        .unwrap_or_default();
                    let payload = msg.payload().unwrap_or_default().to_vec();

                    let outcome = handler(key, payload).await;
                    match outcome {
                        Outcome::Ok | Outcome::Skipped => {
                            if let Err(e) = self.inner.commit_message(&msg, rdkafka::consumer::CommitMode::Async) {
                                warn!(error = %e, "failed to commit MB offset");
                            }
                        }
                        Outcome::Retryable => {
                            // Left uncommitted: bus redelivery covers a
                            // transient consumer crash.
                            warn!("message marked retryable, leaving uncommitted");
                        }
                    }
                }
            }
        }
    }
}

/// Deserialize a JSON payload, returning `Outcome::Skipped` instead of
/// propagating on malformed input.
pub fn decode_or_skip<T: DeserializeOwned>(payload: &[u8], context: &str) -> Option<T> {
    match serde_json::from_slice(payload) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, context, "skipping malformed message");
            None
        }
    }
}
