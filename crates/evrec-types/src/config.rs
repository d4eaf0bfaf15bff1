//! Configuration environment variables. Each concern owns a `*Config`
//! struct with an `env_*_or_default`-style constructor rather than a
//! single monolithic config blob.

use std::env;
use std::str::FromStr;

fn env_or_default<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_string_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone)]
pub struct SssConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
    pub key_prefix: String,
    pub score_cache_ttl_secs: u64,
    pub prediction_cache_ttl_secs: u64,
    pub session_cache_ttl_secs: u64,
}

impl SssConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string_or_default("SSS_HOST", "127.0.0.1"),
            port: env_or_default("SSS_PORT", 6379),
            password: env::var("SSS_PASSWORD").ok(),
            db: env_or_default("SSS_DB", 0),
            key_prefix: env_string_or_default("SSS_KEY_PREFIX", "evrec"),
            score_cache_ttl_secs: env_or_default("SCORE_CACHE_TTL", 30),
            prediction_cache_ttl_secs: env_or_default("PREDICTION_CACHE_TTL", 60),
            session_cache_ttl_secs: env_or_default("SESSION_CACHE_TTL", 3600),
        }
    }

    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(pw) => format!("redis://:{pw}@{}:{}/{}", self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MbConfig {
    pub brokers: String,
    pub client_id: String,
    pub group_id: String,
    pub feature_workers: u32,
    pub scorer_workers: u32,
}

impl MbConfig {
    pub fn from_env() -> Self {
        Self {
            brokers: env_string_or_default("MB_BROKERS", "127.0.0.1:9092"),
            client_id: env_string_or_default("MB_CLIENT_ID", "evrec"),
            group_id: env_string_or_default("MB_GROUP_ID", "evrec-pipeline"),
            feature_workers: env_or_default("FE_WORKERS", 4),
            scorer_workers: env_or_default("SC_WORKERS", 4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub pool_size: usize,
}

impl DrConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string_or_default("DR_HOST", "127.0.0.1"),
            port: env_or_default("DR_PORT", 5432),
            user: env_string_or_default("DR_USER", "evrec"),
            password: env_string_or_default("DR_PASSWORD", "evrec"),
            database: env_string_or_default("DR_DATABASE", "evrec"),
            pool_size: env_or_default("DR_POOL_SIZE", 10),
        }
    }
}

/// Min/max ranges FE normalizes raw features against. Values outside a
/// range are clamped before normalization; a degenerate range (min == max)
/// normalizes to 0.5.
#[derive(Debug, Clone)]
pub struct FeatureRanges {
    pub wait_time_min: f64,
    pub wait_time_max: f64,
    pub reliability_min: f64,
    pub reliability_max: f64,
    pub energy_stability_min: f64,
    pub energy_stability_max: f64,
    pub availability_min: f64,
    pub availability_max: f64,
    pub distance_penalty_min: f64,
    pub distance_penalty_max: f64,
}

impl FeatureRanges {
    pub fn from_env() -> Self {
        Self {
            wait_time_min: env_or_default("FE_WAIT_TIME_MIN", 0.0),
            wait_time_max: env_or_default("FE_WAIT_TIME_MAX", 60.0),
            reliability_min: env_or_default("FE_RELIABILITY_MIN", 0.0),
            reliability_max: env_or_default("FE_RELIABILITY_MAX", 1.0),
            energy_stability_min: env_or_default("FE_ENERGY_STABILITY_MIN", 0.0),
            energy_stability_max: env_or_default("FE_ENERGY_STABILITY_MAX", 1.0),
            availability_min: env_or_default("FE_AVAILABILITY_MIN", 0.0),
            availability_max: env_or_default("FE_AVAILABILITY_MAX", 1.0),
            distance_penalty_min: env_or_default("FE_DISTANCE_PENALTY_MIN", 0.0),
            distance_penalty_max: env_or_default("FE_DISTANCE_PENALTY_MAX", 30.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub wait_time: f64,
    pub availability: f64,
    pub reliability: f64,
    pub distance: f64,
    pub energy_stability: f64,
}

impl ScoringWeights {
    pub fn from_env() -> Self {
        Self {
            wait_time: env_or_default("WEIGHT_WAIT_TIME", 0.25),
            availability: env_or_default("WEIGHT_AVAILABILITY", 0.20),
            reliability: env_or_default("WEIGHT_RELIABILITY", 0.20),
            distance: env_or_default("WEIGHT_DISTANCE", 0.20),
            energy_stability: env_or_default("WEIGHT_ENERGY_STABILITY", 0.15),
        }
    }

    fn sum(&self) -> f64 {
        self.wait_time + self.availability + self.reliability + self.distance + self.energy_stability
    }

    /// Normalized weights (Σw == 1), computed once at config-load time so
    /// the scorer's hot path is a plain dot product. Returns `None` when
    /// Σw == 0, in which case the scorer must emit `overallScore = 0`.
    pub fn normalized(&self) -> Option<ScoringWeights> {
        let sum = self.sum();
        if sum <= 0.0 {
            return None;
        }
        Some(ScoringWeights {
            wait_time: self.wait_time / sum,
            availability: self.availability / sum,
            reliability: self.reliability / sum,
            distance: self.distance / sum,
            energy_stability: self.energy_stability / sum,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub window_secs: u64,
    pub cooldown_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn from_env() -> Self {
        Self {
            failure_threshold: env_or_default("CIRCUIT_BREAKER_THRESHOLD", 5),
            window_secs: 30,
            cooldown_secs: env_or_default::<u64>("CIRCUIT_BREAKER_TIMEOUT", 30_000) / 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub model_service_url: String,
    pub llm_api_key: Option<String>,
    pub timeout_ms: u64,
    pub breaker: CircuitBreakerConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            model_service_url: env_string_or_default(
                "MODEL_SERVICE_URL",
                "http://127.0.0.1:8090",
            ),
            llm_api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_ms: env_or_default("PG_TIMEOUT_MS", 2000),
            breaker: CircuitBreakerConfig::from_env(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            api_port: env_or_default("API_PORT", 3000),
            log_level: env_string_or_default("LOG_LEVEL", "info"),
            log_format: env_string_or_default("LOG_FORMAT", "pretty"),
        }
    }
}

/// Aggregates every component config for `evrec-server`'s `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sss: SssConfig,
    pub mb: MbConfig,
    pub dr: DrConfig,
    pub weights: ScoringWeights,
    pub feature_ranges: FeatureRanges,
    pub gateway: GatewayConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            sss: SssConfig::from_env(),
            mb: MbConfig::from_env(),
            dr: DrConfig::from_env(),
            weights: ScoringWeights::from_env(),
            feature_ranges: FeatureRanges::from_env(),
            gateway: GatewayConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_close_to_one() {
        let w = ScoringWeights {
            wait_time: 0.25,
            availability: 0.20,
            reliability: 0.20,
            distance: 0.20,
            energy_stability: 0.15,
        };
        let n = w.normalized().unwrap();
        let sum = n.wait_time + n.availability + n.reliability + n.distance + n.energy_stability;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_sum_weights_yield_none() {
        let w = ScoringWeights {
            wait_time: 0.0,
            availability: 0.0,
            reliability: 0.0,
            distance: 0.0,
            energy_stability: 0.0,
        };
        assert!(w.normalized().is_none());
    }
}
