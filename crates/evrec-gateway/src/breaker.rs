//! Per-model circuit breaker: a sliding-window failure tally with an
//! open/cooldown state machine, keyed concurrently by model id.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use evrec_types::config::CircuitBreakerConfig;
use evrec_types::prediction::ModelId;
use parking_lot::Mutex;

struct BreakerState {
    /// Timestamps of recent failures, pruned to the sliding window on read.
    failures: VecDeque<Instant>,
    opened_until: Option<Instant>,
}

impl BreakerState {
    fn new() -> Self {
        Self { failures: VecDeque::new(), opened_until: None }
    }
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    states: DashMap<ModelId, Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, states: DashMap::new() }
    }

    fn entry(&self, model: ModelId) -> dashmap::mapref::one::Ref<'_, ModelId, Mutex<BreakerState>> {
        self.states.entry(model).or_insert_with(|| Mutex::new(BreakerState::new())).downgrade()
    }

    /// `true` if the breaker is currently open (calls should short-circuit
    /// to the deterministic fallback without invoking the service).
    pub fn is_open(&self, model: ModelId) -> bool {
        let entry = self.entry(model);
        let mut state = entry.lock();
        match state.opened_until {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                // Cooldown elapsed: close the breaker and reset the tally.
                state.opened_until = None;
                state.failures.clear();
                false
            }
            None => false,
        }
    }

    pub fn record_success(&self, model: ModelId) {
        let entry = self.entry(model);
        let mut state = entry.lock();
        state.failures.clear();
    }

    /// Record a failure; opens the breaker if the sliding-window threshold
    /// is exceeded (default: 5 within 30s).
    pub fn record_failure(&self, model: ModelId) {
        let entry = self.entry(model);
        let mut state = entry.lock();
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);
        state.failures.push_back(now);
        while let Some(&front) = state.failures.front() {
            if now.duration_since(front) > window {
                state.failures.pop_front();
            } else {
                break;
            }
        }
        if state.failures.len() as u32 >= self.config.failure_threshold {
            state.opened_until = Some(now + Duration::from_secs(self.config.cooldown_secs));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig { failure_threshold: 3, window_secs: 30, cooldown_secs: 1 }
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(config());
        assert!(!breaker.is_open(ModelId::Load));
        breaker.record_failure(ModelId::Load);
        breaker.record_failure(ModelId::Load);
        assert!(!breaker.is_open(ModelId::Load));
        breaker.record_failure(ModelId::Load);
        assert!(breaker.is_open(ModelId::Load));
    }

    #[test]
    fn success_resets_tally() {
        let breaker = CircuitBreaker::new(config());
        breaker.record_failure(ModelId::Fault);
        breaker.record_failure(ModelId::Fault);
        breaker.record_success(ModelId::Fault);
        breaker.record_failure(ModelId::Fault);
        assert!(!breaker.is_open(ModelId::Fault));
    }

    #[test]
    fn breakers_are_independent_per_model() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            breaker.record_failure(ModelId::Load);
        }
        assert!(breaker.is_open(ModelId::Load));
        assert!(!breaker.is_open(ModelId::Fault));
    }

    #[tokio::test]
    async fn closes_after_cooldown() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            breaker.record_failure(ModelId::Load);
        }
        assert!(breaker.is_open(ModelId::Load));
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!breaker.is_open(ModelId::Load));
    }
}
