use evrec_types::model::NormalizedFeatures;
use evrec_types::rounding::round4;

const AGE_CAP_SECS: f64 = 300.0;
const AGE_DECAY_WEIGHT: f64 = 0.3;
const INCOMPLETE_FACTOR: f64 = 0.8;

/// `(1 - min(age/300, 1) * 0.3) * completenessFactor`. Completeness is 1
/// unless a normalized field failed to compute to a finite value (the
/// typed pipeline always produces all five fields, but a non-finite value
/// would indicate a degenerate upstream input).
pub fn confidence(features_timestamp: i64, now: i64, normalized: &NormalizedFeatures) -> f64 {
    let age = (now - features_timestamp).max(0) as f64;
    let decay = 1.0 - (age / AGE_CAP_SECS).min(1.0) * AGE_DECAY_WEIGHT;
    let completeness = if all_finite(normalized) { 1.0 } else { INCOMPLETE_FACTOR };
    round4(decay * completeness)
}

fn all_finite(n: &NormalizedFeatures) -> bool {
    n.wait_time.is_finite()
        && n.availability.is_finite()
        && n.reliability.is_finite()
        && n.distance.is_finite()
        && n.energy_stability.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> NormalizedFeatures {
        NormalizedFeatures { wait_time: 0.5, availability: 0.5, reliability: 0.5, distance: 0.5, energy_stability: 0.5 }
    }

    #[test]
    fn fresh_features_yield_full_decay_factor() {
        let c = confidence(1000, 1000, &features());
        assert_eq!(c, 1.0);
    }

    #[test]
    fn stale_features_decay_by_up_to_thirty_percent() {
        let c = confidence(0, 300, &features());
        assert_eq!(c, 0.7);
    }

    #[test]
    fn age_beyond_cap_does_not_decay_further() {
        let c = confidence(0, 10_000, &features());
        assert_eq!(c, 0.7);
    }

    #[test]
    fn incomplete_features_apply_completeness_penalty() {
        let mut n = features();
        n.distance = f64::NAN;
        let c = confidence(1000, 1000, &n);
        assert_eq!(c, 0.8);
    }
}
