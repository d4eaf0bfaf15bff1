use evrec_types::config::ScoringWeights;
use evrec_types::model::ComponentScores;
use evrec_types::rounding::round4;

/// `Σ wᵢ · componentᵢ / Σ wᵢ`, with weights pre-normalized so Σw == 1.
/// A zero-sum weight configuration yields `0.0` rather than dividing by
/// zero.
pub fn weighted_score(components: &ComponentScores, weights: &ScoringWeights) -> f64 {
    let Some(normalized) = weights.normalized() else {
        return 0.0;
    };
    let score = normalized.wait_time * components.wait
        + normalized.availability * components.availability
        + normalized.reliability * components.reliability
        + normalized.distance * components.distance
        + normalized.energy_stability * components.energy_stability;
    round4(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components() -> ComponentScores {
        ComponentScores { wait: 0.4, availability: 0.6, reliability: 0.8, distance: 0.5, energy_stability: 0.9 }
    }

    #[test]
    fn zero_weights_yield_zero_score() {
        let weights = ScoringWeights {
            wait_time: 0.0,
            availability: 0.0,
            reliability: 0.0,
            distance: 0.0,
            energy_stability: 0.0,
        };
        assert_eq!(weighted_score(&components(), &weights), 0.0);
    }

    #[test]
    fn single_weight_equals_that_component() {
        let weights = ScoringWeights {
            wait_time: 1.0,
            availability: 0.0,
            reliability: 0.0,
            distance: 0.0,
            energy_stability: 0.0,
        };
        assert_eq!(weighted_score(&components(), &weights), components().wait);
    }

    #[test]
    fn default_weights_blend_all_components() {
        let weights = ScoringWeights {
            wait_time: 0.25,
            availability: 0.20,
            reliability: 0.20,
            distance: 0.20,
            energy_stability: 0.15,
        };
        let score = weighted_score(&components(), &weights);
        assert!(score > 0.0 && score < 1.0);
    }
}

/// Score determinism and weight-sum sanity as properties over arbitrary
/// valid inputs, rather than the single-literal-value unit tests above.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn component_strategy() -> impl Strategy<Value = ComponentScores> {
        (0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0).prop_map(
            |(wait, availability, reliability, distance, energy_stability)| ComponentScores {
                wait,
                availability,
                reliability,
                distance,
                energy_stability,
            },
        )
    }

    proptest! {
        /// Score determinism: identical components and weights always
        /// produce the identical `overallScore`, and it never leaves [0, 1].
        #[test]
        fn weighted_score_is_deterministic_and_bounded(
            components in component_strategy(),
            wait_time in 0.0f64..=1.0,
            availability in 0.0f64..=1.0,
            reliability in 0.0f64..=1.0,
            distance in 0.0f64..=1.0,
            energy_stability in 0.0f64..=1.0,
        ) {
            let weights = ScoringWeights { wait_time, availability, reliability, distance, energy_stability };
            let first = weighted_score(&components, &weights);
            let second = weighted_score(&components, &weights);
            prop_assert_eq!(first, second);
            prop_assert!((0.0..=1.0).contains(&first));
        }

        /// Weight-sum sanity: setting one weight to 1.0 and the rest to 0
        /// makes `overallScore` equal that single component score.
        #[test]
        fn single_weight_equals_that_component(
            components in component_strategy(),
            which in 0..5usize,
        ) {
            let mut weights = ScoringWeights {
                wait_time: 0.0,
                availability: 0.0,
                reliability: 0.0,
                distance: 0.0,
                energy_stability: 0.0,
            };
            let expected = match which {
                0 => { weights.wait_time = 1.0; components.wait }
                1 => { weights.availability = 1.0; components.availability }
                2 => { weights.reliability = 1.0; components.reliability }
                3 => { weights.distance = 1.0; components.distance }
                _ => { weights.energy_stability = 1.0; components.energy_stability }
            };
            let score = weighted_score(&components, &weights);
            prop_assert!((score - round4(expected)).abs() < 1e-9);
        }
    }
}
