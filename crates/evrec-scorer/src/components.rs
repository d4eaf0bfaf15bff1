use evrec_types::model::{ComponentScores, NormalizedFeatures};
use evrec_types::rounding::round4;

/// Component scores are an identity mapping of normalized features,
/// rounded to 4 decimals.
pub fn component_scores(features: &NormalizedFeatures) -> ComponentScores {
    ComponentScores {
        wait: round4(features.wait_time),
        availability: round4(features.availability),
        reliability: round4(features.reliability),
        distance: round4(features.distance),
        energy_stability: round4(features.energy_stability),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_maps_normalized_features() {
        let n = NormalizedFeatures {
            wait_time: 0.5,
            availability: 0.6,
            reliability: 0.7,
            distance: 0.8,
            energy_stability: 0.9,
        };
        let c = component_scores(&n);
        assert_eq!(c.wait, 0.5);
        assert_eq!(c.availability, 0.6);
        assert_eq!(c.reliability, 0.7);
        assert_eq!(c.distance, 0.8);
        assert_eq!(c.energy_stability, 0.9);
    }
}
