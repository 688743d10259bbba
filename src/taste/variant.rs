//! Algorithm variants for the A/B experiment.
//!
//! A variant is data: a weighting mode, an ordered list of modifier hooks and
//! a selector configuration over the same primitives.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::taste::config::{ConfigError, EngineConfig};
use crate::taste::processor::{ChoiceProcessor, EventModifier, Weighting};
use crate::taste::selector::{PairSelector, SelectorConfig};

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Basic,
    Advanced,
    Experimental,
}

impl Variant {
    pub fn all() -> &'static [Variant] {
        &[Variant::Basic, Variant::Advanced, Variant::Experimental]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Experimental => "experimental",
        }
    }

    pub fn profile(&self, config: &EngineConfig) -> VariantProfile {
        let tuned = SelectorConfig {
            trials: config.selection_trials,
            revisit_after: config.revisit_after,
            revisit_probability: config.revisit_probability,
            ..SelectorConfig::default()
        };
        match self {
            Self::Basic => VariantProfile {
                variant: *self,
                weighting: Weighting::Uniform,
                modifiers: Vec::new(),
                selector: SelectorConfig {
                    information_gain: false,
                    confidence_override: false,
                    revisit_uncertain: false,
                    ..tuned
                },
            },
            Self::Advanced => VariantProfile {
                variant: *self,
                weighting: Weighting::Adaptive,
                modifiers: Vec::new(),
                selector: tuned,
            },
            Self::Experimental => VariantProfile {
                variant: *self,
                weighting: Weighting::Adaptive,
                modifiers: vec![EventModifier::EmotionalTone],
                selector: tuned,
            },
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            "experimental" => Ok(Self::Experimental),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantProfile {
    pub variant: Variant,
    pub weighting: Weighting,
    pub modifiers: Vec<EventModifier>,
    pub selector: SelectorConfig,
}

impl VariantProfile {
    pub fn processor(&self) -> ChoiceProcessor {
        ChoiceProcessor::new(self.weighting, self.modifiers.clone())
    }

    pub fn pair_selector(&self) -> PairSelector {
        PairSelector::new(self.selector.clone())
    }
}

/// Named weights summing to 1, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDistribution {
    weights: Vec<(Variant, f64)>,
}

impl Default for VariantDistribution {
    fn default() -> Self {
        Self {
            weights: vec![
                (Variant::Basic, 0.3),
                (Variant::Advanced, 0.6),
                (Variant::Experimental, 0.1),
            ],
        }
    }
}

impl VariantDistribution {
    pub fn new(weights: Vec<(Variant, f64)>) -> Result<Self, ConfigError> {
        if weights.is_empty() {
            return Err(ConfigError::EmptyDistribution);
        }
        for (variant, weight) in &weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    variant: variant.to_string(),
                    weight: *weight,
                });
            }
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(total));
        }
        Ok(Self { weights })
    }

    /// Parses `basic:0.3,advanced:0.6,experimental:0.1`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut weights = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, weight) = part
                .split_once(':')
                .ok_or_else(|| ConfigError::Malformed(part.to_string()))?;
            let variant: Variant = name.parse()?;
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|_| ConfigError::Malformed(part.to_string()))?;
            weights.push((variant, weight));
        }
        Self::new(weights)
    }

    pub fn weights(&self) -> &[(Variant, f64)] {
        &self.weights
    }

    /// Cumulative-weight lookup of one uniform draw in `[0, 1)`.
    pub fn resolve(&self, draw: f64) -> Variant {
        let mut cumulative = 0.0;
        for (variant, weight) in &self.weights {
            cumulative += weight;
            if draw < cumulative {
                return *variant;
            }
        }
        self.weights
            .last()
            .map(|(v, _)| *v)
            .unwrap_or(Variant::Advanced)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariantSelector {
    distribution: VariantDistribution,
}

impl VariantSelector {
    pub fn new(distribution: VariantDistribution) -> Self {
        Self { distribution }
    }

    pub fn distribution(&self) -> &VariantDistribution {
        &self.distribution
    }

    /// Draws once; the caller persists the result with the session.
    pub fn assign<R: Rng + ?Sized>(&self, rng: &mut R) -> Variant {
        let draw: f64 = rng.random();
        self.distribution.resolve(draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_distribution_boundaries() {
        let dist = VariantDistribution::default();
        assert_eq!(dist.resolve(0.0), Variant::Basic);
        assert_eq!(dist.resolve(0.2999), Variant::Basic);
        assert_eq!(dist.resolve(0.3), Variant::Advanced);
        assert_eq!(dist.resolve(0.8999), Variant::Advanced);
        assert_eq!(dist.resolve(0.9), Variant::Experimental);
        assert_eq!(dist.resolve(0.99999), Variant::Experimental);
    }

    #[test]
    fn parse_round_trips_names() {
        let dist = VariantDistribution::parse("advanced:0.5, experimental:0.5").expect("valid");
        assert_eq!(dist.resolve(0.1), Variant::Advanced);
        assert_eq!(dist.resolve(0.7), Variant::Experimental);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            VariantDistribution::parse("basic:0.5,advanced:0.2"),
            Err(ConfigError::WeightSum(_))
        ));
        assert!(matches!(
            VariantDistribution::parse("turbo:1.0"),
            Err(ConfigError::UnknownVariant(_))
        ));
        assert!(matches!(
            VariantDistribution::parse("basic=1.0"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            VariantDistribution::parse("basic:-0.5,advanced:1.5"),
            Err(ConfigError::InvalidWeight { .. })
        ));
        assert!(matches!(
            VariantDistribution::parse(""),
            Err(ConfigError::EmptyDistribution)
        ));
    }

    #[test]
    fn assignment_is_seed_deterministic() {
        let selector = VariantSelector::default();
        let a: Vec<Variant> = {
            let mut rng = StdRng::seed_from_u64(11);
            (0..20).map(|_| selector.assign(&mut rng)).collect()
        };
        let b: Vec<Variant> = {
            let mut rng = StdRng::seed_from_u64(11);
            (0..20).map(|_| selector.assign(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn assignment_roughly_follows_weights() {
        let selector = VariantSelector::default();
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 10_000;
        let advanced = (0..n)
            .filter(|_| selector.assign(&mut rng) == Variant::Advanced)
            .count();
        let share = advanced as f64 / n as f64;
        assert!((share - 0.6).abs() < 0.03, "advanced share {share}");
    }

    #[test]
    fn profiles_are_distinct_configurations() {
        let config = EngineConfig::default();
        let basic = Variant::Basic.profile(&config);
        let advanced = Variant::Advanced.profile(&config);
        let experimental = Variant::Experimental.profile(&config);

        assert_eq!(basic.weighting, Weighting::Uniform);
        assert!(!basic.selector.information_gain);
        assert!(!basic.selector.revisit_uncertain);
        assert_eq!(advanced.weighting, Weighting::Adaptive);
        assert!(advanced.modifiers.is_empty());
        assert_eq!(experimental.modifiers, vec![EventModifier::EmotionalTone]);
        assert_eq!(experimental.selector, advanced.selector);
        assert_eq!(advanced.selector.trials, config.selection_trials);
    }
}
