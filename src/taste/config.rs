use std::str::FromStr;

use thiserror::Error;

use crate::taste::variant::VariantDistribution;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown variant: {0}")]
    UnknownVariant(String),
    #[error("malformed distribution entry: {0}")]
    Malformed(String),
    #[error("invalid weight {weight} for variant {variant}")]
    InvalidWeight { variant: String, weight: f64 },
    #[error("variant weights sum to {0}, expected 1")]
    WeightSum(f64),
    #[error("variant distribution is empty")]
    EmptyDistribution,
}

/// Engine tuning, passed explicitly into [`crate::taste::TasteEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub target_interactions: u32,
    pub selection_trials: usize,
    pub revisit_after: u32,
    pub revisit_probability: f64,
    pub distribution: VariantDistribution,
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_interactions: 20,
            selection_trials: 10,
            revisit_after: 15,
            revisit_probability: 0.3,
            distribution: VariantDistribution::default(),
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let distribution = match std::env::var("TASTE_VARIANT_DISTRIBUTION") {
            Ok(raw) => VariantDistribution::parse(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "invalid TASTE_VARIANT_DISTRIBUTION, using default");
                defaults.distribution.clone()
            }),
            Err(_) => defaults.distribution.clone(),
        };

        let revisit_probability = env_or("TASTE_REVISIT_PROBABILITY", defaults.revisit_probability);
        let revisit_probability = if (0.0..=1.0).contains(&revisit_probability) {
            revisit_probability
        } else {
            tracing::warn!(revisit_probability, "revisit probability out of range, using default");
            defaults.revisit_probability
        };

        let target_interactions = env_or("TASTE_TARGET_INTERACTIONS", defaults.target_interactions).max(1);

        Self {
            target_interactions,
            selection_trials: env_or("TASTE_SELECTION_TRIALS", defaults.selection_trials),
            revisit_after: env_or("TASTE_REVISIT_AFTER", defaults.revisit_after),
            revisit_probability,
            distribution,
            rng_seed: std::env::var("TASTE_RNG_SEED")
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.target_interactions, 20);
        assert_eq!(config.selection_trials, 10);
        assert_eq!(config.revisit_after, 15);
        assert_eq!(config.revisit_probability, 0.3);
        assert!(config.rng_seed.is_none());
        assert_eq!(config.distribution.weights().len(), 3);
    }

    #[test]
    fn with_seed_sets_seed() {
        assert_eq!(EngineConfig::default().with_seed(5).rng_seed, Some(5));
    }
}
