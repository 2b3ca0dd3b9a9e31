//! Generator configuration: retry budgets, tolerances and the random seed.
//!
//! Budgets are per generator. The ternary balancer only gets one retry and
//! returns a best-effort sequence when that runs out, while the other
//! generators escalate to `BalanceFailure`.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SequenceError, SequenceResult};

/// Configuration shared by every generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seed for the default ChaCha source; `None` draws one from entropy
    pub seed: Option<u64>,

    /// Retries for the lag-1 binary balancer
    pub lag1_retries: usize,

    /// Retries for the lag-2 binary balancer (each retry regenerates lag-1)
    pub lag2_retries: usize,

    /// Retries for the no-adjacent-repeat assigner
    pub no_repeat_retries: usize,

    /// Retries for the ternary lag-2 balancer before it settles for best effort
    pub ternary_retries: usize,

    /// Retries for the stimulus-within-task assigner
    pub stimulus_retries: usize,

    /// Largest accepted |repetitions - switches| at lag 2 for ternary sequences
    pub ternary_lag2_tolerance: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            lag1_retries: 4,
            lag2_retries: 10,
            no_repeat_retries: 10,
            ternary_retries: 1,
            stimulus_retries: 10,
            ternary_lag2_tolerance: 2,
        }
    }
}

impl GeneratorConfig {
    /// Default budgets with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> SequenceResult<Self> {
        serde_json::from_str(json).map_err(|e| SequenceError::invalid("config", e.to_string()))
    }

    pub fn to_json(&self) -> SequenceResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SequenceError::invalid("config", e.to_string()))
    }

    /// Build the random source described by `seed`.
    pub fn build_rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn defaults_match_the_generator_contracts() {
        let config = GeneratorConfig::default();
        assert_eq!(config.lag1_retries, 4);
        assert_eq!(config.lag2_retries, 10);
        assert_eq!(config.no_repeat_retries, 10);
        assert_eq!(config.ternary_retries, 1);
        assert_eq!(config.stimulus_retries, 10);
        assert_eq!(config.ternary_lag2_tolerance, 2);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GeneratorConfig::from_json(r#"{ "seed": 42, "lag2_retries": 20 }"#).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.lag2_retries, 20);
        assert_eq!(config.lag1_retries, 4);
    }

    #[test]
    fn json_round_trip_and_errors() {
        let config = GeneratorConfig::seeded(9);
        let json = config.to_json().unwrap();
        assert_eq!(GeneratorConfig::from_json(&json).unwrap(), config);
        assert!(matches!(
            GeneratorConfig::from_json("{ \"lag1_retries\": \"four\" }"),
            Err(SequenceError::InvalidArgument { parameter: "config", .. })
        ));
    }

    #[test]
    fn seeded_sources_are_reproducible() {
        let config = GeneratorConfig::seeded(123);
        let mut a = config.build_rng();
        let mut b = config.build_rng();
        assert_eq!(a.next_u64(), b.next_u64());
    }
}
