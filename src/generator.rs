//! A configured generator that owns its random source.
//!
//! Experiment scripts usually want one seed per session and the same budgets
//! everywhere. `SequenceGenerator` bundles both and forwards to the free
//! functions of each module.

use log::info;
use rand_chacha::ChaCha8Rng;

use crate::binary::{balance_lag1_with, BalancedSequence};
use crate::config::GeneratorConfig;
use crate::error::SequenceResult;
use crate::lag2::balance_lag2_with;
use crate::no_repeat::{no_repeat_from_pool_with, no_repeat_sequence_with};
use crate::rematch;
use crate::sequence::Symbol;
use crate::stimulus::{assign_stimuli_labeled_with, assign_stimuli_with, LagMode, StimulusAssignment};
use crate::table::{CellValue, TrialTable};
use crate::ternary::{balance_ternary_with, TernarySequence};

/// Sequence generation with a fixed configuration and a ChaCha source
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    /// Budgets and seed this generator was built from
    pub config: GeneratorConfig,

    rng: ChaCha8Rng,
}

impl SequenceGenerator {
    /// Create a new generator; the source is seeded from `config.seed`.
    pub fn new(config: GeneratorConfig) -> Self {
        match config.seed {
            Some(seed) => info!("sequence generator seeded with {}", seed),
            None => info!("sequence generator seeded from entropy"),
        }
        let rng = config.build_rng();
        Self { config, rng }
    }

    /// Default budgets, fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(GeneratorConfig::seeded(seed))
    }

    pub fn from_json(json: &str) -> SequenceResult<Self> {
        GeneratorConfig::from_json(json).map(Self::new)
    }

    /// The underlying source, for callers mixing in their own draws.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn balance_lag1(&mut self, length: usize) -> SequenceResult<BalancedSequence<u8>> {
        balance_lag1_with(length, 0u8, 1u8, &self.config, &mut self.rng)
    }

    pub fn balance_lag1_labels<T: Symbol>(&mut self, length: usize, first: T, second: T) -> SequenceResult<BalancedSequence<T>> {
        balance_lag1_with(length, first, second, &self.config, &mut self.rng)
    }

    pub fn balance_lag2(&mut self, length: usize) -> SequenceResult<Vec<u8>> {
        balance_lag2_with(length, 0u8, 1u8, &self.config, &mut self.rng)
    }

    pub fn balance_lag2_labels<T: Symbol>(&mut self, length: usize, first: T, second: T) -> SequenceResult<Vec<T>> {
        balance_lag2_with(length, first, second, &self.config, &mut self.rng)
    }

    pub fn no_repeat_sequence<T: Symbol>(&mut self, length: usize, alphabet: &[T]) -> SequenceResult<Vec<T>> {
        no_repeat_sequence_with(length, alphabet, &self.config, &mut self.rng)
    }

    pub fn no_repeat_from_pool<T: Symbol>(&mut self, pool: Vec<T>) -> SequenceResult<Vec<T>> {
        no_repeat_from_pool_with(pool, &self.config, &mut self.rng)
    }

    pub fn balance_ternary<T: Symbol>(&mut self, length: usize, a: T, b: T, c: T) -> SequenceResult<TernarySequence<T>> {
        balance_ternary_with(length, a, b, c, &self.config, &mut self.rng)
    }

    pub fn assign_stimuli<S: Symbol>(
        &mut self,
        length: usize,
        stimuli: &[S],
        lag_mode: LagMode,
    ) -> SequenceResult<StimulusAssignment<u8, S>> {
        assign_stimuli_with(length, stimuli, lag_mode, &self.config, &mut self.rng)
    }

    pub fn assign_stimuli_labeled<K: Symbol, S: Symbol>(
        &mut self,
        length: usize,
        stimuli: &[S],
        task0: K,
        task1: K,
        lag_mode: LagMode,
    ) -> SequenceResult<StimulusAssignment<K, S>> {
        assign_stimuli_labeled_with(length, stimuli, task0, task1, lag_mode, &self.config, &mut self.rng)
    }

    pub fn reorder<V: Clone + Into<CellValue>>(
        &mut self,
        sequence: &[V],
        table: &TrialTable,
        column: &str,
    ) -> SequenceResult<TrialTable> {
        rematch::reorder(sequence, table, column, &mut self.rng)
    }

    pub fn reorder2<V1, V2>(
        &mut self,
        table: &TrialTable,
        col1: &str,
        seq1: &[V1],
        col2: &str,
        seq2: &[V2],
    ) -> SequenceResult<TrialTable>
    where
        V1: Clone + Into<CellValue>,
        V2: Clone + Into<CellValue>,
    {
        rematch::reorder2(table, col1, seq1, col2, seq2, &mut self.rng)
    }

    pub fn reorder_by_assignment<K, S>(
        &mut self,
        table: &TrialTable,
        task_column: &str,
        stimulus_column: &str,
        assignment: &StimulusAssignment<K, S>,
    ) -> SequenceResult<TrialTable>
    where
        K: Clone + Into<CellValue>,
        S: Clone + Into<CellValue>,
    {
        rematch::reorder_by_assignment(table, task_column, stimulus_column, assignment, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SequenceError;
    use crate::sequence::{count_transitions, has_adjacent_repeat};

    #[test]
    fn same_seed_same_sequences() {
        let mut first = SequenceGenerator::seeded(2024);
        let mut second = SequenceGenerator::seeded(2024);
        assert_eq!(first.balance_lag1(24).ok(), second.balance_lag1(24).ok());
        assert_eq!(
            first.no_repeat_sequence(12, &["a", "b", "c"]).ok(),
            second.no_repeat_sequence(12, &["a", "b", "c"]).ok()
        );
    }

    #[test]
    fn configured_budgets_are_used() {
        let config = GeneratorConfig {
            lag2_retries: 0,
            ..GeneratorConfig::seeded(1)
        };
        let mut generator = SequenceGenerator::new(config);
        match generator.balance_lag2(4) {
            Err(SequenceError::BalanceFailure { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected BalanceFailure, got {:?}", other),
        }
    }

    #[test]
    fn json_configuration() {
        let mut generator = SequenceGenerator::from_json(r#"{"seed": 5, "ternary_lag2_tolerance": 4}"#).unwrap();
        assert_eq!(generator.config.ternary_lag2_tolerance, 4);
        let ternary = generator.balance_ternary(24, 'r', 'g', 'b').unwrap();
        assert!(!has_adjacent_repeat(&ternary.symbols));
        if ternary.balanced {
            assert!(ternary.lag2.imbalance() <= 4);
        }
        assert!(SequenceGenerator::from_json("{\"seed\": \"five\"}").is_err());
    }

    #[test]
    fn labeled_assignments_from_the_facade() {
        let mut generator = SequenceGenerator::seeded(77);
        let assignment = loop {
            match generator.assign_stimuli_labeled(16, &[1i64, 2, 3, 4], "colour", "shape", LagMode::Lag1) {
                Ok(assignment) => break assignment,
                Err(err) => assert!(err.is_recoverable()),
            }
        };
        assert_eq!(assignment.len(), 16);
        assert_eq!(count_transitions(&assignment.tasks(), 1).imbalance(), 1);
        assert!(!has_adjacent_repeat(&assignment.stimuli()));

        assert!(matches!(
            generator.assign_stimuli_labeled(16, &[1i64, 2], "colour", "colour", LagMode::Lag1),
            Err(SequenceError::InvalidArgument { parameter: "tasks", .. })
        ));
    }

    #[test]
    fn labeled_assignments_follow_the_stimulus_budget() {
        let config = GeneratorConfig {
            stimulus_retries: 1,
            ..GeneratorConfig::seeded(3)
        };
        let mut generator = SequenceGenerator::new(config);
        match generator.assign_stimuli_labeled(4, &['x'], "colour", "shape", LagMode::Lag1) {
            Err(SequenceError::BalanceFailure { generator, attempts, .. }) => {
                assert_eq!(generator, "assign_stimuli");
                assert_eq!(attempts, 2);
            }
            other => panic!("expected BalanceFailure, got {:?}", other),
        }
    }

    #[test]
    fn pools_are_shuffled_under_the_configured_budget() {
        let mut generator = SequenceGenerator::seeded(8);
        let pool = vec!['a', 'a', 'b', 'b', 'c', 'c'];
        let shuffled = loop {
            match generator.no_repeat_from_pool(pool.clone()) {
                Ok(shuffled) => break shuffled,
                Err(err) => assert!(err.is_recoverable()),
            }
        };
        assert!(!has_adjacent_repeat(&shuffled));
        let mut sorted = shuffled.clone();
        sorted.sort();
        assert_eq!(sorted, pool);
    }
}
