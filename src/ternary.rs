//! Three-symbol sequences: no immediate repeats, roughly balanced at lag 2.
//!
//! Without adjacent repeats a three-symbol sequence decides its lag-2
//! transitions entirely by whether it "returns" (`a b a`) or "rotates"
//! (`a b c`). Repair rounds swap the two middle elements of a six-element
//! window, which flips returns into rotations or back without ever creating
//! an adjacent repeat.
//!
//! This balancer is lenient: after its (small) budget it hands back the best
//! candidate it has, flagged as unbalanced, instead of failing.

use log::{trace, warn};
use rand::Rng;

use crate::config::GeneratorConfig;
use crate::error::SequenceResult;
use crate::no_repeat::no_repeat_sequence_with;
use crate::repair::{generate_repair_verify, Attempt, RetryPolicy, Search, Verdict};
use crate::sequence::{
    count_transitions, first_adjacent_repeat, has_equal_counts, validate_alphabet,
    validate_divisible, validate_even_length, Symbol, TransitionCounts,
};

const GENERATOR: &str = "balance_ternary";
const CODES: [u8; 3] = [0, 1, 2];

/// A ternary sequence and its lag-2 diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct TernarySequence<T> {
    pub symbols: Vec<T>,
    pub lag2: TransitionCounts,
    /// False when the budget ran out and `symbols` is a best-effort result
    pub balanced: bool,
}

pub fn balance_ternary<T, R>(length: usize, a: T, b: T, c: T, rng: &mut R) -> SequenceResult<TernarySequence<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    balance_ternary_with(length, a, b, c, &GeneratorConfig::default(), rng)
}

pub fn balance_ternary_with<T, R>(
    length: usize,
    a: T,
    b: T,
    c: T,
    config: &GeneratorConfig,
    rng: &mut R,
) -> SequenceResult<TernarySequence<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    validate_even_length(length)?;
    validate_divisible("length", length, 3)?;
    let labels = [a, b, c];
    validate_alphabet(&labels)?;

    let tolerance = config.ternary_lag2_tolerance;
    let policy = RetryPolicy::new(GENERATOR, config.ternary_retries);

    let search = generate_repair_verify(
        rng,
        &policy,
        |rng| no_repeat_sequence_with(length, &CODES, config, rng),
        |seq, rng, attempt| {
            rebalance_lag2(seq, rng, attempt);
            Ok(())
        },
        |seq| verify_ternary(seq, tolerance),
    )?;

    let (codes, balanced) = match search {
        Search::Accepted { value, .. } => (value, true),
        Search::Exhausted {
            value,
            attempts,
            reason,
        } => {
            warn!(
                "{}: returning an unbalanced sequence after {} attempts: {}",
                GENERATOR, attempts, reason
            );
            (value, false)
        }
    };

    let lag2 = count_transitions(&codes, 2);
    let symbols = codes
        .iter()
        .map(|&code| labels[code as usize].clone())
        .collect();
    Ok(TernarySequence {
        symbols,
        lag2,
        balanced,
    })
}

fn verify_ternary(seq: &[u8], tolerance: usize) -> Verdict {
    if !has_equal_counts(seq, &CODES) {
        return Verdict::Reject("the three symbols are not equally represented".to_string());
    }
    if let Some(j) = first_adjacent_repeat(seq) {
        return Verdict::Reject(format!("adjacent repeat at positions {} and {}", j - 1, j));
    }
    let counts = count_transitions(seq, 2);
    if counts.imbalance() > tolerance {
        return Verdict::Reject(format!(
            "{} lag-2 repetitions vs {} switches",
            counts.repetitions, counts.switches
        ));
    }
    Verdict::Accept
}

/// Rounds needed for a lag-2 difference of `excess`.
fn rebalance_rounds(excess: usize) -> usize {
    excess / 4 + (excess % 4) / 3
}

/// Swap window middles until the lag-2 difference shrinks.
///
/// The window direction is chosen once from the initial difference. A round
/// that finds no window is only reported; the verifier decides.
fn rebalance_lag2<T: Symbol, R: Rng + ?Sized>(seq: &mut [T], rng: &mut R, attempt: Attempt) {
    let n = seq.len();
    if n < 6 {
        return;
    }
    let diff = count_transitions(seq, 2).difference();
    let starts = n - 5;

    for round in 0..rebalance_rounds(diff.unsigned_abs()) {
        let offset = rng.gen_range(0..n);
        let window = (0..starts)
            .map(|i| (offset + i) % starts)
            .find(|&ind| flippable(&seq[ind..ind + 6], diff > 0));
        match window {
            Some(ind) => seq.swap(ind + 2, ind + 3),
            None if attempt.is_final() => {
                warn!("{}: no six-element window left in round {}", GENERATOR, round)
            }
            None => trace!("{}: no window in round {}", GENERATOR, round),
        }
    }
}

/// Whether swapping `w[2]` and `w[3]` moves the lag-2 difference in the
/// wanted direction.
fn flippable<T: PartialEq>(w: &[T], excess_repetitions: bool) -> bool {
    if w[1] != w[4] {
        return false;
    }
    if excess_repetitions {
        w[0] == w[2] && w[3] == w[5]
    } else {
        w[0] == w[3] && w[2] == w[5]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SequenceError;
    use crate::sequence::has_adjacent_repeat;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn accepted_sequences_satisfy_all_three_invariants() {
        let mut accepted = 0;
        for seed in 0..60 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = balance_ternary(96, "a", "b", "c", &mut rng).unwrap();
            assert_eq!(result.symbols.len(), 96);
            assert!(has_equal_counts(&result.symbols, &["a", "b", "c"]));
            assert!(!has_adjacent_repeat(&result.symbols));
            assert_eq!(result.lag2, count_transitions(&result.symbols, 2));
            if result.balanced {
                accepted += 1;
                assert!(result.lag2.imbalance() <= 2);
            }
        }
        assert!(accepted > 0);
    }

    #[test]
    fn length_must_be_even_and_divisible_by_three() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for length in [0usize, 9, 8, 15].iter() {
            assert!(matches!(
                balance_ternary(*length, 'x', 'y', 'z', &mut rng),
                Err(SequenceError::InvalidArgument { parameter: "length", .. })
            ));
        }
        assert!(matches!(
            balance_ternary(12, 'x', 'y', 'x', &mut rng),
            Err(SequenceError::InvalidArgument { parameter: "alphabet", .. })
        ));
    }

    #[test]
    fn round_count_follows_the_excess() {
        assert_eq!(rebalance_rounds(0), 0);
        assert_eq!(rebalance_rounds(2), 0);
        assert_eq!(rebalance_rounds(3), 1);
        assert_eq!(rebalance_rounds(4), 1);
        assert_eq!(rebalance_rounds(7), 2);
        assert_eq!(rebalance_rounds(9), 2);
    }

    #[test]
    fn window_swap_reduces_excess_repetitions() {
        // a b a c b c: lag-2 pairs a-a, b-c, a-b, c-c
        let mut seq = vec![0u8, 1, 0, 2, 1, 2, 0, 1, 0, 2, 1, 2];
        let before = count_transitions(&seq, 2);
        assert!(flippable(&seq[0..6], true));
        seq.swap(2, 3);
        let after = count_transitions(&seq, 2);
        assert!(after.difference() < before.difference());
        assert!(!has_adjacent_repeat(&seq));
    }

    #[test]
    fn exhausted_budget_returns_best_effort() {
        let config = GeneratorConfig {
            ternary_retries: 0,
            ternary_lag2_tolerance: 0,
            ..GeneratorConfig::default()
        };
        let mut saw_unbalanced = false;
        for seed in 0..40 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = balance_ternary_with(30, 1, 2, 3, &config, &mut rng).unwrap();
            assert!(!has_adjacent_repeat(&result.symbols));
            if !result.balanced {
                saw_unbalanced = true;
                assert!(result.lag2.imbalance() > 0);
            }
        }
        assert!(saw_unbalanced);
    }
}
