//! Sequences without immediate repetitions.
//!
//! Every symbol of the alphabet appears `length / alphabet.len()` times and no
//! two neighbouring positions hold the same symbol. The repair step scans the
//! shuffled sequence once; for each adjacent pair it moves the first element
//! of the pair to a position where it fits and brings the displaced element
//! back in its place.

use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::GeneratorConfig;
use crate::error::{SequenceError, SequenceResult};
use crate::repair::{generate_repair_verify, Attempt, RetryPolicy, Verdict};
use crate::sequence::{
    blocked_layout, first_adjacent_repeat, has_equal_counts, validate_alphabet, validate_divisible,
    Symbol,
};

const GENERATOR: &str = "no_repeat_sequence";

/// Equal counts of every symbol, no two neighbours equal.
pub fn no_repeat_sequence<T, R>(length: usize, alphabet: &[T], rng: &mut R) -> SequenceResult<Vec<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    no_repeat_sequence_with(length, alphabet, &GeneratorConfig::default(), rng)
}

pub fn no_repeat_sequence_with<T, R>(
    length: usize,
    alphabet: &[T],
    config: &GeneratorConfig,
    rng: &mut R,
) -> SequenceResult<Vec<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    validate_alphabet(alphabet)?;
    if length == 0 {
        return Err(SequenceError::invalid("length", "must be positive"));
    }
    validate_divisible("length", length, alphabet.len())?;

    let layout = blocked_layout(alphabet, length / alphabet.len());
    let policy = RetryPolicy::new(GENERATOR, config.no_repeat_retries);

    generate_repair_verify(
        rng,
        &policy,
        |rng| {
            let mut seq = layout.clone();
            seq.shuffle(rng);
            Ok(seq)
        },
        |seq, _rng, attempt| separate_adjacent_repeats(seq, |_, _| true, attempt, GENERATOR),
        |seq| {
            if !has_equal_counts(seq, alphabet) {
                return Verdict::Reject("symbols are not equally represented".to_string());
            }
            verify_no_adjacent_repeat(seq)
        },
    )?
    .into_result(GENERATOR)
}

const POOL_GENERATOR: &str = "no_repeat_from_pool";

/// Reorder a caller-supplied pool so that no two neighbours are equal.
///
/// The pool may hold any multiset; its contents are preserved and only the
/// adjacency constraint is checked.
pub fn no_repeat_from_pool<T, R>(pool: Vec<T>, rng: &mut R) -> SequenceResult<Vec<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    no_repeat_from_pool_with(pool, &GeneratorConfig::default(), rng)
}

pub fn no_repeat_from_pool_with<T, R>(pool: Vec<T>, config: &GeneratorConfig, rng: &mut R) -> SequenceResult<Vec<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return Err(SequenceError::invalid("pool", "must contain at least one element"));
    }
    let policy = RetryPolicy::new(POOL_GENERATOR, config.no_repeat_retries);

    generate_repair_verify(
        rng,
        &policy,
        |rng| {
            let mut seq = pool.clone();
            seq.shuffle(rng);
            Ok(seq)
        },
        |seq, _rng, attempt| separate_adjacent_repeats(seq, |_, _| true, attempt, POOL_GENERATOR),
        |seq| verify_no_adjacent_repeat(seq),
    )?
    .into_result(POOL_GENERATOR)
}

pub(crate) fn verify_no_adjacent_repeat<T: Symbol>(seq: &[T]) -> Verdict {
    match first_adjacent_repeat(seq) {
        Some(j) => Verdict::Reject(format!("{:?} repeats at positions {} and {}", seq[j], j - 1, j)),
        None => Verdict::Accept,
    }
}

/// Remove adjacent repeats by swapping the first element of each repeated pair
/// with a compatible position elsewhere.
///
/// For a repeat at `(j - 1, j)` the candidate `ind` is searched circularly
/// over `(j + i) % (n - 1)` for `i` in `2..n - 1`. The candidate must differ
/// from the repeated symbol, both of its neighbours must differ from it too,
/// and its own value must differ from `seq[j - 2]`. `same_group(ind, j - 1)`
/// lets callers restrict swaps to positions of the same group (the stimulus
/// assigner keeps swaps within one task).
///
/// When no candidate exists the pair is left in place, except on the final
/// attempt where the search fails with `BalanceFailure`.
pub(crate) fn separate_adjacent_repeats<T, G>(
    seq: &mut [T],
    same_group: G,
    attempt: Attempt,
    generator: &'static str,
) -> SequenceResult<()>
where
    T: Symbol,
    G: Fn(usize, usize) -> bool,
{
    let n = seq.len();
    if n < 2 {
        return Ok(());
    }
    let wrap = n - 1;

    for j in 1..n {
        if seq[j] != seq[j - 1] {
            continue;
        }
        let offending = j - 1;
        let repeated = seq[offending].clone();
        let before = offending.checked_sub(1).map(|p| seq[p].clone());

        let candidate = (2..wrap).map(|i| (j + i) % wrap).find(|&ind| {
            let left_clear = ind.checked_sub(1).map_or(true, |p| seq[p] != repeated);
            left_clear
                && seq[ind] != repeated
                && seq[ind + 1] != repeated
                && before.as_ref().map_or(true, |b| seq[ind] != *b)
                && same_group(ind, offending)
        });

        match candidate {
            Some(ind) => seq.swap(offending, ind),
            None if attempt.is_final() => {
                return Err(SequenceError::balance_failure(
                    generator,
                    attempt.number(),
                    format!("no position can take the repeated {:?} at {}", repeated, offending),
                ));
            }
            None => trace!("{}: repeat at {} left for the next attempt", generator, j),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::has_adjacent_repeat;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn four_letters_twice_each() {
        for seed in 0..100 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let seq = no_repeat_sequence(8, &["a", "b", "c", "d"], &mut rng).unwrap();
            assert_eq!(seq.len(), 8);
            for letter in ["a", "b", "c", "d"].iter() {
                assert_eq!(seq.iter().filter(|s| *s == letter).count(), 2);
            }
            assert!(!has_adjacent_repeat(&seq));
        }
    }

    #[test]
    fn long_integer_sequences() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let alphabet: Vec<u32> = (1..=8).collect();
        let seq = no_repeat_sequence(96, &alphabet, &mut rng).unwrap();
        assert!(has_equal_counts(&seq, &alphabet));
        assert!(!has_adjacent_repeat(&seq));
    }

    #[test]
    fn indivisible_length_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            no_repeat_sequence(10, &["a", "b", "c"], &mut rng),
            Err(SequenceError::InvalidArgument { parameter: "length", .. })
        ));
        assert!(matches!(
            no_repeat_sequence(0, &["a"], &mut rng),
            Err(SequenceError::InvalidArgument { parameter: "length", .. })
        ));
        assert!(matches!(
            no_repeat_sequence(4, &["a", "a"], &mut rng),
            Err(SequenceError::InvalidArgument { parameter: "alphabet", .. })
        ));
    }

    #[test]
    fn single_symbol_alphabet_exhausts_the_budget() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        match no_repeat_sequence(4, &["only"], &mut rng) {
            Err(SequenceError::BalanceFailure { generator, attempts, .. }) => {
                assert_eq!(generator, GENERATOR);
                assert_eq!(attempts, GeneratorConfig::default().no_repeat_retries + 1);
            }
            other => panic!("expected BalanceFailure, got {:?}", other),
        }
        assert_eq!(no_repeat_sequence(1, &["only"], &mut rng).unwrap(), vec!["only"]);
    }

    #[test]
    fn frozen_random_source_exhausts_the_budget() {
        // A source that always yields zero turns every shuffle into the same
        // fixed permutation, so every attempt starts from a b b a.
        let mut rng = StepRng::new(0, 0);
        match no_repeat_sequence(4, &['a', 'b'], &mut rng) {
            Err(err) => assert!(err.is_recoverable()),
            Ok(seq) => panic!("expected BalanceFailure, got {:?}", seq),
        }
    }

    #[test]
    fn pools_keep_their_multiset() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let pool = vec![1, 1, 1, 2, 2, 3, 3, 4, 5, 6];
        let seq = no_repeat_from_pool(pool.clone(), &mut rng).unwrap();
        assert!(!has_adjacent_repeat(&seq));
        let mut sorted = seq.clone();
        sorted.sort();
        assert_eq!(sorted, pool);
    }

    #[test]
    fn configured_pool_budget_is_reported() {
        let config = GeneratorConfig {
            no_repeat_retries: 3,
            ..GeneratorConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        match no_repeat_from_pool_with(vec!['z', 'z', 'z'], &config, &mut rng) {
            Err(SequenceError::BalanceFailure { generator, attempts, .. }) => {
                assert_eq!(generator, POOL_GENERATOR);
                assert_eq!(attempts, 4);
            }
            other => panic!("expected BalanceFailure, got {:?}", other),
        }
        assert!(matches!(
            no_repeat_from_pool(Vec::<char>::new(), &mut rng),
            Err(SequenceError::InvalidArgument { parameter: "pool", .. })
        ));
    }

    #[test]
    fn repair_swaps_within_groups_only() {
        let attempt = Attempt::first_of(1);
        // groups: even positions vs odd positions
        let mut seq = vec!['a', 'a', 'b', 'c', 'b', 'c'];
        separate_adjacent_repeats(&mut seq, |ind, off| ind % 2 == off % 2, attempt, "test").unwrap();
        assert!(!has_adjacent_repeat(&seq));
        assert_eq!(seq[1], 'a');
    }

    #[test]
    fn final_attempt_miss_is_an_error() {
        let mut seq = vec!['a', 'a'];
        assert!(separate_adjacent_repeats(&mut seq, |_, _| true, Attempt::first_of(2), "test").is_ok());
        assert!(matches!(
            separate_adjacent_repeats(&mut seq, |_, _| true, Attempt::first_of(1), "test"),
            Err(SequenceError::BalanceFailure { generator: "test", attempts: 1, .. })
        ));
    }
}
