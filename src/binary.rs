//! Binary transition balancer.
//!
//! Produces a two-symbol sequence with exactly half of each symbol in which
//! lag-1 repetitions and switches differ by at most one. Because a sequence of
//! even length has an odd number of transitions, the difference is always
//! exactly one on success.
//!
//! The search starts from a uniform shuffle and repairs excess repetitions or
//! excess switches by swapping the middle elements of two carefully chosen
//! triplets. Each such swap moves the difference by up to four while keeping
//! both symbol counts intact.

use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::GeneratorConfig;
use crate::error::{SequenceError, SequenceResult};
use crate::repair::{generate_repair_verify, RetryPolicy, Verdict};
use crate::sequence::{blocked_layout, count_transitions, validate_even_length, Symbol};

const GENERATOR: &str = "balance_lag1";

/// A lag-1 balanced sequence together with its transition counts
#[derive(Debug, Clone, PartialEq)]
pub struct BalancedSequence<T> {
    pub symbols: Vec<T>,
    pub repetitions: usize,
    pub switches: usize,
}

impl<T> BalancedSequence<T> {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn into_symbols(self) -> Vec<T> {
        self.symbols
    }
}

/// Balance lag-1 transitions over the task codes `0` and `1`.
pub fn balance_lag1<R>(length: usize, rng: &mut R) -> SequenceResult<BalancedSequence<u8>>
where
    R: Rng + ?Sized,
{
    balance_lag1_labels(length, 0u8, 1u8, rng)
}

/// Balance lag-1 transitions over two caller-chosen symbols.
pub fn balance_lag1_labels<T, R>(
    length: usize,
    first: T,
    second: T,
    rng: &mut R,
) -> SequenceResult<BalancedSequence<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    balance_lag1_with(length, first, second, &GeneratorConfig::default(), rng)
}

/// Balance lag-1 transitions with the retry budget taken from `config`.
pub fn balance_lag1_with<T, R>(
    length: usize,
    first: T,
    second: T,
    config: &GeneratorConfig,
    rng: &mut R,
) -> SequenceResult<BalancedSequence<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    validate_even_length(length)?;
    if first == second {
        return Err(SequenceError::invalid(
            "symbols",
            format!("the two symbols must differ, both are {:?}", first),
        ));
    }

    let alphabet = [first, second];
    let layout = blocked_layout(&alphabet, length / 2);
    let policy = RetryPolicy::new(GENERATOR, config.lag1_retries);

    let symbols = generate_repair_verify(
        rng,
        &policy,
        |rng| {
            let mut seq = layout.clone();
            seq.shuffle(rng);
            Ok(seq)
        },
        |seq, rng, _attempt| {
            repair_lag1(seq, rng);
            Ok(())
        },
        |seq| verify_lag1(seq, &alphabet),
    )?
    .into_result(GENERATOR)?;

    let counts = count_transitions(&symbols, 1);
    Ok(BalancedSequence {
        symbols,
        repetitions: counts.repetitions,
        switches: counts.switches,
    })
}

fn verify_lag1<T: Symbol>(seq: &[T], alphabet: &[T; 2]) -> Verdict {
    let firsts = seq.iter().filter(|s| **s == alphabet[0]).count();
    let seconds = seq.iter().filter(|s| **s == alphabet[1]).count();
    if firsts != seconds || firsts + seconds != seq.len() {
        return Verdict::Reject(format!(
            "symbol counts differ: {:?} x{} vs {:?} x{}",
            alphabet[0], firsts, alphabet[1], seconds
        ));
    }
    let counts = count_transitions(seq, 1);
    if counts.imbalance() > 1 {
        return Verdict::Reject(format!(
            "{} repetitions vs {} switches",
            counts.repetitions, counts.switches
        ));
    }
    Verdict::Accept
}

/// Rounds needed to absorb an excess of `excess` (>= 2) transitions.
fn repair_rounds(excess: usize) -> usize {
    (excess - 2) / 4 + 1
}

/// One pass of local repairs on a shuffled two-symbol sequence.
pub(crate) fn repair_lag1<T: Symbol, R: Rng + ?Sized>(seq: &mut [T], rng: &mut R) {
    if seq.len() < 4 {
        return;
    }

    let mut counts = count_transitions(seq, 1);
    if counts.repetitions == 0 {
        // x y x y ... becomes y x x y ...
        seq[..3].rotate_left(1);
        counts = count_transitions(seq, 1);
    }

    let diff = counts.difference();
    if diff > 1 {
        for round in 0..repair_rounds(diff as usize) {
            if !split_identical_run(seq, rng) {
                trace!("{}: no run to split in round {}", GENERATOR, round);
            }
        }
    } else if diff < -1 {
        for round in 0..repair_rounds(diff.unsigned_abs()) {
            if !break_alternation(seq, rng) {
                trace!("{}: no alternation to break in round {}", GENERATOR, round);
            }
        }
    }
}

/// Turn repetitions into switches: find `x x x` and a triplet `x y y` or
/// `y y x`, then swap the two middles.
fn split_identical_run<T: Symbol, R: Rng + ?Sized>(seq: &mut [T], rng: &mut R) -> bool {
    let n = seq.len();
    let starts = n - 2;
    let offset = rng.gen_range(0..n);
    for i in 0..starts {
        let first = (offset + i) % starts;
        if !(seq[first] == seq[first + 1] && seq[first + 1] == seq[first + 2]) {
            continue;
        }
        let anchor = seq[first].clone();
        let partner_offset = rng.gen_range(0..n);
        let partner = (0..starts)
            .map(|k| (partner_offset + k) % starts)
            .find(|&ind| {
                let leads = seq[ind] == anchor && seq[ind + 1] != anchor && seq[ind + 2] != anchor;
                let trails = seq[ind] != anchor && seq[ind + 1] != anchor && seq[ind + 2] == anchor;
                leads || trails
            });
        if let Some(ind) = partner {
            seq.swap(first + 1, ind + 1);
            return true;
        }
    }
    false
}

/// Turn switches into repetitions: find `x y x` and a non-overlapping triplet
/// `x x y` or `y x x`, then swap the two middles.
fn break_alternation<T: Symbol, R: Rng + ?Sized>(seq: &mut [T], rng: &mut R) -> bool {
    let n = seq.len();
    let starts = n - 2;
    let offset = rng.gen_range(0..n);
    for i in 0..starts {
        let first = (offset + i) % starts;
        if !(seq[first] != seq[first + 1] && seq[first] == seq[first + 2]) {
            continue;
        }
        let anchor = seq[first].clone();
        let change = first + 1;
        let partner_offset = rng.gen_range(0..n);
        let partner = (0..starts)
            .map(|k| (partner_offset + k) % starts)
            .filter(|&ind| ind != change && ind + 1 != first)
            .find(|&ind| {
                let leads = seq[ind] == anchor && seq[ind + 1] == anchor && seq[ind + 2] != anchor;
                let trails = seq[ind] != anchor && seq[ind + 1] == anchor && seq[ind + 2] == anchor;
                leads || trails
            });
        if let Some(ind) = partner {
            seq.swap(change, ind + 1);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn eight_trials_have_three_or_four_repetitions() {
        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let balanced = balance_lag1(8, &mut rng).unwrap();
            assert_eq!(balanced.len(), 8);
            assert_eq!(balanced.symbols.iter().filter(|s| **s == 0).count(), 4);
            assert_eq!(balanced.symbols.iter().filter(|s| **s == 1).count(), 4);
            assert!(balanced.repetitions == 3 || balanced.repetitions == 4);
            assert_eq!(balanced.repetitions + balanced.switches, 7);
        }
    }

    #[test]
    fn reported_counts_match_the_sequence() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let balanced = balance_lag1(96, &mut rng).unwrap();
        let counts = count_transitions(&balanced.symbols, 1);
        assert_eq!(counts.repetitions, balanced.repetitions);
        assert_eq!(counts.switches, balanced.switches);
        assert_eq!(counts.imbalance(), 1);
    }

    #[test]
    fn labels_replace_codes() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let balanced = balance_lag1_labels(12, "magnitude", "parity", &mut rng).unwrap();
        assert_eq!(balanced.symbols.iter().filter(|s| **s == "magnitude").count(), 6);
        assert_eq!(balanced.symbols.iter().filter(|s| **s == "parity").count(), 6);
    }

    #[test]
    fn two_trials_are_trivially_balanced() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let balanced = balance_lag1(2, &mut rng).unwrap();
        assert_eq!(balanced.repetitions, 0);
        assert_eq!(balanced.switches, 1);
    }

    #[test]
    fn invalid_lengths_and_symbols_are_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for length in [0, 1, 7, 95].iter() {
            match balance_lag1(*length, &mut rng) {
                Err(SequenceError::InvalidArgument { parameter, .. }) => assert_eq!(parameter, "length"),
                other => panic!("expected InvalidArgument for {}, got {:?}", length, other),
            }
        }
        assert!(matches!(
            balance_lag1_labels(8, "same", "same", &mut rng),
            Err(SequenceError::InvalidArgument { parameter: "symbols", .. })
        ));
    }

    #[test]
    fn repair_fixes_a_blocked_layout() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut seq = vec![0, 0, 0, 0, 1, 1, 1, 1];
        repair_lag1(&mut seq, &mut rng);
        assert_eq!(seq.iter().filter(|s| **s == 0).count(), 4);
        assert_eq!(count_transitions(&seq, 1).imbalance(), 1);
    }

    #[test]
    fn repair_breaks_perfect_alternation() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut seq = vec![0, 1, 0, 1, 0, 1];
        repair_lag1(&mut seq, &mut rng);
        assert_eq!(seq.iter().filter(|s| **s == 1).count(), 3);
        assert!(count_transitions(&seq, 1).repetitions > 0);
    }
}
