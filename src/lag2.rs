//! Lag-2 variant of the binary balancer.
//!
//! A lag-1 balanced sequence is cut in half and the halves are interleaved
//! ("zipped"): `out[2i] = seq[i]`, `out[2i + 1] = seq[i + n/2]`. Every lag-2
//! pair of the output is then a lag-1 pair of one of the halves, so the lag-2
//! counts are the lag-1 counts minus the single pair at the midpoint seam.
//!
//! Since the lag-1 difference is ±1, the lag-2 difference is zero exactly when
//! the seam pair carries the excess. When it does not, the seam's second
//! element is swapped with the middle of a compatible triplet elsewhere.

use log::trace;
use rand::Rng;

use crate::binary::balance_lag1_with;
use crate::config::GeneratorConfig;
use crate::error::{SequenceError, SequenceResult};
use crate::repair::{generate_repair_verify, Attempt, RetryPolicy, Verdict};
use crate::sequence::{count_transitions, has_equal_counts, validate_even_length, Symbol};

const GENERATOR: &str = "balance_lag2";

/// Balance lag-2 transitions over the task codes `0` and `1`.
pub fn balance_lag2<R>(length: usize, rng: &mut R) -> SequenceResult<Vec<u8>>
where
    R: Rng + ?Sized,
{
    balance_lag2_labels(length, 0u8, 1u8, rng)
}

/// Balance lag-2 transitions over two caller-chosen symbols.
pub fn balance_lag2_labels<T, R>(length: usize, first: T, second: T, rng: &mut R) -> SequenceResult<Vec<T>>
where
    T: Symbol,
    R: Rng + ?Sized,
{
    balance_lag2_with(length, first, second, &GeneratorConfig::default(), rng)
}

/// Balance lag-2 transitions with budgets taken from `config`.
///
/// `config.lag2_retries` bounds the outer loop; every attempt draws a fresh
/// lag-1 sequence under `config.lag1_retries`.
pub fn balance_lag2_with<T, R>(
    length: usize,
    first: T,
    second: T,
    config: &GeneratorConfig,
    rng: &mut R,
) -> SequenceResult<Vec<T>>
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
    let policy = RetryPolicy::new(GENERATOR, config.lag2_retries);

    generate_repair_verify(
        rng,
        &policy,
        |rng| {
            balance_lag1_with(length, alphabet[0].clone(), alphabet[1].clone(), config, rng)
                .map(|balanced| balanced.symbols)
        },
        |seq, _rng, attempt| {
            repair_seam(seq, attempt)?;
            *seq = zip_halves(seq);
            Ok(())
        },
        |seq| {
            if !has_equal_counts(seq, &alphabet) {
                return Verdict::Reject("symbol counts differ".to_string());
            }
            let counts = count_transitions(seq, 2);
            if counts.repetitions != counts.switches {
                return Verdict::Reject(format!(
                    "{} lag-2 repetitions vs {} switches",
                    counts.repetitions, counts.switches
                ));
            }
            Verdict::Accept
        },
    )?
    .into_result(GENERATOR)
}

/// Interleave the first and second half of `seq`.
pub fn zip_halves<T: Clone>(seq: &[T]) -> Vec<T> {
    let half = seq.len() / 2;
    let (front, back) = seq.split_at(half);
    front
        .iter()
        .zip(back.iter())
        .flat_map(|(a, b)| vec![a.clone(), b.clone()])
        .collect()
}

/// Move the lag-1 excess onto the midpoint seam.
///
/// Fails only on the final attempt; earlier misses are left for the verifier
/// to reject.
fn repair_seam<T: Symbol>(seq: &mut [T], attempt: Attempt) -> SequenceResult<()> {
    let n = seq.len();
    let diff = count_transitions(seq, 1).difference();
    let edge = n / 2 - 1;
    let seam_repeats = seq[edge] == seq[edge + 1];
    if !((seam_repeats && diff < 0) || (!seam_repeats && diff > 0)) {
        return Ok(());
    }

    let partner = if n < 4 {
        None
    } else {
        let anchor = seq[edge].clone();
        let closes_run = seq[edge + 2] == anchor;
        let starts = n - 2;
        (0..n - 4)
            .map(|i| (edge + 2 + i) % starts)
            .find(|&ind| seam_partner(&seq[ind..ind + 3], &anchor, seam_repeats, closes_run))
    };

    match partner {
        Some(ind) => {
            seq.swap(edge + 1, ind + 1);
            Ok(())
        }
        None if attempt.is_final() => Err(SequenceError::balance_failure(
            GENERATOR,
            attempt.number(),
            "no triplet compatible with the midpoint seam",
        )),
        None => {
            trace!("{}: no seam partner on attempt {}", GENERATOR, attempt.number());
            Ok(())
        }
    }
}

/// Whether `triplet` can trade its middle with the seam triplet.
///
/// The seam triplet is `seq[edge..edge + 3]`; `anchor` is its first element,
/// `closes_run` whether its last element equals the anchor.
fn seam_partner<T: PartialEq>(triplet: &[T], anchor: &T, seam_repeats: bool, closes_run: bool) -> bool {
    let same = |i: usize| triplet[i] == *anchor;
    match (seam_repeats, closes_run) {
        // x x x  <->  x y x
        (true, true) => same(0) && !same(1) && same(2),
        // x x y  <->  x y y | y y x
        (true, false) => (same(0) && !same(1) && !same(2)) || (!same(0) && !same(1) && same(2)),
        // x y x  <->  x x x
        (false, true) => same(0) && same(1) && same(2),
        // x y y  <->  x x y | y x x
        (false, false) => (same(0) && same(1) && !same(2)) || (!same(0) && same(1) && same(2)),
    }
}
