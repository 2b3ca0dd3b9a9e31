//! Sequence analysis shared by the generators.
//!
//! Everything here is pure: transition counting at an arbitrary lag, symbol
//! count checks, adjacency checks, and the argument validation every public
//! entry point runs before touching the random source.

use std::fmt::Debug;

use crate::error::{SequenceError, SequenceResult};

/// An opaque trial label: an integer code, a task name, a stimulus id.
///
/// Only equality is ever used, so integer and string alphabets share every
/// code path.
pub trait Symbol: Clone + PartialEq + Debug {}

impl<T: Clone + PartialEq + Debug> Symbol for T {}

/// Repetition and switch counts at one lag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionCounts {
    /// Positions where `seq[i] == seq[i - lag]`
    pub repetitions: usize,
    /// Positions where `seq[i] != seq[i - lag]`
    pub switches: usize,
}

impl TransitionCounts {
    /// Signed `repetitions - switches`.
    pub fn difference(&self) -> isize {
        self.repetitions as isize - self.switches as isize
    }

    /// Absolute distance between repetitions and switches.
    pub fn imbalance(&self) -> usize {
        self.difference().unsigned_abs()
    }

    pub fn total(&self) -> usize {
        self.repetitions + self.switches
    }
}

/// Count lag-`lag` repetitions and switches in `seq`.
///
/// A sequence shorter than or equal to `lag` has no transitions.
pub fn count_transitions<T: PartialEq>(seq: &[T], lag: usize) -> TransitionCounts {
    let mut counts = TransitionCounts::default();
    if lag == 0 {
        return counts;
    }
    for (earlier, later) in seq.iter().zip(seq.iter().skip(lag)) {
        if earlier == later {
            counts.repetitions += 1;
        } else {
            counts.switches += 1;
        }
    }
    counts
}

/// Occurrences of each alphabet symbol, in alphabet order.
pub fn symbol_counts<T: PartialEq>(seq: &[T], alphabet: &[T]) -> Vec<usize> {
    alphabet
        .iter()
        .map(|symbol| seq.iter().filter(|s| *s == symbol).count())
        .collect()
}

/// True when every symbol of `alphabet` occurs equally often and nothing else
/// occurs at all.
pub fn has_equal_counts<T: PartialEq>(seq: &[T], alphabet: &[T]) -> bool {
    let counts = symbol_counts(seq, alphabet);
    let covered: usize = counts.iter().sum();
    covered == seq.len() && counts.windows(2).all(|pair| pair[0] == pair[1])
}

/// Index of the first `j` with `seq[j] == seq[j - 1]`.
pub fn first_adjacent_repeat<T: PartialEq>(seq: &[T]) -> Option<usize> {
    seq.windows(2).position(|pair| pair[0] == pair[1]).map(|i| i + 1)
}

pub fn has_adjacent_repeat<T: PartialEq>(seq: &[T]) -> bool {
    first_adjacent_repeat(seq).is_some()
}

pub(crate) fn validate_even_length(length: usize) -> SequenceResult<()> {
    if length == 0 || length % 2 != 0 {
        return Err(SequenceError::invalid(
            "length",
            format!("must be a positive even integer, got {}", length),
        ));
    }
    Ok(())
}

/// Reject empty alphabets and alphabets that list a symbol twice.
pub(crate) fn validate_alphabet<T: Symbol>(alphabet: &[T]) -> SequenceResult<()> {
    if alphabet.is_empty() {
        return Err(SequenceError::invalid("alphabet", "must contain at least one symbol"));
    }
    for (i, symbol) in alphabet.iter().enumerate() {
        if alphabet[..i].contains(symbol) {
            return Err(SequenceError::invalid(
                "alphabet",
                format!("symbol {:?} is listed more than once", symbol),
            ));
        }
    }
    Ok(())
}

pub(crate) fn validate_divisible(
    parameter: &'static str,
    length: usize,
    alphabet_len: usize,
) -> SequenceResult<()> {
    if length % alphabet_len != 0 {
        return Err(SequenceError::invalid(
            parameter,
            format!(
                "{} is not divisible by the alphabet size {}, so equal counts are impossible",
                length, alphabet_len
            ),
        ));
    }
    Ok(())
}

/// Lay out `per_symbol` copies of every symbol, symbol by symbol.
pub(crate) fn blocked_layout<T: Symbol>(alphabet: &[T], per_symbol: usize) -> Vec<T> {
    alphabet
        .iter()
        .flat_map(|symbol| std::iter::repeat(symbol.clone()).take(per_symbol))
        .collect()
}
