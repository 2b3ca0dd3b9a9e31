//! The generate-repair-verify retry loop.
//!
//! Every generator in this crate has the same shape: draw a random candidate,
//! patch local defects with a bounded search-and-swap, re-check the invariants
//! and start over from scratch when the check fails. This module owns that
//! loop so the generators only supply the three steps.
//!
//! Repair steps follow an "only fail on the last try" policy. A repair that
//! finds no swap candidate on an early attempt simply leaves the candidate as
//! it is; verification rejects it and the loop regenerates. Only on the final
//! attempt may a repair step abort with [`SequenceError::BalanceFailure`].

use log::debug;
use rand::Rng;

use crate::error::{SequenceError, SequenceResult};

/// Name and retry budget of one generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub generator: &'static str,
    /// Attempts after the first one
    pub retries: usize,
}

impl RetryPolicy {
    pub fn new(generator: &'static str, retries: usize) -> Self {
        Self { generator, retries }
    }

    pub fn max_attempts(&self) -> usize {
        self.retries + 1
    }
}

/// Position of the current attempt within the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    index: usize,
    max_attempts: usize,
}

impl Attempt {
    /// One-based attempt number.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn is_final(&self) -> bool {
        self.index + 1 >= self.max_attempts
    }

    #[cfg(test)]
    pub(crate) fn first_of(max_attempts: usize) -> Self {
        Self {
            index: 0,
            max_attempts,
        }
    }
}

/// Outcome of the verification step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(String),
}

/// Result of a whole search
#[derive(Debug, Clone, PartialEq)]
pub enum Search<T> {
    /// A candidate passed verification
    Accepted { value: T, attempts: usize },
    /// The budget ran out; `value` is the last candidate tried
    Exhausted {
        value: T,
        attempts: usize,
        reason: String,
    },
}

impl<T> Search<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Search::Accepted { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            Search::Accepted { attempts, .. } | Search::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Turn an exhausted search into a `BalanceFailure` for `generator`.
    pub fn into_result(self, generator: &'static str) -> SequenceResult<T> {
        match self {
            Search::Accepted { value, .. } => Ok(value),
            Search::Exhausted {
                attempts, reason, ..
            } => Err(SequenceError::balance_failure(generator, attempts, reason)),
        }
    }
}

/// Run `generate`, `repair` and `verify` until a candidate is accepted or the
/// policy's budget is spent.
///
/// Errors returned by `generate` or `repair` abort the search immediately.
/// Generators nest (the lag-2 balancer generates through the lag-1 balancer),
/// so an inner `BalanceFailure` surfaces unchanged.
pub fn generate_repair_verify<T, R, G, F, V>(
    rng: &mut R,
    policy: &RetryPolicy,
    mut generate: G,
    mut repair: F,
    verify: V,
) -> SequenceResult<Search<T>>
where
    R: Rng + ?Sized,
    G: FnMut(&mut R) -> SequenceResult<T>,
    F: FnMut(&mut T, &mut R, Attempt) -> SequenceResult<()>,
    V: Fn(&T) -> Verdict,
{
    let max_attempts = policy.max_attempts();
    let mut index = 0;
    loop {
        let attempt = Attempt {
            index,
            max_attempts,
        };
        let mut candidate = generate(rng)?;
        repair(&mut candidate, rng, attempt)?;

        match verify(&candidate) {
            Verdict::Accept => {
                debug!(
                    "{}: accepted candidate on attempt {}/{}",
                    policy.generator,
                    attempt.number(),
                    max_attempts
                );
                return Ok(Search::Accepted {
                    value: candidate,
                    attempts: attempt.number(),
                });
            }
            Verdict::Reject(reason) => {
                debug!(
                    "{}: attempt {}/{} rejected: {}",
                    policy.generator,
                    attempt.number(),
                    max_attempts,
                    reason
                );
                if attempt.is_final() {
                    return Ok(Search::Exhausted {
                        value: candidate,
                        attempts: attempt.number(),
                        reason,
                    });
                }
            }
        }
        index += 1;
    }
}
