//! Error taxonomy shared by every generator and by the row re-matcher.
//!
//! Three failure classes exist and callers are expected to treat them
//! differently:
//!
//! - [`SequenceError::InvalidArgument`] is a caller error detected at entry,
//!   before any randomness is consumed. Retrying cannot help.
//! - [`SequenceError::BalanceFailure`] means a randomized repair search ran out
//!   of its retry budget. Outcomes are random, so calling again may succeed.
//! - [`SequenceError::NoMatchingRow`] means a generated sequence asks for a
//!   value the trial table does not (or no longer) contain. This is a logic
//!   error in the calling script and is never retried.

use std::fmt;

/// Errors raised while generating or re-matching trial sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Malformed length, alphabet, symbol set, column or table
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },
    /// The repair search exhausted its retry budget
    BalanceFailure {
        generator: &'static str,
        attempts: usize,
        reason: String,
    },
    /// No remaining table row carries the value(s) requested at `position`
    NoMatchingRow { position: usize, criteria: String },
}

impl SequenceError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        SequenceError::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn balance_failure(
        generator: &'static str,
        attempts: usize,
        reason: impl Into<String>,
    ) -> Self {
        SequenceError::BalanceFailure {
            generator,
            attempts,
            reason: reason.into(),
        }
    }

    /// Whether calling the same operation again can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SequenceError::BalanceFailure { .. })
    }
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceError::InvalidArgument { parameter, reason } => {
                write!(f, "Invalid argument '{}': {}", parameter, reason)
            }
            SequenceError::BalanceFailure {
                generator,
                attempts,
                reason,
            } => write!(
                f,
                "{} could not balance the sequence in {} attempts: {}",
                generator, attempts, reason
            ),
            SequenceError::NoMatchingRow { position, criteria } => write!(
                f,
                "No remaining row matches {} at sequence position {}",
                criteria, position
            ),
        }
    }
}

impl std::error::Error for SequenceError {}

/// Result type for sequence generation and re-matching
pub type SequenceResult<T> = Result<T, SequenceError>;
