//! # counterbalance
//!
//! Pseudorandomized trial sequences for task-switching and related
//! experiments.
//!
//! Every generator follows the same recipe: shuffle a layout with the right
//! symbol counts, repair local defects with bounded swaps, verify the result
//! and start over when verification fails. Randomness always comes in through
//! an explicit `&mut R: rand::Rng`, so seeded sources give reproducible
//! sequences.

pub mod binary;
pub mod config;
pub mod error;
pub mod generator;
pub mod instructions;
pub mod lag2;
pub mod no_repeat;
pub mod rematch;
pub mod repair;
pub mod sequence;
pub mod stimulus;
pub mod table;
pub mod ternary;

// Re-export core types for easy access
pub use binary::{balance_lag1, balance_lag1_labels, balance_lag1_with, BalancedSequence};
pub use config::GeneratorConfig;
pub use error::{SequenceError, SequenceResult};
pub use generator::SequenceGenerator;
pub use instructions::{navigate_instructions, InstructionDisplay, KeyBindings, NavigationOutcome};
pub use lag2::{balance_lag2, balance_lag2_labels, balance_lag2_with, zip_halves};
pub use no_repeat::{no_repeat_from_pool, no_repeat_from_pool_with, no_repeat_sequence, no_repeat_sequence_with};
pub use rematch::{reorder, reorder2, reorder_by_assignment};
pub use repair::{generate_repair_verify, Attempt, RetryPolicy, Search, Verdict};
pub use sequence::{count_transitions, has_adjacent_repeat, has_equal_counts, symbol_counts, Symbol, TransitionCounts};
pub use stimulus::{
    assign_stimuli, assign_stimuli_labeled, assign_stimuli_labeled_with, assign_stimuli_with, Assignment, LagMode,
    StimulusAssignment,
};
pub use table::{CellValue, TrialTable};
pub use ternary::{balance_ternary, balance_ternary_with, TernarySequence};
