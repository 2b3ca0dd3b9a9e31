//! Stimulus-within-task assignment.
//!
//! Pairs a balanced two-task sequence with stimuli so that every stimulus
//! occurs equally often under each task and no stimulus is shown on two
//! consecutive trials. Stimuli only ever move between rows of the same task;
//! the task sequence comes out exactly as it was generated.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::binary::balance_lag1_with;
use crate::config::GeneratorConfig;
use crate::error::{SequenceError, SequenceResult};
use crate::lag2::balance_lag2_with;
use crate::no_repeat::{separate_adjacent_repeats, verify_no_adjacent_repeat};
use crate::repair::{generate_repair_verify, Attempt, RetryPolicy, Verdict};
use crate::sequence::{blocked_layout, has_equal_counts, validate_alphabet, validate_divisible, validate_even_length, Symbol};
use crate::table::{CellValue, TrialTable};

const GENERATOR: &str = "assign_stimuli";
const TASKS: [u8; 2] = [0, 1];

/// Which lag the task sequence is balanced at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LagMode {
    Lag1,
    Lag2,
}

impl Default for LagMode {
    fn default() -> Self {
        LagMode::Lag1
    }
}

impl LagMode {
    /// Parse the numeric lag, `1` or `2`.
    pub fn from_lag(lag: usize) -> SequenceResult<Self> {
        match lag {
            1 => Ok(LagMode::Lag1),
            2 => Ok(LagMode::Lag2),
            other => Err(SequenceError::invalid(
                "lag_mode",
                format!("lag must be 1 or 2, got {}", other),
            )),
        }
    }

    pub fn lag(&self) -> usize {
        match self {
            LagMode::Lag1 => 1,
            LagMode::Lag2 => 2,
        }
    }
}

/// One trial: the task and the stimulus shown with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment<K, S> {
    pub task: K,
    pub stimulus: S,
}

/// Ordered task/stimulus rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusAssignment<K, S> {
    rows: Vec<Assignment<K, S>>,
}

impl<K, S> StimulusAssignment<K, S> {
    pub fn rows(&self) -> &[Assignment<K, S>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<K: Clone, S: Clone> StimulusAssignment<K, S> {
    pub fn tasks(&self) -> Vec<K> {
        self.rows.iter().map(|row| row.task.clone()).collect()
    }

    pub fn stimuli(&self) -> Vec<S> {
        self.rows.iter().map(|row| row.stimulus.clone()).collect()
    }

    /// Export as a two-column table.
    pub fn to_table(&self, task_column: &str, stimulus_column: &str) -> SequenceResult<TrialTable>
    where
        K: Into<CellValue>,
        S: Into<CellValue>,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| vec![row.task.clone().into(), row.stimulus.clone().into()])
            .collect();
        TrialTable::from_rows(vec![task_column, stimulus_column], rows)
    }
}

impl<S> StimulusAssignment<u8, S> {
    /// Replace task code `0` with `task0` and code `1` with `task1`.
    pub fn with_task_labels<L: Clone>(self, task0: L, task1: L) -> StimulusAssignment<L, S> {
        let rows = self
            .rows
            .into_iter()
            .map(|row| Assignment {
                task: if row.task == 0 { task0.clone() } else { task1.clone() },
                stimulus: row.stimulus,
            })
            .collect();
        StimulusAssignment { rows }
    }
}

/// Work-in-progress assignment. Repair only reads `tasks`, so the task
/// sequence leaves the search exactly as it was generated.
#[derive(Debug, Clone)]
struct Candidate<S> {
    tasks: Vec<u8>,
    stimuli: Vec<S>,
}

pub fn assign_stimuli<S, R>(
    length: usize,
    stimuli: &[S],
    lag_mode: LagMode,
    rng: &mut R,
) -> SequenceResult<StimulusAssignment<u8, S>>
where
    S: Symbol,
    R: Rng + ?Sized,
{
    assign_stimuli_with(length, stimuli, lag_mode, &GeneratorConfig::default(), rng)
}

/// Like [`assign_stimuli`], with caller labels for the two tasks.
pub fn assign_stimuli_labeled<K, S, R>(
    length: usize,
    stimuli: &[S],
    task0: K,
    task1: K,
    lag_mode: LagMode,
    rng: &mut R,
) -> SequenceResult<StimulusAssignment<K, S>>
where
    K: Symbol,
    S: Symbol,
    R: Rng + ?Sized,
{
    assign_stimuli_labeled_with(length, stimuli, task0, task1, lag_mode, &GeneratorConfig::default(), rng)
}

pub fn assign_stimuli_labeled_with<K, S, R>(
    length: usize,
    stimuli: &[S],
    task0: K,
    task1: K,
    lag_mode: LagMode,
    config: &GeneratorConfig,
    rng: &mut R,
) -> SequenceResult<StimulusAssignment<K, S>>
where
    K: Symbol,
    S: Symbol,
    R: Rng + ?Sized,
{
    if task0 == task1 {
        return Err(SequenceError::invalid(
            "tasks",
            format!("the two task labels must differ, both are {:?}", task0),
        ));
    }
    assign_stimuli_with(length, stimuli, lag_mode, config, rng)
        .map(|assignment| assignment.with_task_labels(task0, task1))
}

pub fn assign_stimuli_with<S, R>(
    length: usize,
    stimuli: &[S],
    lag_mode: LagMode,
    config: &GeneratorConfig,
    rng: &mut R,
) -> SequenceResult<StimulusAssignment<u8, S>>
where
    S: Symbol,
    R: Rng + ?Sized,
{
    validate_even_length(length)?;
    validate_alphabet(stimuli)?;
    validate_divisible("stimuli", length / 2, stimuli.len())?;

    let per_task = blocked_layout(stimuli, length / 2 / stimuli.len());
    let policy = RetryPolicy::new(GENERATOR, config.stimulus_retries);

    let candidate = generate_repair_verify(
        rng,
        &policy,
        |rng| {
            let tasks = match lag_mode {
                LagMode::Lag1 => balance_lag1_with(length, 0u8, 1u8, config, rng)?.symbols,
                LagMode::Lag2 => balance_lag2_with(length, 0u8, 1u8, config, rng)?,
            };
            let stimuli = lay_out_stimuli(&tasks, &per_task, rng);
            Ok(Candidate { tasks, stimuli })
        },
        |candidate, _rng, attempt| repair_within_tasks(candidate, attempt),
        |candidate| verify_assignment(candidate, stimuli),
    )?
    .into_result(GENERATOR)?;

    let rows = candidate
        .tasks
        .into_iter()
        .zip(candidate.stimuli)
        .map(|(task, stimulus)| Assignment { task, stimulus })
        .collect();
    Ok(StimulusAssignment { rows })
}

/// Separate adjacent stimulus repeats, swapping stimuli only between rows of
/// the same task.
fn repair_within_tasks<S: Symbol>(candidate: &mut Candidate<S>, attempt: Attempt) -> SequenceResult<()> {
    let tasks: &[u8] = &candidate.tasks;
    separate_adjacent_repeats(
        &mut candidate.stimuli,
        |ind, offending| tasks[ind] == tasks[offending],
        attempt,
        GENERATOR,
    )
}

/// Fill the rows of each task, in order, from an independent shuffle of
/// `per_task`.
fn lay_out_stimuli<S: Symbol, R: Rng + ?Sized>(tasks: &[u8], per_task: &[S], rng: &mut R) -> Vec<S> {
    let mut columns: Vec<std::vec::IntoIter<S>> = TASKS
        .iter()
        .map(|_| {
            let mut shuffled = per_task.to_vec();
            shuffled.shuffle(rng);
            shuffled.into_iter()
        })
        .collect();
    tasks
        .iter()
        .filter_map(|&task| columns[task as usize].next())
        .collect()
}

fn verify_assignment<S: Symbol>(candidate: &Candidate<S>, alphabet: &[S]) -> Verdict {
    for &task in TASKS.iter() {
        let shown: Vec<S> = candidate
            .tasks
            .iter()
            .zip(&candidate.stimuli)
            .filter(|(t, _)| **t == task)
            .map(|(_, s)| s.clone())
            .collect();
        if !has_equal_counts(&shown, alphabet) {
            return Verdict::Reject(format!("stimuli are not equally represented in task {}", task));
        }
    }
    verify_no_adjacent_repeat(&candidate.stimuli)
}
