//! Row re-matching.
//!
//! Generators only produce the columns they balance. The trial table carries
//! everything else (colours, response mappings, ids), so its rows are reordered
//! to follow the generated sequence: after a random shuffle of the row order,
//! each target position takes the first unused row whose matched column(s)
//! carry the requested value(s).

use std::collections::HashSet;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{SequenceError, SequenceResult};
use crate::stimulus::StimulusAssignment;
use crate::table::{CellValue, TrialTable};

/// One matched column and the value it must carry at every position
struct Criterion {
    column: usize,
    targets: Vec<CellValue>,
}

/// Reorder `table` so that `column` follows `sequence`.
pub fn reorder<V, R>(sequence: &[V], table: &TrialTable, column: &str, rng: &mut R) -> SequenceResult<TrialTable>
where
    V: Clone + Into<CellValue>,
    R: Rng + ?Sized,
{
    let criteria = vec![criterion(table, column, sequence)?];
    match_rows(table, &criteria, rng)
}

/// Reorder `table` so that `col1` follows `seq1` and `col2` follows `seq2`.
pub fn reorder2<V1, V2, R>(
    table: &TrialTable,
    col1: &str,
    seq1: &[V1],
    col2: &str,
    seq2: &[V2],
    rng: &mut R,
) -> SequenceResult<TrialTable>
where
    V1: Clone + Into<CellValue>,
    V2: Clone + Into<CellValue>,
    R: Rng + ?Sized,
{
    let criteria = vec![criterion(table, col1, seq1)?, criterion(table, col2, seq2)?];
    match_rows(table, &criteria, rng)
}

/// Reorder `table` to follow both columns of a stimulus assignment.
pub fn reorder_by_assignment<K, S, R>(
    table: &TrialTable,
    task_column: &str,
    stimulus_column: &str,
    assignment: &StimulusAssignment<K, S>,
    rng: &mut R,
) -> SequenceResult<TrialTable>
where
    K: Clone + Into<CellValue>,
    S: Clone + Into<CellValue>,
    R: Rng + ?Sized,
{
    reorder2(
        table,
        task_column,
        &assignment.tasks(),
        stimulus_column,
        &assignment.stimuli(),
        rng,
    )
}

fn criterion<V: Clone + Into<CellValue>>(table: &TrialTable, column: &str, sequence: &[V]) -> SequenceResult<Criterion> {
    let column = table.require_column(column)?;
    if sequence.len() != table.len() {
        return Err(SequenceError::invalid(
            "sequence",
            format!(
                "sequence has {} values but the table has {} rows",
                sequence.len(),
                table.len()
            ),
        ));
    }
    Ok(Criterion {
        column,
        targets: sequence.iter().cloned().map(Into::into).collect(),
    })
}

fn match_rows<R: Rng + ?Sized>(table: &TrialTable, criteria: &[Criterion], rng: &mut R) -> SequenceResult<TrialTable> {
    let rows = table.rows();
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.shuffle(rng);

    let mut consumed = HashSet::with_capacity(rows.len());
    let mut picked = Vec::with_capacity(rows.len());
    for position in 0..rows.len() {
        let found = order.iter().copied().find(|index| {
            !consumed.contains(index)
                && criteria
                    .iter()
                    .all(|c| rows[*index][c.column] == c.targets[position])
        });
        match found {
            Some(index) => {
                consumed.insert(index);
                picked.push(index);
            }
            None => {
                return Err(SequenceError::NoMatchingRow {
                    position,
                    criteria: describe(table, criteria, position),
                });
            }
        }
    }

    debug!("re-matched {} rows on {} column(s)", picked.len(), criteria.len());
    Ok(table.select(&picked))
}

fn describe(table: &TrialTable, criteria: &[Criterion], position: usize) -> String {
    criteria
        .iter()
        .map(|c| format!("{} = {}", table.columns()[c.column], c.targets[position]))
        .collect::<Vec<_>>()
        .join(" and ")
}
