//! Trial metadata tables.
//!
//! A `TrialTable` is the in-memory form of the spreadsheet an experiment
//! script keeps next to its sequences: one row per trial, named columns, and
//! scalar cells. Tables are immutable once handed to the re-matcher; it
//! builds a new table from the rows it picks.

use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SequenceError, SequenceResult};

/// One scalar cell
///
/// Matching compares variants strictly, so `Integer(3)` and `Float(3.0)` are
/// different values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(value) => write!(f, "{}", value),
            CellValue::Float(value) => write!(f, "{}", value),
            CellValue::Boolean(value) => write!(f, "{}", value),
            CellValue::Text(value) => write!(f, "{:?}", value),
        }
    }
}

macro_rules! integer_cells {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CellValue {
                fn from(value: $ty) -> Self {
                    CellValue::Integer(value as i64)
                }
            }
        )*
    };
}

integer_cells!(i8, i16, i32, i64, u8, u16, u32);

/// Unsigned types wider than `i32` convert fallibly; values above `i64::MAX`
/// have no integer cell.
macro_rules! wide_integer_cells {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<$ty> for CellValue {
                type Error = SequenceError;

                fn try_from(value: $ty) -> SequenceResult<Self> {
                    i64::try_from(value).map(CellValue::Integer).map_err(|_| {
                        SequenceError::invalid("value", format!("{} does not fit in an integer cell", value))
                    })
                }
            }
        )*
    };
}

wide_integer_cells!(u64, usize);

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// Named columns and rows of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRecord")]
pub struct TrialTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// Unchecked serde form of a table
#[derive(Deserialize)]
struct TableRecord {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<CellValue>>,
}

impl TryFrom<TableRecord> for TrialTable {
    type Error = SequenceError;

    fn try_from(record: TableRecord) -> SequenceResult<Self> {
        TrialTable::from_rows(record.columns, record.rows)
    }
}

impl TrialTable {
    /// Create an empty table. Column names must be unique.
    pub fn new<S: Into<String>>(columns: Vec<S>) -> SequenceResult<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(SequenceError::invalid(
                    "columns",
                    format!("column '{}' appears more than once", name),
                ));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<CellValue>>) -> SequenceResult<Self> {
        let mut table = Self::new(columns)?;
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row holding one value per column.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> SequenceResult<()> {
        if row.len() != self.columns.len() {
            return Err(SequenceError::invalid(
                "row",
                format!(
                    "row {} has {} values but the table has {} columns",
                    self.rows.len(),
                    row.len(),
                    self.columns.len()
                ),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub(crate) fn require_column(&self, name: &str) -> SequenceResult<usize> {
        self.column_index(name).ok_or_else(|| {
            SequenceError::invalid(
                "column",
                format!("unknown column '{}', the table has {:?}", name, self.columns),
            )
        })
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|cells| &cells[index])
    }

    /// All values of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> SequenceResult<Vec<CellValue>> {
        let index = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[index].clone()).collect())
    }

    /// A new table with the rows at `indices`, in that order.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    pub fn from_json(json: &str) -> SequenceResult<Self> {
        serde_json::from_str(json).map_err(|e| SequenceError::invalid("table", e.to_string()))
    }

    pub fn to_json(&self) -> SequenceResult<String> {
        serde_json::to_string(self).map_err(|e| SequenceError::invalid("table", e.to_string()))
    }
}
