//! Scalar cell values and row helpers shared by every stage of the engine.
//!
//! A [`Cell`] is what a row source hands over for one grid position: text, a
//! number, a boolean, or nothing. Rows are plain `Vec<Cell>`; a row shorter
//! than its neighbours is read as if right-padded with [`Cell::Null`].

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

pub type Row = Vec<Cell>;

static NULL_CELL: Cell = Cell::Null;

impl Cell {
    /// Null, or a string that is empty once whitespace is trimmed.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// A number, or a string that parses as a finite number.
    pub fn is_numeric(&self) -> bool {
        match self {
            Cell::Int(_) | Cell::Float(_) => true,
            Cell::String(s) => looks_numeric(s),
            Cell::Null | Cell::Bool(_) => false,
        }
    }

    /// Free text: a non-blank string that is not itself numeric.
    pub fn is_text(&self) -> bool {
        match self {
            Cell::String(s) => !s.trim().is_empty() && !looks_numeric(s),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Null => Cow::Borrowed(""),
            Cell::String(s) => Cow::Borrowed(s.as_str()),
            Cell::Bool(b) => Cow::Owned(b.to_string()),
            Cell::Int(i) => Cow::Owned(i.to_string()),
            Cell::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Cow::Owned((*f as i64).to_string())
                } else {
                    Cow::Owned(f.to_string())
                }
            }
        }
    }
}

fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed
        .parse::<f64>()
        .map(|parsed| parsed.is_finite())
        .unwrap_or(false)
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Cell at `index`, reading past the end of the row as blank.
pub fn cell_at(row: &[Cell], index: usize) -> &Cell {
    row.get(index).unwrap_or(&NULL_CELL)
}

pub fn row_is_blank(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

pub fn non_blank_count(row: &[Cell]) -> usize {
    row.iter().filter(|cell| !cell.is_blank()).count()
}

/// Widest row in `rows`, the nominal width shorter rows are padded to.
pub fn max_width(rows: &[Row]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}

/// Builds a row from anything convertible to cells; handy for tests and fixtures.
pub fn row_of<I, T>(values: I) -> Row
where
    I: IntoIterator<Item = T>,
    T: Into<Cell>,
{
    values.into_iter().map(Into::into).collect()
}
