//! Value cascading for merged-cell style documents.
//!
//! Two flavours exist:
//!
//! - **Header cascading** fills blank header cells from the last label seen to
//!   their left, reconstructing a parent label that visually spans several
//!   child columns. A column that is blank in every row of the header window is
//!   a hard break (a spacer column) and resets the carried label.
//! - **Row cascading** fills blank data cells from the last value seen above
//!   them in the same column, reconstructing group keys that exporters only
//!   write on the first row of each group. A wholly blank row ends every group.

use crate::{
    cell::{Cell, Row, cell_at, max_width, row_is_blank},
    classify::HeaderClassifier,
};

/// Fills blank header cells left-to-right within each header-like row.
///
/// Only the first `window` rows are considered; rows beyond it and rows the
/// classifier rejects pass through unchanged. Cascaded rows are padded to the
/// widest row in the window.
pub fn cascade_headers(rows: &[Row], classifier: &HeaderClassifier, window: usize) -> Vec<Row> {
    let considered = &rows[..rows.len().min(window)];
    let width = max_width(considered);
    let spacer_columns: Vec<bool> = (0..width)
        .map(|col| considered.iter().all(|row| cell_at(row, col).is_blank()))
        .collect();

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            if idx >= considered.len() || !classifier.is_likely_header_row(row) {
                row.clone()
            } else {
                cascade_header_row(row, &spacer_columns)
            }
        })
        .collect()
}

fn cascade_header_row(row: &[Cell], spacer_columns: &[bool]) -> Row {
    let mut last: Option<&Cell> = None;
    spacer_columns
        .iter()
        .enumerate()
        .map(|(col, &spacer)| {
            let cell = cell_at(row, col);
            if spacer {
                last = None;
                cell.clone()
            } else if cell.is_blank() {
                last.unwrap_or(cell).clone()
            } else {
                last = Some(cell);
                cell.clone()
            }
        })
        .collect()
}

/// Streaming row cascade over data rows.
pub struct RowCascade<I> {
    inner: I,
    last: Vec<Option<Cell>>,
}

impl<I> RowCascade<I>
where
    I: Iterator<Item = Row>,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            last: Vec::new(),
        }
    }
}

impl<I> Iterator for RowCascade<I>
where
    I: Iterator<Item = Row>,
{
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let mut row = self.inner.next()?;
        if row_is_blank(&row) {
            self.last.clear();
            return Some(row);
        }
        let carried = self.last.iter().rposition(Option::is_some).map_or(0, |p| p + 1);
        if row.len() < carried {
            row.resize(carried, Cell::Null);
        }
        if self.last.len() < row.len() {
            self.last.resize(row.len(), None);
        }
        for (cell, last) in row.iter_mut().zip(self.last.iter_mut()) {
            if cell.is_blank() {
                if let Some(value) = last {
                    *cell = value.clone();
                }
            } else {
                *last = Some(cell.clone());
            }
        }
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Eager form of [`RowCascade`].
pub fn cascade_rows(rows: Vec<Row>) -> Vec<Row> {
    RowCascade::new(rows.into_iter()).collect()
}
