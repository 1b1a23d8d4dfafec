//! Table assembly: pairs normalized headers with data rows.
//!
//! Rows are consumed as a stream. Cells past the header width are dropped,
//! missing cells read as blank, and wholly blank rows at the end of the stream
//! are trimmed rather than emitted as empty records. Width mismatches either
//! abort ([`ShapePolicy::Strict`]) or are summarised as a warning.

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    capture::{CaptureMetadata, CaptureWarning, CellEntry, Record, SheetCapture},
    cell::{Cell, Row, row_is_blank},
    error::{CaptureError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapePolicy {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblyStats {
    pub rows_read: usize,
    pub trailing_blank_rows: usize,
    pub mismatched_rows: usize,
    /// Non-blank cells dropped because they sat past the last header.
    pub truncated_cells: usize,
}

#[derive(Debug, Default)]
pub struct TableAssembler {
    policy: ShapePolicy,
    debug: bool,
    row_offset: usize,
    row_headers: Option<Vec<usize>>,
    required: Option<IndexMap<String, bool>>,
    descriptions: Option<IndexMap<String, Option<String>>>,
    warnings: Vec<CaptureWarning>,
}

impl TableAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: ShapePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Source index of the first data row, used in diagnostics.
    pub fn row_offset(mut self, offset: usize) -> Self {
        self.row_offset = offset;
        self
    }

    pub fn track_row_headers(mut self, indices: Vec<usize>) -> Self {
        self.row_headers = Some(indices);
        self
    }

    pub fn required(mut self, required: IndexMap<String, bool>) -> Self {
        self.required = Some(required);
        self
    }

    pub fn descriptions(mut self, descriptions: IndexMap<String, Option<String>>) -> Self {
        self.descriptions = Some(descriptions);
        self
    }

    pub fn warning(mut self, warning: CaptureWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn assemble<I>(self, headers: Vec<String>, rows: I) -> Result<(SheetCapture, AssemblyStats)>
    where
        I: IntoIterator<Item = Row>,
    {
        let width = headers.len();
        let mut stats = AssemblyStats::default();
        let mut data: Vec<Record> = Vec::new();
        let mut pending_blank: Vec<Record> = Vec::new();
        let mut first_mismatch: Option<usize> = None;

        for (idx, row) in rows.into_iter().enumerate() {
            stats.rows_read += 1;
            let source_row = self.row_offset + idx;
            let blank = row_is_blank(&row);

            if !blank && row.len() != width {
                if self.policy == ShapePolicy::Strict {
                    return Err(CaptureError::RowShapeMismatch {
                        row: source_row,
                        expected: width,
                        actual: row.len(),
                    });
                }
                stats.mismatched_rows += 1;
                first_mismatch.get_or_insert(source_row);
            }
            if row.len() > width {
                let dropped = row[width..].iter().filter(|cell| !cell.is_blank()).count();
                if dropped > 0 {
                    stats.truncated_cells += dropped;
                    if self.debug {
                        warn!("Row {source_row}: dropped {dropped} cell(s) beyond the {width} header column(s)");
                    }
                }
            }

            let record = to_record(&headers, row);
            if blank {
                pending_blank.push(record);
            } else {
                data.append(&mut pending_blank);
                data.push(record);
            }
        }
        stats.trailing_blank_rows = pending_blank.len();

        let mut warnings = self.warnings;
        if let Some(first_row) = first_mismatch {
            warnings.push(CaptureWarning::RowShapeMismatch {
                rows: stats.mismatched_rows,
                first_row,
                expected: width,
            });
        }

        if self.debug {
            info!(
                "Assembled {} record(s) from {} row(s); trimmed {} trailing blank row(s), {} ragged row(s), {} truncated cell(s)",
                data.len(),
                stats.rows_read,
                stats.trailing_blank_rows,
                stats.mismatched_rows,
                stats.truncated_cells
            );
        } else {
            debug!(
                "Assembled {} record(s) from {} row(s)",
                data.len(),
                stats.rows_read
            );
        }

        let metadata = match (self.row_headers, warnings.is_empty()) {
            (None, true) => None,
            (row_headers, _) => Some(CaptureMetadata {
                row_headers: row_headers.unwrap_or_default(),
                warnings,
            }),
        };

        let capture = SheetCapture {
            required: self.required.map(|flags| retain_known(flags, &headers)),
            descriptions: self.descriptions.map(|texts| retain_known(texts, &headers)),
            headers,
            data,
            metadata,
        };
        Ok((capture, stats))
    }
}

fn to_record(headers: &[String], row: Row) -> Record {
    let mut cells = row.into_iter();
    headers
        .iter()
        .map(|header| {
            let value = cells.next().unwrap_or(Cell::Null);
            (header.clone(), CellEntry { value })
        })
        .collect()
}

fn retain_known<V>(mut map: IndexMap<String, V>, headers: &[String]) -> IndexMap<String, V> {
    map.retain(|key, _| headers.contains(key));
    map
}
