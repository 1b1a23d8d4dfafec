//! Canonical capture model.
//!
//! A [`SheetCapture`] is the format-independent result of parsing one sheet:
//! unique column keys plus one [`Record`] per data row. A [`WorkbookCapture`]
//! groups sheet captures by name in insertion order. Both serialize to the
//! JSON shape downstream importers consume.

use std::{fmt, slice::Chunks};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    cell::Cell,
    error::{CaptureError, Result},
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellEntry {
    pub value: Cell,
}

impl From<Cell> for CellEntry {
    fn from(value: Cell) -> Self {
        Self { value }
    }
}

/// One data row keyed by column key, in header order.
pub type Record = IndexMap<String, CellEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CaptureWarning {
    /// No row looked like a header; row 0 was used.
    AmbiguousStructure { searched: usize },
    /// Rows whose width differed from the header; they were padded or truncated.
    RowShapeMismatch {
        rows: usize,
        first_row: usize,
        expected: usize,
    },
}

impl fmt::Display for CaptureWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureWarning::AmbiguousStructure { searched } => write!(
                f,
                "no header-like row in the first {searched} row(s); row 0 was used as the header"
            ),
            CaptureWarning::RowShapeMismatch {
                rows,
                first_row,
                expected,
            } => write!(
                f,
                "{rows} row(s) did not match the {expected}-column header (first at source row {first_row})"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    /// Source row indices consumed as header rows.
    pub row_headers: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CaptureWarning>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SheetCapture {
    pub headers: Vec<String>,
    pub data: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<IndexMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<IndexMap<String, Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CaptureMetadata>,
}

impl SheetCapture {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.data.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn record_count(&self) -> usize {
        self.data.len()
    }

    pub fn value(&self, row: usize, key: &str) -> Option<&Cell> {
        self.data
            .get(row)
            .and_then(|record| record.get(key))
            .map(|entry| &entry.value)
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.required
            .as_ref()
            .and_then(|flags| flags.get(key).copied())
            .unwrap_or(false)
    }

    pub fn description(&self, key: &str) -> Option<&str> {
        self.descriptions
            .as_ref()
            .and_then(|descriptions| descriptions.get(key))
            .and_then(|description| description.as_deref())
    }

    pub fn warnings(&self) -> &[CaptureWarning] {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.warnings.as_slice())
            .unwrap_or_default()
    }

    /// Records in consecutive batches of `size` for downstream insertion.
    pub fn batches(&self, size: usize) -> Result<Chunks<'_, Record>> {
        if size == 0 {
            return Err(CaptureError::config("batch size must be at least 1"));
        }
        Ok(self.data.chunks(size))
    }
}

/// Sheet captures keyed by unique sheet name, in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkbookCapture {
    sheets: IndexMap<String, SheetCapture>,
}

impl WorkbookCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, sheet: SheetCapture) -> Result<()> {
        let name = name.into();
        if self.sheets.contains_key(&name) {
            return Err(CaptureError::DuplicateSheet { name });
        }
        self.sheets.insert(name, sheet);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SheetCapture> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SheetCapture)> {
        self.sheets
            .iter()
            .map(|(name, sheet)| (name.as_str(), sheet))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn into_sheets(self) -> IndexMap<String, SheetCapture> {
        self.sheets
    }
}
