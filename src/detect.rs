//! Header-row detection.
//!
//! Detection runs over a bounded, already-buffered prefix of a sheet's rows and
//! decides which rows hold column labels and how many leading rows to discard
//! before data begins. The algorithm is chosen by [`HeaderDetectionOptions`], a
//! closed set of variants with one handler each.
//!
//! ## Algorithms
//!
//! - `default`: first header-like row within `rowsToSearch` (20 when unset).
//!   When none qualifies, row 0 is used and the result is flagged ambiguous,
//!   unless the caller asked for [`AmbiguityPolicy::Reject`].
//! - `explicitHeaders`: labels come from the caller; row content is ignored.
//! - `specificRows`: caller-chosen 0-based rows, in the order given.
//! - `dataRowAndSubHeaderDetection`: a run of consecutive header-like rows (at
//!   most the cascade window) from the top of the sheet. When row 0 is not
//!   header-like this is the `default` algorithm.
//! - `aiDetection` / `newfangled`: delegated to an [`ExternalDetector`].

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    cell::{Cell, Row},
    classify::HeaderClassifier,
    error::{CaptureError, Result},
};

pub const DEFAULT_ROWS_TO_SEARCH: usize = 20;
pub const DEFAULT_CASCADE_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "algorithm",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum HeaderDetectionOptions {
    Default {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows_to_search: Option<usize>,
    },
    ExplicitHeaders {
        headers: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skip: Option<usize>,
    },
    SpecificRows {
        rows: Vec<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skip: Option<usize>,
    },
    DataRowAndSubHeaderDetection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows_to_search: Option<usize>,
    },
    AiDetection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows_to_search: Option<usize>,
    },
    Newfangled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows_to_search: Option<usize>,
    },
}

impl Default for HeaderDetectionOptions {
    fn default() -> Self {
        HeaderDetectionOptions::Default {
            rows_to_search: None,
        }
    }
}

impl HeaderDetectionOptions {
    pub fn name(&self) -> &'static str {
        match self {
            HeaderDetectionOptions::Default { .. } => "default",
            HeaderDetectionOptions::ExplicitHeaders { .. } => "explicitHeaders",
            HeaderDetectionOptions::SpecificRows { .. } => "specificRows",
            HeaderDetectionOptions::DataRowAndSubHeaderDetection { .. } => {
                "dataRowAndSubHeaderDetection"
            }
            HeaderDetectionOptions::AiDetection { .. } => "aiDetection",
            HeaderDetectionOptions::Newfangled { .. } => "newfangled",
        }
    }

    fn rows_to_search(&self) -> Option<Option<usize>> {
        match self {
            HeaderDetectionOptions::Default { rows_to_search }
            | HeaderDetectionOptions::DataRowAndSubHeaderDetection { rows_to_search }
            | HeaderDetectionOptions::AiDetection { rows_to_search }
            | HeaderDetectionOptions::Newfangled { rows_to_search } => Some(*rows_to_search),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(Some(0)) = self.rows_to_search() {
            return Err(CaptureError::config(format!(
                "rowsToSearch for '{}' must be at least 1",
                self.name()
            )));
        }
        match self {
            HeaderDetectionOptions::ExplicitHeaders { headers, .. } if headers.is_empty() => Err(
                CaptureError::config("explicitHeaders requires at least one header label"),
            ),
            HeaderDetectionOptions::SpecificRows { rows, .. } if rows.is_empty() => Err(
                CaptureError::config("specificRows requires at least one row number"),
            ),
            _ => Ok(()),
        }
    }

    /// Number of leading rows the detector needs buffered to decide.
    pub fn read_ahead(&self) -> usize {
        match self {
            HeaderDetectionOptions::ExplicitHeaders { .. } => 0,
            HeaderDetectionOptions::SpecificRows { rows, .. } => {
                rows.iter().max().map(|max| max + 1).unwrap_or(0)
            }
            other => other
                .rows_to_search()
                .flatten()
                .unwrap_or(DEFAULT_ROWS_TO_SEARCH),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmbiguityPolicy {
    /// Use row 0 as the header and report a warning.
    #[default]
    FirstRow,
    /// Fail with [`CaptureError::AmbiguousStructure`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderDetection {
    pub header_rows: Vec<Row>,
    /// Source indices of `header_rows`; empty for caller-supplied labels.
    pub row_indices: Vec<usize>,
    pub skip: usize,
    pub scanned: usize,
    /// Set when no row qualified and row 0 was used as a fallback.
    pub ambiguous: bool,
}

impl HeaderDetection {
    fn from_indices(rows: &[Row], indices: Vec<usize>, skip: usize, scanned: usize) -> Self {
        let header_rows = indices.iter().map(|&idx| rows[idx].clone()).collect();
        Self {
            header_rows,
            row_indices: indices,
            skip,
            scanned,
            ambiguous: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.header_rows.is_empty()
    }
}

/// Decision procedure for the opaque algorithms (`aiDetection`, `newfangled`).
///
/// Implementations receive the same buffered prefix the built-in algorithms see
/// and must return a detection whose indices lie inside it.
pub trait ExternalDetector {
    fn detect(&self, options: &HeaderDetectionOptions, rows: &[Row]) -> Result<HeaderDetection>;
}

pub struct HeaderDetector<'a> {
    options: &'a HeaderDetectionOptions,
    classifier: HeaderClassifier,
    window: usize,
    ambiguity: AmbiguityPolicy,
    external: Option<&'a dyn ExternalDetector>,
}

impl<'a> HeaderDetector<'a> {
    pub fn new(options: &'a HeaderDetectionOptions) -> Self {
        Self {
            options,
            classifier: HeaderClassifier::default(),
            window: DEFAULT_CASCADE_WINDOW,
            ambiguity: AmbiguityPolicy::default(),
            external: None,
        }
    }

    pub fn classifier(mut self, classifier: HeaderClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn ambiguity(mut self, ambiguity: AmbiguityPolicy) -> Self {
        self.ambiguity = ambiguity;
        self
    }

    pub fn external(mut self, external: &'a dyn ExternalDetector) -> Self {
        self.external = Some(external);
        self
    }

    /// Runs the configured algorithm over `rows`, the buffered sheet prefix.
    pub fn detect(&self, rows: &[Row]) -> Result<HeaderDetection> {
        self.options.validate()?;
        if self.window == 0 {
            return Err(CaptureError::config("cascadeWindow must be at least 1"));
        }

        let detection = match self.options {
            HeaderDetectionOptions::ExplicitHeaders { headers, skip } => HeaderDetection {
                header_rows: vec![headers.iter().map(|h| Cell::from(h.as_str())).collect()],
                row_indices: Vec::new(),
                skip: skip.unwrap_or(0),
                scanned: 0,
                ambiguous: false,
            },
            _ if rows.is_empty() => HeaderDetection::default(),
            HeaderDetectionOptions::SpecificRows { rows: indices, skip } => {
                self.detect_specific(rows, indices, *skip)?
            }
            HeaderDetectionOptions::Default { rows_to_search } => {
                self.detect_default(rows, bound(*rows_to_search))?
            }
            HeaderDetectionOptions::DataRowAndSubHeaderDetection { rows_to_search } => {
                self.detect_with_sub_headers(rows, bound(*rows_to_search))?
            }
            HeaderDetectionOptions::AiDetection { .. }
            | HeaderDetectionOptions::Newfangled { .. } => self.delegate(rows)?,
        };

        debug!(
            "Header detection '{}' scanned {} row(s): header rows {:?}, skip {}",
            self.options.name(),
            detection.scanned,
            detection.row_indices,
            detection.skip
        );
        Ok(detection)
    }

    fn detect_default(&self, rows: &[Row], rows_to_search: usize) -> Result<HeaderDetection> {
        let limit = rows_to_search.min(rows.len());
        match self.first_header_within(rows, limit) {
            Some(idx) => Ok(HeaderDetection::from_indices(rows, vec![idx], idx + 1, idx + 1)),
            None => self.fallback(rows, limit),
        }
    }

    fn detect_with_sub_headers(
        &self,
        rows: &[Row],
        rows_to_search: usize,
    ) -> Result<HeaderDetection> {
        let end = self.window.min(rows_to_search).min(rows.len());
        let indices: Vec<usize> = (0..end)
            .take_while(|&idx| self.classifier.is_likely_header_row(&rows[idx]))
            .collect();
        if indices.is_empty() {
            return self.detect_default(rows, rows_to_search);
        }
        let skip = indices.len();
        let scanned = (skip + 1).min(end);
        Ok(HeaderDetection::from_indices(rows, indices, skip, scanned))
    }

    fn detect_specific(
        &self,
        rows: &[Row],
        indices: &[usize],
        skip: Option<usize>,
    ) -> Result<HeaderDetection> {
        if let Some(&missing) = indices.iter().find(|&&idx| idx >= rows.len()) {
            return Err(CaptureError::config(format!(
                "specificRows references row {missing} but the sheet only has {} row(s)",
                rows.len()
            )));
        }
        let last = indices.iter().max().copied().unwrap_or(0);
        let skip = skip.unwrap_or(last + 1);
        Ok(HeaderDetection::from_indices(
            rows,
            indices.to_vec(),
            skip,
            last + 1,
        ))
    }

    fn delegate(&self, rows: &[Row]) -> Result<HeaderDetection> {
        let external = self.external.ok_or_else(|| {
            CaptureError::config(format!(
                "'{}' detection requires an external detector",
                self.options.name()
            ))
        })?;
        let detection = external.detect(self.options, rows)?;
        if let Some(&bad) = detection.row_indices.iter().find(|&&idx| idx >= rows.len()) {
            return Err(CaptureError::config(format!(
                "external detector returned row {bad} outside the {} buffered row(s)",
                rows.len()
            )));
        }
        Ok(detection)
    }

    fn first_header_within(&self, rows: &[Row], limit: usize) -> Option<usize> {
        rows[..limit]
            .iter()
            .position(|row| self.classifier.is_likely_header_row(row))
    }

    fn fallback(&self, rows: &[Row], searched: usize) -> Result<HeaderDetection> {
        match self.ambiguity {
            AmbiguityPolicy::Reject => Err(CaptureError::AmbiguousStructure { searched }),
            AmbiguityPolicy::FirstRow => {
                let mut detection = HeaderDetection::from_indices(rows, vec![0], 1, searched);
                detection.ambiguous = true;
                Ok(detection)
            }
        }
    }
}

fn bound(rows_to_search: Option<usize>) -> usize {
    rows_to_search.unwrap_or(DEFAULT_ROWS_TO_SEARCH)
}
