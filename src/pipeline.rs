//! End-to-end capture of one sheet or a whole workbook.
//!
//! ```text
//! RowSource ─► ReadAhead ─► HeaderDetector ─► cascade_headers (multi-row)
//!                 │                                  │
//!                 │                           header_labels ─► normalize_labels
//!                 ▼                                  │
//!            remaining rows ─► RowCascade (opt) ─► TableAssembler ─► SheetCapture
//! ```
//!
//! Every call owns its rows and output; nothing is shared between parses, so
//! identical input and options always produce identical captures.

use indexmap::IndexMap;
use itertools::process_results;
use log::{debug, info, warn};

use crate::{
    assemble::{AssemblyStats, TableAssembler},
    capture::{CaptureWarning, SheetCapture, WorkbookCapture},
    cascade::{RowCascade, cascade_headers},
    cell::Row,
    detect::{ExternalDetector, HeaderDetection, HeaderDetector},
    error::Result,
    normalize::{NormalizedLabel, header_labels, normalize_labels},
    options::CaptureOptions,
    source::{ColumnAnnotations, MemoryRowSource, ReadAhead, RowSource},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureStats {
    /// Rows the detector inspected before deciding.
    pub rows_scanned: usize,
    pub header_rows: usize,
    pub rows_skipped: usize,
    pub ambiguous: bool,
    pub assembly: AssemblyStats,
}

pub struct SheetParser<'a> {
    options: &'a CaptureOptions,
    external: Option<&'a dyn ExternalDetector>,
}

impl<'a> SheetParser<'a> {
    pub fn new(options: &'a CaptureOptions) -> Self {
        Self {
            options,
            external: None,
        }
    }

    /// Registers the decision procedure used by `aiDetection` and `newfangled`.
    pub fn external(mut self, detector: &'a dyn ExternalDetector) -> Self {
        self.external = Some(detector);
        self
    }

    fn detector(&self) -> HeaderDetector<'a> {
        let detector = HeaderDetector::new(&self.options.detection)
            .classifier(self.options.classifier)
            .window(self.options.cascade_window)
            .ambiguity(self.options.ambiguity);
        match self.external {
            Some(external) => detector.external(external),
            None => detector,
        }
    }

    /// Header decision only; reads no further than the detection bound.
    pub fn detect<S: RowSource>(&self, source: S) -> Result<HeaderDetection> {
        self.options.validate()?;
        let ahead = ReadAhead::new(source, self.options.detection.read_ahead())?;
        self.detector().detect(ahead.prefix())
    }

    pub fn capture<S: RowSource>(&self, source: S) -> Result<SheetCapture> {
        self.capture_with_stats(source).map(|(capture, _)| capture)
    }

    pub fn capture_with_stats<S: RowSource>(&self, source: S) -> Result<(SheetCapture, CaptureStats)> {
        let options = self.options;
        options.validate()?;

        let sheet = source.name().unwrap_or("sheet").to_string();
        let annotations = source.annotations().cloned();
        let ahead = ReadAhead::new(source, options.detection.read_ahead())?;
        let detection = self.detector().detect(ahead.prefix())?;

        let header_rows = if detection.header_rows.len() > 1 {
            cascade_headers(
                &detection.header_rows,
                &options.classifier,
                options.cascade_window,
            )
        } else {
            detection.header_rows.clone()
        };
        let labels = normalize_labels(&header_labels(&header_rows, &options.header_separator));
        let headers: Vec<String> = labels.iter().map(|label| label.key.clone()).collect();

        let report = format!(
            "Sheet '{}': scanned {} row(s), header rows {:?}, skipping {} row(s), {} column(s)",
            sheet,
            detection.scanned,
            detection.row_indices,
            detection.skip,
            headers.len()
        );
        if options.debug {
            info!("{report}");
        } else {
            debug!("{report}");
        }

        let mut assembler = TableAssembler::new()
            .policy(options.shape_policy)
            .debug(options.debug)
            .row_offset(detection.skip);
        if detection.ambiguous {
            warn!(
                "Sheet '{}': no header-like row in the first {} row(s); using row 0 as the header",
                sheet, detection.scanned
            );
            assembler = assembler.warning(CaptureWarning::AmbiguousStructure {
                searched: detection.scanned,
            });
        }
        if options.track_metadata {
            assembler = assembler.track_row_headers(detection.row_indices.clone());
        }
        if let Some(required) = required_flags(&labels, annotations.as_ref()) {
            assembler = assembler.required(required);
        }
        if let Some(descriptions) = annotations
            .as_ref()
            .and_then(|annotations| column_descriptions(&labels, annotations))
        {
            assembler = assembler.descriptions(descriptions);
        }

        let rows = ahead.into_rows(detection.skip);
        let (capture, assembly) = process_results(rows, |rows| {
            if options.cascade_rows {
                assembler.assemble(headers, RowCascade::new(rows))
            } else {
                assembler.assemble(headers, rows)
            }
        })??;

        let stats = CaptureStats {
            rows_scanned: detection.scanned,
            header_rows: detection.header_rows.len(),
            rows_skipped: detection.skip,
            ambiguous: detection.ambiguous,
            assembly,
        };
        Ok((capture, stats))
    }

    /// Captures each source as one sheet, named by the source or `Sheet{n}`.
    pub fn capture_workbook<I, S>(&self, sources: I) -> Result<WorkbookCapture>
    where
        I: IntoIterator<Item = S>,
        S: RowSource,
    {
        let mut workbook = WorkbookCapture::new();
        for (idx, source) in sources.into_iter().enumerate() {
            let name = source
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Sheet{}", idx + 1));
            let capture = self.capture(source)?;
            workbook.insert(name, capture)?;
        }
        Ok(workbook)
    }
}

/// Captures in-memory rows with `options`.
pub fn capture_rows(rows: Vec<Row>, options: &CaptureOptions) -> Result<SheetCapture> {
    SheetParser::new(options).capture(MemoryRowSource::new(rows))
}

fn required_flags(
    labels: &[NormalizedLabel],
    annotations: Option<&ColumnAnnotations>,
) -> Option<IndexMap<String, bool>> {
    let explicit = annotations.map(|a| &a.required).filter(|flags| !flags.is_empty());
    if explicit.is_none() && !labels.iter().any(|label| label.required) {
        return None;
    }
    Some(
        labels
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                let flag = explicit
                    .and_then(|flags| flags.get(&idx).copied())
                    .unwrap_or(label.required);
                (label.key.clone(), flag)
            })
            .collect(),
    )
}

fn column_descriptions(
    labels: &[NormalizedLabel],
    annotations: &ColumnAnnotations,
) -> Option<IndexMap<String, Option<String>>> {
    if annotations.descriptions.is_empty() {
        return None;
    }
    Some(
        labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.key.clone(), annotations.descriptions.get(&idx).cloned()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::{Cell, row_of},
        detect::HeaderDetectionOptions,
    };

    #[test]
    fn default_capture_uses_first_header_row() {
        let rows = vec![
            row_of(["ID", "Name"]),
            vec![Cell::from(1), Cell::from("Alice")],
            vec![Cell::from(2), Cell::from("Bob")],
        ];
        let capture = capture_rows(rows, &CaptureOptions::default()).expect("capture");
        assert_eq!(capture.headers, vec!["ID", "Name"]);
        assert_eq!(capture.record_count(), 2);
        assert_eq!(capture.value(1, "Name"), Some(&Cell::from("Bob")));
        assert!(capture.required.is_none());
        assert!(capture.metadata.is_none());
    }

    #[test]
    fn multi_row_headers_are_cascaded_and_flattened() {
        let rows = vec![
            row_of(["Person", "", "Company", ""]),
            row_of(["Name", "Email", "Name", "Address"]),
            vec![
                Cell::from("Ann"),
                Cell::from("ann@example.com"),
                Cell::from(7),
                Cell::from(12),
            ],
        ];
        let mut options = CaptureOptions::with_detection(
            HeaderDetectionOptions::DataRowAndSubHeaderDetection {
                rows_to_search: None,
            },
        );
        options.track_metadata = true;
        let capture = capture_rows(rows, &options).expect("capture");
        assert_eq!(
            capture.headers,
            vec!["Person Name", "Person Email", "Company Name", "Company Address"]
        );
        assert_eq!(capture.record_count(), 1);
        assert_eq!(
            capture.metadata.expect("metadata").row_headers,
            vec![0, 1]
        );
    }

    #[test]
    fn ambiguous_documents_carry_a_warning() {
        let rows = vec![row_of([1, 2]), row_of([3, 4])];
        let (capture, stats) = SheetParser::new(&CaptureOptions::default())
            .capture_with_stats(MemoryRowSource::new(rows))
            .expect("capture");
        assert!(stats.ambiguous);
        assert_eq!(capture.headers, vec!["1", "2"]);
        assert_eq!(
            capture.warnings(),
            &[CaptureWarning::AmbiguousStructure { searched: 2 }]
        );
    }

    #[test]
    fn required_markers_and_annotations_combine() {
        let rows = vec![row_of(["Email*", "Name", "Notes"]), row_of(["a@b.c", "A", ""])];
        let source = MemoryRowSource::new(rows).with_annotations(
            ColumnAnnotations::default()
                .require(1, true)
                .describe(2, "Free text"),
        );
        let capture = SheetParser::new(&CaptureOptions::default())
            .capture(source)
            .expect("capture");
        assert_eq!(capture.headers, vec!["Email", "Name", "Notes"]);
        assert!(capture.is_required("Email"));
        assert!(capture.is_required("Name"));
        assert!(!capture.is_required("Notes"));
        assert_eq!(capture.description("Notes"), Some("Free text"));
        assert_eq!(capture.description("Email"), None);
    }

    #[test]
    fn row_cascade_is_opt_in() {
        let rows = vec![
            row_of(["Invoice", "Item"]),
            row_of(["INV-1", "Pen"]),
            row_of(["", "Ink"]),
        ];
        let plain = capture_rows(rows.clone(), &CaptureOptions::default()).expect("capture");
        assert_eq!(plain.value(1, "Invoice"), Some(&Cell::from("")));

        let options = CaptureOptions {
            cascade_rows: true,
            ..CaptureOptions::default()
        };
        let cascaded = capture_rows(rows, &options).expect("capture");
        assert_eq!(cascaded.value(1, "Invoice"), Some(&Cell::from("INV-1")));
    }

    #[test]
    fn workbook_names_unnamed_sources() {
        let options = CaptureOptions::default();
        let parser = SheetParser::new(&options);
        let workbook = parser
            .capture_workbook(vec![
                MemoryRowSource::new(vec![row_of(["a", "b"])]),
                MemoryRowSource::new(vec![row_of(["c", "d"])]).named("second"),
            ])
            .expect("workbook");
        assert_eq!(workbook.sheet_names(), vec!["Sheet1", "second"]);
    }
}
