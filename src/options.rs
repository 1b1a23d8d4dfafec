//! Capture configuration.
//!
//! [`CaptureOptions`] gathers every knob of a parse. It can be read from a YAML
//! or JSON file (camelCase keys, every key optional) and is then overridden
//! field by field from the command line. [`CaptureOptions::validate`] runs
//! before any row is read.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    assemble::ShapePolicy,
    classify::HeaderClassifier,
    detect::{AmbiguityPolicy, DEFAULT_CASCADE_WINDOW, HeaderDetectionOptions},
    error::CaptureError,
    io_utils::DEFAULT_MAX_INPUT_BYTES,
};

pub const DEFAULT_HEADER_SEPARATOR: &str = " ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureOptions {
    pub detection: HeaderDetectionOptions,
    pub classifier: HeaderClassifier,
    /// Rows considered by multi-row detection and header cascading.
    pub cascade_window: usize,
    /// Fill blank data cells from the row above until a blank row.
    pub cascade_rows: bool,
    pub shape_policy: ShapePolicy,
    pub ambiguity: AmbiguityPolicy,
    /// Record which source rows were consumed as headers.
    pub track_metadata: bool,
    /// Promote diagnostics to info/warn level. Never changes output.
    pub debug: bool,
    pub max_input_bytes: u64,
    /// Joins the parts of a multi-row header into one label.
    pub header_separator: String,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            detection: HeaderDetectionOptions::default(),
            classifier: HeaderClassifier::default(),
            cascade_window: DEFAULT_CASCADE_WINDOW,
            cascade_rows: false,
            shape_policy: ShapePolicy::default(),
            ambiguity: AmbiguityPolicy::default(),
            track_metadata: false,
            debug: false,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            header_separator: DEFAULT_HEADER_SEPARATOR.to_string(),
        }
    }
}

impl CaptureOptions {
    pub fn with_detection(detection: HeaderDetectionOptions) -> Self {
        Self {
            detection,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), CaptureError> {
        self.detection.validate()?;
        self.classifier.validate()?;
        if self.cascade_window == 0 {
            return Err(CaptureError::config("cascadeWindow must be at least 1"));
        }
        if self.max_input_bytes == 0 {
            return Err(CaptureError::config("maxInputBytes must be at least 1"));
        }
        Ok(())
    }

    /// Loads options from YAML (`.yml`/`.yaml`) or JSON (anything else).
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening options file {path:?}"))?;
        let reader = BufReader::new(file);
        let options: Self = if is_yaml(path) {
            serde_yaml::from_reader(reader).context("Parsing options YAML")?
        } else {
            serde_json::from_reader(reader).context("Parsing options JSON")?
        };
        options
            .validate()
            .with_context(|| format!("Validating options from {path:?}"))?;
        Ok(options)
    }
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn yaml_keys_are_optional_and_camel_case() {
        let yaml = "detection:\n  algorithm: dataRowAndSubHeaderDetection\n  rowsToSearch: 10\ncascadeRows: true\nshapePolicy: strict\nclassifier:\n  textRatio: 0.75\n";
        let options: CaptureOptions = serde_yaml::from_str(yaml).expect("parse options");
        assert!(options.cascade_rows);
        assert_eq!(options.shape_policy, ShapePolicy::Strict);
        assert_eq!(options.classifier.text_ratio, 0.75);
        assert_eq!(options.cascade_window, DEFAULT_CASCADE_WINDOW);
        assert_eq!(options.header_separator, " ");
        assert_eq!(options.detection.read_ahead(), 10);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut options = CaptureOptions::default();
        options.cascade_window = 0;
        assert!(options.validate().is_err());

        let options = CaptureOptions::with_detection(HeaderDetectionOptions::Default {
            rows_to_search: Some(0),
        });
        assert!(matches!(
            options.validate(),
            Err(CaptureError::Configuration(_))
        ));
    }

    #[test]
    fn load_reads_json_files() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"{{"detection": {{"algorithm": "explicitHeaders", "headers": ["a", "b"], "skip": 1}}, "trackMetadata": true}}"#
        )
        .unwrap();
        let options = CaptureOptions::load(file.path()).expect("load options");
        assert!(options.track_metadata);
        assert_eq!(
            options.detection,
            HeaderDetectionOptions::ExplicitHeaders {
                headers: vec!["a".into(), "b".into()],
                skip: Some(1)
            }
        );
    }

    #[test]
    fn load_reports_invalid_configuration() {
        let mut file = NamedTempFile::with_suffix(".yml").expect("temp file");
        writeln!(file, "detection:\n  algorithm: specificRows\n  rows: []").unwrap();
        let err = CaptureOptions::load(file.path()).expect_err("empty rows");
        assert!(
            err.chain()
                .any(|source| source.to_string().contains("specificRows"))
        );
    }
}
