use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    assemble::ShapePolicy,
    detect::{AmbiguityPolicy, HeaderDetectionOptions},
    error::CaptureError,
    options::CaptureOptions,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Capture irregular tables into canonical sheets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Capture one or more inputs into a workbook JSON document
    Capture(CaptureArgs),
    /// Report which rows were detected as headers and how many rows are skipped
    Detect(DetectArgs),
    /// Preview the first captured records of each input as a table
    Preview(PreviewArgs),
    /// Project captured headers into a destination schema file
    Schema(SchemaArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// First header-like row within the search bound
    Default,
    /// Caller-supplied labels (see --headers)
    ExplicitHeaders,
    /// Caller-supplied 0-based header rows (see --header-rows)
    SpecificRows,
    /// Consecutive header-like rows with header cascading
    DataRowAndSubHeader,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input file(s); each becomes one sheet named after its file stem ('-' for stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML or JSON capture options file; flags below override its values
    #[arg(long = "options")]
    pub options: Option<PathBuf>,
    /// Header detection algorithm
    #[arg(long, value_enum)]
    pub algorithm: Option<Algorithm>,
    /// Maximum rows inspected when detecting headers
    #[arg(long = "rows-to-search")]
    pub rows_to_search: Option<usize>,
    /// Explicit header labels (implies --algorithm explicit-headers)
    #[arg(long = "headers", value_delimiter = ',')]
    pub headers: Vec<String>,
    /// 0-based header row numbers (implies --algorithm specific-rows)
    #[arg(long = "header-rows", value_delimiter = ',')]
    pub header_rows: Vec<usize>,
    /// Leading rows to discard before data (explicit-headers / specific-rows)
    #[arg(long)]
    pub skip: Option<usize>,
    /// Rows considered for multi-row headers and header cascading
    #[arg(long = "cascade-window")]
    pub cascade_window: Option<usize>,
    /// Share of non-blank cells that must be text for a header row
    #[arg(long = "text-ratio")]
    pub text_ratio: Option<f64>,
    /// Separator joining the parts of multi-row headers
    #[arg(long = "header-separator")]
    pub header_separator: Option<String>,
    /// Fill blank data cells from the row above until a blank row
    #[arg(long = "cascade-rows")]
    pub cascade_rows: bool,
    /// Fail on rows whose width differs from the header
    #[arg(long)]
    pub strict: bool,
    /// Fail instead of falling back to row 0 when no header is found
    #[arg(long = "reject-ambiguous")]
    pub reject_ambiguous: bool,
    /// Record the source rows used as headers in each capture
    #[arg(long = "track-metadata")]
    pub track_metadata: bool,
    /// Report scan, trim, and truncation diagnostics
    #[arg(long)]
    pub debug: bool,
    /// Maximum input size in bytes
    #[arg(long = "max-input-bytes")]
    pub max_input_bytes: Option<u64>,
}

impl SourceArgs {
    pub fn to_options(&self) -> Result<CaptureOptions> {
        let mut options = match &self.options {
            Some(path) => CaptureOptions::load(path)
                .with_context(|| format!("Loading capture options from {path:?}"))?,
            None => CaptureOptions::default(),
        };

        let algorithm = match (self.algorithm, self.headers.is_empty(), self.header_rows.is_empty()) {
            (Some(algorithm), _, _) => Some(algorithm),
            (None, false, true) => Some(Algorithm::ExplicitHeaders),
            (None, true, false) => Some(Algorithm::SpecificRows),
            (None, false, false) => bail!("--headers and --header-rows cannot be combined"),
            (None, true, true) => None,
        };
        if let Some(algorithm) = algorithm {
            options.detection = match algorithm {
                Algorithm::Default => HeaderDetectionOptions::Default {
                    rows_to_search: None,
                },
                Algorithm::DataRowAndSubHeader => {
                    HeaderDetectionOptions::DataRowAndSubHeaderDetection {
                        rows_to_search: None,
                    }
                }
                Algorithm::ExplicitHeaders => HeaderDetectionOptions::ExplicitHeaders {
                    headers: self.headers.clone(),
                    skip: None,
                },
                Algorithm::SpecificRows => HeaderDetectionOptions::SpecificRows {
                    rows: self.header_rows.clone(),
                    skip: None,
                },
            };
        }

        // Overrides apply to whichever variant is active, including one from --options.
        if let Some(limit) = self.rows_to_search {
            match &mut options.detection {
                HeaderDetectionOptions::Default { rows_to_search }
                | HeaderDetectionOptions::DataRowAndSubHeaderDetection { rows_to_search }
                | HeaderDetectionOptions::AiDetection { rows_to_search }
                | HeaderDetectionOptions::Newfangled { rows_to_search } => {
                    *rows_to_search = Some(limit)
                }
                other => {
                    return Err(CaptureError::config(format!(
                        "--rows-to-search does not apply to '{}' detection",
                        other.name()
                    ))
                    .into());
                }
            }
        }
        if let Some(count) = self.skip {
            match &mut options.detection {
                HeaderDetectionOptions::ExplicitHeaders { skip, .. }
                | HeaderDetectionOptions::SpecificRows { skip, .. } => *skip = Some(count),
                other => {
                    return Err(CaptureError::config(format!(
                        "--skip only applies to explicitHeaders and specificRows detection, not '{}'",
                        other.name()
                    ))
                    .into());
                }
            }
        }

        if let Some(window) = self.cascade_window {
            options.cascade_window = window;
        }
        if let Some(ratio) = self.text_ratio {
            options.classifier.text_ratio = ratio;
        }
        if let Some(separator) = &self.header_separator {
            options.header_separator = separator.clone();
        }
        if let Some(limit) = self.max_input_bytes {
            options.max_input_bytes = limit;
        }
        options.cascade_rows |= self.cascade_rows;
        options.track_metadata |= self.track_metadata;
        options.debug |= self.debug;
        if self.strict {
            options.shape_policy = ShapePolicy::Strict;
        }
        if self.reject_ambiguous {
            options.ambiguity = AmbiguityPolicy::Reject;
        }

        options.validate().context("Validating capture options")?;
        Ok(options)
    }
}

#[derive(Debug, Args)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of records to display per sheet
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Destination schema file (.yml/.yaml for YAML, anything else for JSON)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SourceArgs {
        let mut argv = vec!["sheet-capture", "detect"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Detect(detect) => detect.source,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn headers_flag_implies_explicit_algorithm() {
        let options = parse(&["-i", "a.csv", "--headers", "a,b", "--skip", "2"])
            .to_options()
            .expect("options");
        assert_eq!(
            options.detection,
            HeaderDetectionOptions::ExplicitHeaders {
                headers: vec!["a".into(), "b".into()],
                skip: Some(2)
            }
        );
    }

    #[test]
    fn header_rows_flag_implies_specific_rows() {
        let options = parse(&["-i", "a.csv", "--header-rows", "0,1"])
            .to_options()
            .expect("options");
        assert_eq!(options.detection.read_ahead(), 2);
    }

    #[test]
    fn zero_rows_to_search_is_rejected() {
        let err = parse(&["-i", "a.csv", "--algorithm", "default", "--rows-to-search", "0"])
            .to_options()
            .expect_err("invalid");
        assert!(err.chain().any(|e| e.to_string().contains("rowsToSearch")));
    }

    #[test]
    fn rows_to_search_applies_to_the_default_algorithm() {
        let options = parse(&["-i", "a.csv", "--rows-to-search", "3"])
            .to_options()
            .expect("options");
        assert_eq!(
            options.detection,
            HeaderDetectionOptions::Default {
                rows_to_search: Some(3)
            }
        );

        let err = parse(&["-i", "a.csv", "--rows-to-search", "0"])
            .to_options()
            .expect_err("zero bound");
        assert!(err.chain().any(|e| e.to_string().contains("rowsToSearch")));
    }

    #[test]
    fn skip_without_label_algorithm_is_rejected() {
        let err = parse(&["-i", "a.csv", "--skip", "2"])
            .to_options()
            .expect_err("skip needs explicit or specific rows");
        assert!(err.to_string().contains("--skip"));

        let err = parse(&["-i", "a.csv", "--header-rows", "0", "--rows-to-search", "4"])
            .to_options()
            .expect_err("rows-to-search needs a searching algorithm");
        assert!(err.to_string().contains("--rows-to-search"));
    }

    #[test]
    fn delimiter_aliases() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
    }
}
