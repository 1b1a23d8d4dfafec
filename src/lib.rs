pub mod assemble;
pub mod capture;
pub mod cascade;
pub mod cell;
pub mod classify;
pub mod cli;
pub mod detect;
pub mod error;
pub mod io_utils;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod table;

use std::{
    env,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

pub use crate::{
    capture::{SheetCapture, WorkbookCapture},
    cell::{Cell, Row},
    detect::{ExternalDetector, HeaderDetectionOptions, HeaderDetector},
    error::CaptureError,
    options::CaptureOptions,
    pipeline::{SheetParser, capture_rows},
    source::{CsvRowSource, MemoryRowSource, RowSource},
};

use crate::{
    cli::{CaptureArgs, Cli, Commands, DetectArgs, PreviewArgs, SchemaArgs, SourceArgs},
    options::is_yaml,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_capture", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Capture(args) => handle_capture(&args),
        Commands::Detect(args) => handle_detect(&args),
        Commands::Preview(args) => handle_preview(&args),
        Commands::Schema(args) => handle_schema(&args),
    }
}

fn open_source(args: &SourceArgs, path: &Path, options: &CaptureOptions) -> Result<CsvRowSource> {
    let delimiter = io_utils::resolve_input_delimiter(path, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    debug!(
        "Opening '{}' with delimiter '{}' and encoding {}",
        path.display(),
        printable_delimiter(delimiter),
        encoding.name()
    );
    let source = CsvRowSource::from_path(path, delimiter, encoding, options.max_input_bytes)
        .with_context(|| format!("Opening input {path:?}"))?;
    Ok(source)
}

fn capture_inputs(args: &SourceArgs, options: &CaptureOptions) -> Result<WorkbookCapture> {
    let parser = SheetParser::new(options);
    let mut workbook = WorkbookCapture::new();
    for (idx, path) in args.inputs.iter().enumerate() {
        let source = open_source(args, path, options)?;
        let name = source
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Sheet{}", idx + 1));
        let (capture, stats) = parser
            .capture_with_stats(source)
            .with_context(|| format!("Capturing {path:?}"))?;
        info!(
            "Captured sheet '{}': {} column(s), {} record(s), {} header row(s)",
            name,
            capture.column_count(),
            capture.record_count(),
            stats.header_rows
        );
        workbook.insert(name, capture)?;
    }
    Ok(workbook)
}

fn handle_capture(args: &CaptureArgs) -> Result<()> {
    let options = args.source.to_options()?;
    info!(
        "Capturing {} input(s) with '{}' header detection",
        args.source.inputs.len(),
        options.detection.name()
    );
    let workbook = capture_inputs(&args.source, &options)?;
    match &args.output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
            write_json(BufWriter::new(file), &workbook, args.pretty)
                .with_context(|| format!("Writing workbook to {path:?}"))?;
            info!("Workbook with {} sheet(s) written to {:?}", workbook.len(), path);
        }
        None => {
            let stdout = io::stdout();
            write_json(stdout.lock(), &workbook, args.pretty).context("Writing workbook to stdout")?;
        }
    }
    Ok(())
}

fn write_json<W: Write>(mut writer: W, workbook: &WorkbookCapture, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, workbook)?;
    } else {
        serde_json::to_writer(&mut writer, workbook)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn handle_detect(args: &DetectArgs) -> Result<()> {
    let options = args.source.to_options()?;
    let parser = SheetParser::new(&options);
    let mut stdout = io::stdout().lock();
    for path in &args.source.inputs {
        let source = open_source(&args.source, path, &options)?;
        let detection = parser
            .detect(source)
            .with_context(|| format!("Detecting headers in {path:?}"))?;
        writeln!(
            stdout,
            "{}: algorithm={} header_rows={:?} skip={} scanned={}{}",
            path.display(),
            options.detection.name(),
            detection.row_indices,
            detection.skip,
            detection.scanned,
            if detection.ambiguous { " (ambiguous)" } else { "" }
        )?;
        if !detection.header_rows.is_empty() {
            let first = detection.row_indices.first().copied().unwrap_or(0);
            write!(stdout, "{}", table::render_rows(&detection.header_rows, first))?;
        }
    }
    Ok(())
}

fn handle_preview(args: &PreviewArgs) -> Result<()> {
    let options = args.source.to_options()?;
    let workbook = capture_inputs(&args.source, &options)?;
    let mut stdout = io::stdout().lock();
    for (name, capture) in workbook.iter() {
        writeln!(
            stdout,
            "== {} ({} of {} record(s)) ==",
            name,
            capture.record_count().min(args.rows),
            capture.record_count()
        )?;
        write!(stdout, "{}", table::render_capture(capture, args.rows))?;
        for warning in capture.warnings() {
            writeln!(stdout, "warning: {warning}")?;
        }
    }
    Ok(())
}

fn handle_schema(args: &SchemaArgs) -> Result<()> {
    let options = args.source.to_options()?;
    let workbook = capture_inputs(&args.source, &options)?;
    let schema = schema::project_workbook(&workbook);
    schema
        .save(&args.output)
        .with_context(|| format!("Writing schema to {:?}", args.output))?;
    info!(
        "Schema for {} sheet(s) written to {:?} as {}",
        schema.sheets.len(),
        args.output,
        if is_yaml(&args.output) { "YAML" } else { "JSON" }
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
