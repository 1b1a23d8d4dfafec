//! I/O utilities for delimited input: encoding and delimiter resolution,
//! reader construction, and the oversized-input guard.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **stdin**: the `-` path convention routes through standard input.
//! - **Size guard**: inputs larger than the configured maximum text length are
//!   rejected with [`CaptureError::InputTooLarge`] before they are decoded.

use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8};

use crate::error::{CaptureError, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
/// Largest text a single document may decode to (the common host string limit).
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 0x1fff_ffe8;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| CaptureError::config(format!("Unknown encoding '{value}'")))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Headerless, flexible reader: header handling belongs to the detector.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        return Ok(Box::new(std::io::stdin().lock()));
    }
    let file = File::open(path).map_err(|err| {
        CaptureError::DecodeFailed(format!("Opening input file {path:?}: {err}"))
    })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Rejects a file whose size already exceeds `limit`; stdin is checked while streaming.
pub fn ensure_within_limit(path: &Path, limit: u64) -> Result<()> {
    if is_dash(path) {
        return Ok(());
    }
    let size = fs::metadata(path)
        .map_err(|err| CaptureError::DecodeFailed(format!("Reading metadata for {path:?}: {err}")))?
        .len();
    if size > limit {
        return Err(CaptureError::too_large(size, limit));
    }
    Ok(())
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding, limit: u64) -> Result<String> {
    let size = bytes.len() as u64;
    if size > limit {
        return Err(CaptureError::too_large(size, limit));
    }
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(CaptureError::DecodeFailed(format!(
            "Failed to decode text with encoding {}",
            encoding.name()
        )));
    }
    if text.len() as u64 > limit {
        return Err(CaptureError::too_large(text.len() as u64, limit));
    }
    Ok(text.into_owned())
}

/// Drops a leading byte-order mark for `encoding`; a mark for any other encoding is kept.
pub fn strip_bom<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> &'a [u8] {
    match Encoding::for_bom(bytes) {
        Some((bom_encoding, length)) if bom_encoding == encoding => &bytes[length..],
        _ => bytes,
    }
}

/// Sheet name derived from a file path: its stem, or `None` for stdin.
pub fn sheet_name_for(path: &Path) -> Option<String> {
    if is_dash(path) {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}
