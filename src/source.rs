//! Row sources and bounded read-ahead.
//!
//! A [`RowSource`] is a forward-only stream of rows for one sheet. Format
//! specific readers implement it; this crate ships an in-memory source and a
//! delimited-text source. [`ReadAhead`] buffers at most a fixed number of rows
//! for header detection and then replays them ahead of the untouched rest of
//! the stream, so nothing beyond the bound is materialised to find a header.

use std::{collections::HashMap, io::Read, path::Path, vec};

use encoding_rs::Encoding;

use crate::{
    cell::{Cell, Row},
    error::{CaptureError, Result},
    io_utils,
};

/// Per-column side-channel data a source may know about, by column index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnAnnotations {
    pub required: HashMap<usize, bool>,
    pub descriptions: HashMap<usize, String>,
}

impl ColumnAnnotations {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.descriptions.is_empty()
    }

    pub fn require(mut self, column: usize, required: bool) -> Self {
        self.required.insert(column, required);
        self
    }

    pub fn describe(mut self, column: usize, description: impl Into<String>) -> Self {
        self.descriptions.insert(column, description.into());
        self
    }
}

pub trait RowSource: Iterator<Item = Result<Row>> {
    /// Sheet name, when the underlying document knows one.
    fn name(&self) -> Option<&str> {
        None
    }

    fn annotations(&self) -> Option<&ColumnAnnotations> {
        None
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn annotations(&self) -> Option<&ColumnAnnotations> {
        (**self).annotations()
    }
}

#[derive(Debug)]
pub struct MemoryRowSource {
    name: Option<String>,
    rows: vec::IntoIter<Row>,
    annotations: Option<ColumnAnnotations>,
}

impl MemoryRowSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            name: None,
            rows: rows.into_iter(),
            annotations: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_annotations(mut self, annotations: ColumnAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }
}

impl Iterator for MemoryRowSource {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }
}

impl RowSource for MemoryRowSource {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn annotations(&self) -> Option<&ColumnAnnotations> {
        self.annotations.as_ref()
    }
}

/// Delimited-text rows, decoded with the requested encoding.
///
/// Record widths may vary. Every field is surfaced as a string cell. The
/// running byte position is checked against `limit` so an unbounded stream
/// fails with [`CaptureError::InputTooLarge`] instead of exhausting memory.
pub struct CsvRowSource {
    name: Option<String>,
    reader: csv::Reader<Box<dyn Read>>,
    record: csv::ByteRecord,
    encoding: &'static Encoding,
    limit: u64,
    at_start: bool,
    done: bool,
}

impl CsvRowSource {
    pub fn from_reader(
        reader: Box<dyn Read>,
        delimiter: u8,
        encoding: &'static Encoding,
        limit: u64,
    ) -> Self {
        Self {
            name: None,
            reader: io_utils::open_csv_reader(reader, delimiter),
            record: csv::ByteRecord::new(),
            encoding,
            limit,
            at_start: true,
            done: false,
        }
    }

    /// Opens `path` (or stdin for `-`), rejecting files larger than `limit` up front.
    pub fn from_path(
        path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
        limit: u64,
    ) -> Result<Self> {
        io_utils::ensure_within_limit(path, limit)?;
        let reader = io_utils::open_input(path)?;
        let mut source = Self::from_reader(reader, delimiter, encoding, limit);
        source.name = io_utils::sheet_name_for(path);
        Ok(source)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }
        let consumed = self.reader.position().byte();
        if consumed > self.limit {
            return Err(CaptureError::too_large(consumed, self.limit));
        }
        let at_start = std::mem::replace(&mut self.at_start, false);
        let row = self
            .record
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let field = if at_start && idx == 0 {
                    io_utils::strip_bom(field, self.encoding)
                } else {
                    field
                };
                io_utils::decode_bytes(field, self.encoding, self.limit).map(Cell::String)
            })
            .collect::<Result<Row>>()?;
        Ok(Some(row))
    }
}

impl Iterator for CsvRowSource {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl RowSource for CsvRowSource {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Bounded prefix of a row source, buffered for header detection.
pub struct ReadAhead<S> {
    prefix: Vec<Row>,
    source: S,
}

impl<S: RowSource> ReadAhead<S> {
    /// Pulls at most `limit` rows from `source`.
    pub fn new(mut source: S, limit: usize) -> Result<Self> {
        let mut prefix = Vec::with_capacity(limit.min(64));
        while prefix.len() < limit {
            match source.next() {
                Some(row) => prefix.push(row?),
                None => break,
            }
        }
        Ok(Self { prefix, source })
    }

    pub fn prefix(&self) -> &[Row] {
        &self.prefix
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Remaining rows after discarding the first `skip`, buffered ones first.
    pub fn into_rows(self, skip: usize) -> Remaining<S> {
        let buffered_skip = skip.min(self.prefix.len());
        let mut prefix = self.prefix.into_iter();
        if buffered_skip > 0 {
            prefix.nth(buffered_skip - 1);
        }
        Remaining {
            prefix,
            source: self.source,
            to_skip: skip - buffered_skip,
        }
    }
}

pub struct Remaining<S> {
    prefix: vec::IntoIter<Row>,
    source: S,
    to_skip: usize,
}

impl<S: RowSource> Iterator for Remaining<S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.prefix.next() {
            return Some(Ok(row));
        }
        while self.to_skip > 0 {
            match self.source.next()? {
                Ok(_) => self.to_skip -= 1,
                Err(err) => return Some(Err(err)),
            }
        }
        self.source.next()
    }
}
