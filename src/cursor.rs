//! Resumable row windows over a forward-only stream.
//!
//! A [`CursorState`] remembers how many data rows the open stream has already
//! delivered. A request starting at or after that position continues from the
//! open stream; a request starting before it, or arriving after the stream has
//! ended, reopens the file from byte 0. Sequential pagination therefore parses
//! every row once.
//!
//! ## Window convention
//!
//! Positions are 1-based and `start` is exclusive: without a filter the rows
//! at positions `start + 1 ..= start + length` are returned, so `start = 0,
//! length = 5` yields the first five rows and the next page starts at 5. With a
//! filter every row past `start` is tested and only passing rows count toward
//! `length`.
//!
//! Once a window is full the stream is parked in place (both formats), ready
//! for the next forward request.

use crate::error::DatasetError;
use crate::extract::MetadataExtractor;
use crate::filter::CompiledFilter;
use crate::io::compression::strip_compression_suffix;
use crate::io::feed::{DocumentEvent, JsonFeed};
use crate::io::lines::LineFeed;
use crate::io::source::{DocumentStream, StreamSource};
use crate::metadata::DatasetMetadata;
use crate::row::{Row, Shape};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, trace};

/// Physical layout of a dataset document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// One JSON object with a `rows` array.
    #[default]
    Json,
    /// Metadata object on the first line, one row array per following line.
    Ndjson,
}

impl DocumentFormat {
    /// `.ndjson` (optionally followed by a compression suffix) means NDJSON;
    /// anything else is treated as a JSON document.
    #[must_use]
    pub fn infer(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if strip_compression_suffix(&name)
            .to_lowercase()
            .ends_with(".ndjson")
        {
            Self::Ndjson
        } else {
            Self::Json
        }
    }

    /// Read this format's metadata from a fresh stream.
    pub fn extract_metadata(self, stream: DocumentStream) -> Result<DatasetMetadata> {
        match self {
            Self::Json => {
                let mut feed = JsonFeed::new(stream).skip_rows(true);
                MetadataExtractor::new().read_feed(&mut feed)
            }
            Self::Ndjson => {
                let mut lines = LineFeed::new(stream);
                let first = lines.next_line()?;
                MetadataExtractor::new().read_first_line(first)
            }
        }
    }
}

/// One item pulled from a row stream.
enum RowItem {
    Values(Vec<Value>),
    /// A zero-length NDJSON line: occupies a position, yields no row.
    Blank,
}

/// An open stream positioned inside the row section of a document.
enum RowStream {
    Json(JsonFeed<DocumentStream>),
    Lines(LineFeed<DocumentStream>),
}

impl RowStream {
    /// Open `source` and advance past the metadata to the first row.
    fn open(source: &StreamSource, format: DocumentFormat) -> Result<Self> {
        let stream = source.open()?;
        match format {
            DocumentFormat::Json => {
                let mut feed = JsonFeed::new(stream);
                while !feed.in_rows() {
                    match feed.next_event()? {
                        Some(DocumentEvent::End) | None => break,
                        Some(_) => {}
                    }
                }
                Ok(Self::Json(feed))
            }
            DocumentFormat::Ndjson => {
                let mut lines = LineFeed::new(stream);
                // First line is the metadata object.
                lines.next_line()?;
                Ok(Self::Lines(lines))
            }
        }
    }

    /// Next row, or `None` when the rows are exhausted.
    fn next_row(&mut self) -> Result<Option<RowItem>> {
        match self {
            Self::Json(feed) => {
                if !feed.in_rows() {
                    return Ok(None);
                }
                match feed.next_event()? {
                    Some(DocumentEvent::Row(values)) => Ok(Some(RowItem::Values(values))),
                    _ => Ok(None),
                }
            }
            Self::Lines(lines) => {
                let Some(line) = lines.next_line()? else {
                    return Ok(None);
                };
                if line.is_empty() {
                    return Ok(Some(RowItem::Blank));
                }
                let values: Vec<Value> = serde_json::from_str(line)
                    .with_context(|| format!("parse NDJSON row on line {}", lines.line_no()))?;
                Ok(Some(RowItem::Values(values)))
            }
        }
    }
}

/// Read position and stream lifecycle of one reader.
#[derive(Default)]
pub struct CursorState {
    position: u64,
    all_rows_read: bool,
    stream: Option<RowStream>,
}

impl CursorState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Data rows consumed from the current stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the most recent read hit the end of the rows.
    #[must_use]
    pub fn all_rows_read(&self) -> bool {
        self.all_rows_read
    }

    /// Whether a stream is currently open (parked mid-document).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Drop the stream and return to position 0.
    pub fn reset(&mut self) {
        self.stream = None;
        self.position = 0;
        self.all_rows_read = false;
    }
}

impl std::fmt::Debug for CursorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorState")
            .field("position", &self.position)
            .field("all_rows_read", &self.all_rows_read)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Column selection resolved against the metadata once per request.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    /// Lowercased requested names; empty means all columns.
    names: Vec<String>,
    /// Column indices of the requested names, in request order; names that
    /// match no column are absent.
    indices: Vec<usize>,
}

impl Projection {
    pub fn new<S: AsRef<str>>(columns: &[S], metadata: &DatasetMetadata) -> Self {
        let names: Vec<String> = columns.iter().map(|c| c.as_ref().to_lowercase()).collect();
        let indices = names
            .iter()
            .filter_map(|n| metadata.column_index(n))
            .collect();
        Self { names, indices }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.names.is_empty()
    }

    fn shape(&self, values: Vec<Value>, shape: Shape, metadata: &DatasetMetadata) -> Row {
        match shape {
            Shape::Array if self.is_all() => Row::Array(values),
            Shape::Array => Row::Array(
                self.indices
                    .iter()
                    .map(|&i| values.get(i).cloned().unwrap_or(Value::Null))
                    .collect(),
            ),
            Shape::Object => {
                let mut obj = Map::with_capacity(metadata.columns.len());
                for (i, col) in metadata.columns.iter().enumerate() {
                    if self.is_all() || self.names.contains(&col.name.to_lowercase()) {
                        obj.insert(col.name.clone(), values.get(i).cloned().unwrap_or(Value::Null));
                    }
                }
                Row::Object(obj)
            }
        }
    }
}

/// One validated window request.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub start: u64,
    pub length: Option<u64>,
    pub shape: Shape,
    pub projection: &'a Projection,
    pub filter: Option<&'a CompiledFilter>,
}

impl Window<'_> {
    /// Fails with [`DatasetError::InvalidWindow`] for a zero length or a start
    /// beyond the declared record count.
    pub fn validate(&self, records: u64) -> Result<()> {
        if self.length == Some(0) || self.start > records {
            return Err(DatasetError::InvalidWindow {
                start: self.start,
                length: self.length,
                records,
            }
            .into());
        }
        Ok(())
    }

    fn is_full(&self, position: u64, included: u64) -> bool {
        match (self.length, self.filter) {
            (None, _) => false,
            (Some(len), None) => position >= self.start.saturating_add(len),
            (Some(len), Some(_)) => included >= len,
        }
    }
}

/// Turns a stream of rows into addressable windows.
pub struct RowCursor<'a> {
    source: &'a StreamSource,
    format: DocumentFormat,
    metadata: &'a DatasetMetadata,
}

impl<'a> RowCursor<'a> {
    pub fn new(source: &'a StreamSource, format: DocumentFormat, metadata: &'a DatasetMetadata) -> Self {
        Self {
            source,
            format,
            metadata,
        }
    }

    /// Read one window, reusing the open stream when possible.
    ///
    /// On a parse failure the stream is dropped so the next call starts over.
    pub fn read(&self, state: &mut CursorState, window: &Window<'_>) -> Result<Vec<Row>> {
        if !state.is_open() || state.position > window.start {
            debug!(
                path = %self.source.path().display(),
                position = state.position,
                start = window.start,
                reopen = state.is_open(),
                "opening row stream from the beginning"
            );
            state.reset();
            state.stream = Some(RowStream::open(self.source, self.format)?);
        }

        match self.collect(state, window) {
            Ok(rows) => Ok(rows),
            Err(e) => {
                state.stream = None;
                Err(e)
            }
        }
    }

    fn collect(&self, state: &mut CursorState, window: &Window<'_>) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut included = 0u64;
        while !window.is_full(state.position, included) {
            let Some(stream) = state.stream.as_mut() else {
                break;
            };
            let values = match stream.next_row()? {
                None => {
                    trace!(position = state.position, "rows exhausted");
                    state.stream = None;
                    state.all_rows_read = true;
                    break;
                }
                Some(RowItem::Blank) => {
                    state.position += 1;
                    continue;
                }
                Some(RowItem::Values(values)) => values,
            };
            state.position += 1;
            if state.position <= window.start {
                continue;
            }
            if let Some(filter) = window.filter
                && !filter.evaluate(&values)
            {
                continue;
            }
            included += 1;
            rows.push(window.projection.shape(values, window.shape, self.metadata));
        }
        debug!(
            start = window.start,
            returned = rows.len(),
            position = state.position,
            all_rows_read = state.all_rows_read,
            "window complete"
        );
        Ok(rows)
    }
}
