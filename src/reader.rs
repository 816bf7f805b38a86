//! The dataset reader: metadata, row windows, full scans and distinct values.

use crate::cursor::{CursorState, DocumentFormat, Projection, RowCursor, Window};
use crate::error::DatasetError;
use crate::filter::{CompiledFilter, Filter};
use crate::io::encoding::TextEncoding;
use crate::io::source::StreamSource;
use crate::metadata::DatasetMetadata;
use crate::row::{Row, Shape};
use crate::utils::{DistinctKey, sort_values};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

const DEFAULT_BUFFER_LENGTH: u64 = 1000;
const DEFAULT_UNIQUE_LIMIT: usize = 100;

fn default_buffer_length() -> u64 {
    DEFAULT_BUFFER_LENGTH
}

fn default_unique_limit() -> usize {
    DEFAULT_UNIQUE_LIMIT
}

fn default_true() -> bool {
    true
}

/// Construction options for [`DatasetReader`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Document layout; inferred from the file name when `None`.
    pub format: Option<DocumentFormat>,
    /// Text encoding of the file's bytes.
    pub encoding: TextEncoding,
}

impl ReaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a document layout instead of inferring it.
    #[must_use]
    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// One row window request.
///
/// `start` is exclusive: `start = 0, length = 10` returns rows 1 to 10, and the
/// following page is `start = 10`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataRequest {
    pub start: u64,
    pub length: Option<u64>,
    #[serde(rename = "type")]
    pub shape: Shape,
    /// Columns to return (case-insensitive); empty means every column.
    pub filter_columns: Vec<String>,
    #[serde(rename = "filterData", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl DataRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Options for [`DatasetReader::read_records`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordsOptions {
    pub start: u64,
    /// Rows fetched per underlying window read.
    pub buffer_length: u64,
    #[serde(rename = "type")]
    pub shape: Shape,
    pub filter_columns: Vec<String>,
    #[serde(rename = "filterData", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl Default for RecordsOptions {
    fn default() -> Self {
        Self {
            start: 0,
            buffer_length: DEFAULT_BUFFER_LENGTH,
            shape: Shape::Array,
            filter_columns: Vec::new(),
            filter: None,
        }
    }
}

impl RecordsOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub fn buffer_length(mut self, buffer_length: u64) -> Self {
        self.buffer_length = buffer_length;
        self
    }

    #[must_use]
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Options for [`DatasetReader::unique_values`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueValuesRequest {
    pub columns: Vec<String>,
    /// Distinct values kept per column; 0 keeps all of them.
    #[serde(default = "default_unique_limit")]
    pub limit: usize,
    #[serde(default = "default_buffer_length")]
    pub buffer_length: u64,
    #[serde(default = "default_true")]
    pub sort: bool,
}

impl UniqueValuesRequest {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            limit: DEFAULT_UNIQUE_LIMIT,
            buffer_length: DEFAULT_BUFFER_LENGTH,
            sort: true,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn buffer_length(mut self, buffer_length: u64) -> Self {
        self.buffer_length = buffer_length;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }
}

#[derive(Debug)]
struct LoadedMetadata {
    metadata: DatasetMetadata,
    modified: Option<SystemTime>,
}

/// Streaming reader over one dataset file.
///
/// Holds a single cursor, so every operation takes `&mut self`. Consecutive
/// forward windows reuse the open stream; anything else reopens the file.
#[derive(Debug)]
pub struct DatasetReader {
    source: StreamSource,
    format: DocumentFormat,
    metadata: Option<LoadedMetadata>,
    cursor: CursorState,
}

impl DatasetReader {
    /// Open `path` with default options.
    ///
    /// # Errors
    /// [`DatasetError::FileNotFound`] when `path` is not a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ReaderOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let source = StreamSource::new(path, options.encoding)?;
        let format = options
            .format
            .unwrap_or_else(|| DocumentFormat::infer(path));
        debug!(path = %path.display(), ?format, encoding = options.encoding.as_str(), "opened dataset");
        Ok(Self {
            source,
            format,
            metadata: None,
            cursor: CursorState::new(),
        })
    }

    /// Dataset metadata, re-extracted whenever the file's modification time
    /// has changed since the last extraction.
    pub fn metadata(&mut self) -> Result<&DatasetMetadata> {
        self.ensure_metadata()?;
        self.metadata
            .as_ref()
            .map(|l| &l.metadata)
            .ok_or_else(|| DatasetError::MetadataNotLoaded.into())
    }

    fn ensure_metadata(&mut self) -> Result<()> {
        let modified = self.source.modified()?;
        if self.metadata.as_ref().is_some_and(|l| l.modified == modified) {
            return Ok(());
        }
        if self.metadata.is_some() {
            debug!(path = %self.source.path().display(), "dataset changed on disk, reloading metadata");
        }
        self.cursor.reset();
        self.metadata = None;
        let metadata = self.format.extract_metadata(self.source.open()?)?;
        debug!(
            name = %metadata.name,
            records = metadata.records,
            columns = metadata.columns.len(),
            "metadata extracted"
        );
        self.metadata = Some(LoadedMetadata { metadata, modified });
        Ok(())
    }

    /// Read one row window.
    ///
    /// # Errors
    /// Request problems ([`DatasetError::MetadataNotLoaded`],
    /// [`DatasetError::InvalidWindow`] and the filter compilation errors) are
    /// reported before the cursor is touched.
    pub fn get_data(&mut self, request: &DataRequest) -> Result<Vec<Row>> {
        self.ensure_metadata()?;
        let Some(loaded) = self.metadata.as_ref() else {
            return Err(DatasetError::MetadataNotLoaded.into());
        };
        let metadata = &loaded.metadata;
        if metadata.columns.is_empty() {
            return Err(DatasetError::MetadataNotLoaded.into());
        }

        let projection = Projection::new(&request.filter_columns, metadata);
        let compiled = request
            .filter
            .as_ref()
            .map(|f| CompiledFilter::compile(f, metadata))
            .transpose()?;
        let window = Window {
            start: request.start,
            length: request.length,
            shape: request.shape,
            projection: &projection,
            filter: compiled.as_ref(),
        };
        window.validate(metadata.records)?;

        RowCursor::new(&self.source, self.format, metadata).read(&mut self.cursor, &window)
    }

    /// Iterate every row from `options.start`, reading `buffer_length` rows at
    /// a time.
    pub fn read_records(&mut self, options: RecordsOptions) -> Records<'_> {
        let request = DataRequest {
            start: options.start,
            length: Some(options.buffer_length),
            shape: options.shape,
            filter_columns: options.filter_columns,
            filter: options.filter,
        };
        Records {
            reader: self,
            request,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Distinct non-null values per column, in first-seen order (or sorted).
    ///
    /// Keys are the columns' canonical names.
    ///
    /// # Errors
    /// [`DatasetError::UnknownColumns`] listing every name that matches no
    /// column.
    pub fn unique_values(
        &mut self,
        request: &UniqueValuesRequest,
    ) -> Result<BTreeMap<String, Vec<Value>>> {
        let metadata = self.metadata()?;
        let mut columns: Vec<String> = Vec::new();
        let mut missing = Vec::new();
        for name in &request.columns {
            match metadata.column(name) {
                Some(col) if !columns.contains(&col.name) => columns.push(col.name.clone()),
                Some(_) => {}
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(DatasetError::UnknownColumns(missing).into());
        }

        let limit = request.limit;
        let mut seen: Vec<HashSet<DistinctKey>> = vec![HashSet::new(); columns.len()];
        let mut found: Vec<Vec<Value>> = vec![Vec::new(); columns.len()];
        let options = RecordsOptions::new()
            .buffer_length(request.buffer_length)
            .shape(Shape::Object)
            .columns(columns.iter().cloned());

        for row in self.read_records(options) {
            let row = row?;
            for (i, name) in columns.iter().enumerate() {
                if limit > 0 && found[i].len() >= limit {
                    continue;
                }
                match row.get(name) {
                    None | Some(Value::Null) => {}
                    Some(value) => {
                        if seen[i].insert(DistinctKey::from(value)) {
                            found[i].push(value.clone());
                        }
                    }
                }
            }
            if limit > 0 && found.iter().all(|f| f.len() >= limit) {
                debug!(limit, "every column reached its limit, stopping early");
                break;
            }
        }

        Ok(columns
            .into_iter()
            .zip(found)
            .map(|(name, mut values)| {
                if request.sort {
                    sort_values(&mut values);
                }
                (name, values)
            })
            .collect())
    }

    /// Data rows consumed from the currently open stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Whether the most recent read reached the end of the rows.
    #[must_use]
    pub fn all_rows_read(&self) -> bool {
        self.cursor.all_rows_read()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    #[must_use]
    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

/// Lazy iterator over rows, produced by [`DatasetReader::read_records`].
///
/// Stops after the first error.
pub struct Records<'a> {
    reader: &'a mut DatasetReader,
    request: DataRequest,
    buffer: VecDeque<Row>,
    done: bool,
}

impl Iterator for Records<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            let rows = match self.reader.get_data(&self.request) {
                Ok(rows) => rows,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            self.request.start = self.reader.position();
            if self.reader.all_rows_read() || rows.is_empty() {
                self.done = true;
            }
            self.buffer.extend(rows);
        }
    }
}
