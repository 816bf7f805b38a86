//! # dsjson
//!
//! A **streaming reader** for Dataset-JSON documents: tabular datasets stored
//! as JSON with ordered column metadata and either an embedded `rows` array
//! or one row per line (NDJSON). Files of any size are read without loading
//! them into memory.
//!
//! ## Key Features
//!
//! - **Metadata extraction** - header, footer, or split between the two; the
//!   scan stops as soon as every required attribute has been seen
//! - **Row windows** - any `(start, start + length]` slice, with consecutive
//!   forward windows continuing from the open stream instead of re-reading
//! - **Filters** - declarative `and`/`or` condition lists compiled once per
//!   request, with typed comparisons, regexes and case folding
//! - **Full scans** - a lazy iterator over every row, read in chunks
//! - **Distinct values** - per-column unique values with limits and sorting
//! - **Compressed input** - gzip, zstd, bzip2 and xz (all optional via feature
//!   flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use dsjson::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let mut reader = DatasetReader::open("adsl.ndjson")?;
//! println!("{} rows", reader.metadata()?.records);
//!
//! // Rows 1 to 5 of the male subjects over 80, as objects.
//! let filter = Filter::new(FilterCondition::new("AGE", "gt", 80))
//!     .and(FilterCondition::new("SEX", "eq", "M"));
//! let rows = reader.get_data(
//!     &DataRequest::new()
//!         .length(5)
//!         .shape(Shape::Object)
//!         .columns(["USUBJID", "AGE"])
//!         .filter(filter),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Paging and full scans
//!
//! `start` is exclusive: the page after `start = 0, length = 100` is
//! `start = 100`. Reading pages in order parses each row once; going back
//! reopens the file.
//!
//! ```no_run
//! use dsjson::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let mut reader = DatasetReader::open("adsl.json")?;
//! let mut total = 0;
//! for row in reader.read_records(RecordsOptions::new().buffer_length(500)) {
//!     let _row = row?;
//!     total += 1;
//! }
//!
//! let uniques = reader.unique_values(&UniqueValuesRequest::new(["SEX", "RACE"]).limit(10))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`anyhow::Result`]. Domain failures carry a
//! [`DatasetError`] as their root cause:
//!
//! ```ignore
//! match reader.get_data(&request) {
//!     Err(e) if matches!(e.downcast_ref(), Some(DatasetError::InvalidWindow { .. })) => {}
//!     other => { other?; }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`reader`] - [`DatasetReader`] and its request types
//! - [`cursor`] - resumable row windows over a forward-only stream
//! - [`filter`] - filter model, compilation and evaluation
//! - [`extract`] - metadata extraction from either layout
//! - [`metadata`] - the dataset schema model
//! - [`io`] - file opening, decompression, text decoding and framing
//! - [`testing`] - fixtures and helpers for tests

pub mod cursor;
pub mod error;
pub mod extract;
pub mod filter;
pub mod io;
pub mod metadata;
pub mod reader;
pub mod row;
pub mod testing;
pub mod utils;

// Re-exports
pub use cursor::{CursorState, DocumentFormat};
pub use error::DatasetError;
pub use filter::{CompiledFilter, Connector, Filter, FilterCondition, FilterOptions, Operator};
pub use io::encoding::TextEncoding;
pub use metadata::{ColumnDescriptor, DataType, DatasetMetadata, SourceSystem};
pub use reader::{
    DataRequest, DatasetReader, ReaderOptions, Records, RecordsOptions, UniqueValuesRequest,
};
pub use row::{Row, Shape};
