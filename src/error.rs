//! Domain error taxonomy.
//!
//! Every public operation returns [`anyhow::Result`]; when a failure originates
//! in this crate the root cause is a [`DatasetError`], so callers can branch on
//! it with `err.downcast_ref::<DatasetError>()`.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by dataset readers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// The dataset file does not exist at construction time.
    #[error("could not read file {}", .0.display())]
    FileNotFound(PathBuf),

    /// The declared text encoding is not one the reader can decode.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The source ended before every required metadata attribute was seen.
    #[error("could not find required metadata elements: {}", .0.join(", "))]
    MissingMetadata(Vec<String>),

    /// Metadata was loaded but declares no columns.
    #[error("metadata is not loaded or there are no columns")]
    MetadataNotLoaded,

    /// The requested row window is out of range.
    #[error("invalid start/length parameter values (start {start}, length {length:?}, records {records})")]
    InvalidWindow {
        start: u64,
        length: Option<u64>,
        records: u64,
    },

    /// A filter condition names a column the dataset does not have.
    #[error("filter variable {0} not found")]
    UnknownColumn(String),

    /// One or more requested columns do not exist.
    #[error("columns {} not found", .0.join(", "))]
    UnknownColumns(Vec<String>),

    /// `connectors.len()` must be exactly `conditions.len() - 1`.
    #[error("filter has {conditions} conditions but {connectors} connectors")]
    ConnectorCount { conditions: usize, connectors: usize },

    /// The operator is unrecognized or not defined for the column's kind.
    #[error("unknown operator {operator} for variable {variable}")]
    UnknownOperator { variable: String, operator: String },

    /// The column's declared data type has no comparison class.
    #[error("variable {variable} has unsupported data type {data_type}")]
    UnsupportedKind { variable: String, data_type: String },

    /// The condition value does not fit its operator (e.g. `in` without a list).
    #[error("invalid value for {operator} on {variable}: {reason}")]
    InvalidOperand {
        variable: String,
        operator: String,
        reason: String,
    },

    /// The byte stream is not a well-formed dataset document.
    #[error("malformed dataset document at byte {offset}: {reason}")]
    MalformedDocument { offset: u64, reason: String },
}
