//! Dataset metadata model.
//!
//! Field names follow the Dataset-JSON wire format (`datasetJSONVersion`,
//! `itemOID`, ...) through serde renames; the Rust side uses snake case.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level attributes that must be present before any row is trusted.
pub const REQUIRED_ATTRIBUTES: [&str; 6] = [
    "datasetJSONCreationDateTime",
    "datasetJSONVersion",
    "records",
    "name",
    "label",
    "columns",
];

/// Every top-level attribute recognized as metadata. Anything else (including
/// `rows`) is ignored by the extractor.
pub const METADATA_ATTRIBUTES: [&str; 15] = [
    "datasetJSONCreationDateTime",
    "datasetJSONVersion",
    "dbLastModifiedDateTime",
    "fileOID",
    "originator",
    "sourceSystem",
    "itemGroupOID",
    "isReferenceData",
    "columns",
    "records",
    "name",
    "label",
    "studyOID",
    "metaDataVersionOID",
    "metaDataRef",
];

/// Declared value kind of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    String,
    Integer,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    Time,
    Datetime,
    Uri,
    /// A kind this reader does not know; kept verbatim.
    Other(String),
}

/// Comparison class a [`DataType`] maps to when filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Text,
    Number,
    Boolean,
}

impl DataType {
    /// Comparison class, or `None` for unrecognized kinds.
    #[must_use]
    pub fn class(&self) -> Option<ValueClass> {
        match self {
            Self::String | Self::Date | Self::Time | Self::Datetime | Self::Uri => {
                Some(ValueClass::Text)
            }
            Self::Integer | Self::Float | Self::Double | Self::Decimal => Some(ValueClass::Number),
            Self::Boolean => Some(ValueClass::Boolean),
            Self::Other(_) => None,
        }
    }

    /// ISO 8601 text kinds, which order lexicographically.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Datetime)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::Datetime => "datetime",
            Self::Uri => "URI",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "double" => Self::Double,
            "decimal" => Self::Decimal,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::Datetime,
            "URI" => Self::Uri,
            _ => Self::Other(value),
        }
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    #[serde(rename = "itemOID")]
    pub item_oid: String,
    pub name: String,
    pub label: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_data_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_sequence: Option<u32>,
}

/// System that produced the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSystem {
    pub name: String,
    pub version: String,
}

/// Schema-level description of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    #[serde(rename = "datasetJSONCreationDateTime")]
    pub created: String,
    #[serde(rename = "datasetJSONVersion")]
    pub version: String,
    pub records: u64,
    pub name: String,
    pub label: String,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_last_modified_date_time: Option<String>,
    #[serde(rename = "fileOID", default, skip_serializing_if = "Option::is_none")]
    pub file_oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_system: Option<SourceSystem>,
    #[serde(rename = "itemGroupOID", default, skip_serializing_if = "Option::is_none")]
    pub item_group_oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reference_data: Option<bool>,
    #[serde(rename = "studyOID", default, skip_serializing_if = "Option::is_none")]
    pub study_oid: Option<String>,
    #[serde(rename = "metaDataVersionOID", default, skip_serializing_if = "Option::is_none")]
    pub meta_data_version_oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data_ref: Option<String>,
}

impl DatasetMetadata {
    /// Index of the column named `name`, compared case-insensitively.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let needle = name.to_lowercase();
        self.columns
            .iter()
            .position(|c| c.name.to_lowercase() == needle)
    }

    /// Column descriptor by case-insensitive name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
