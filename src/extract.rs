//! Metadata extraction.
//!
//! Array documents may carry their attributes before the rows, after them, or
//! split across both. The extractor records recognized attributes as they
//! stream past and checks coverage at the two points where it can change
//! meaningfully: when the row array opens (header) and when the document
//! closes (footer). The first check that finds every required attribute wins
//! and the caller drops the stream without reading further.
//!
//! NDJSON documents hold all metadata on their first line.

use crate::error::DatasetError;
use crate::io::feed::{DocumentEvent, JsonFeed};
use crate::metadata::{DatasetMetadata, METADATA_ATTRIBUTES, REQUIRED_ATTRIBUTES};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::BufRead;
use tracing::{debug, trace};

/// Accumulates metadata attributes until the required set is covered.
#[derive(Debug, Default)]
pub struct MetadataExtractor {
    attributes: Map<String, Value>,
    seen: HashSet<&'static str>,
}

impl MetadataExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attribute. Returns `false` when `key` is not metadata.
    pub fn record(&mut self, key: &str, value: Value) -> bool {
        let Some(known) = METADATA_ATTRIBUTES.iter().find(|k| **k == key) else {
            return false;
        };
        self.seen.insert(*known);
        self.attributes.insert(key.to_string(), value);
        true
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        REQUIRED_ATTRIBUTES.iter().all(|k| self.seen.contains(k))
    }

    /// Required attributes not yet seen, in declaration order.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        REQUIRED_ATTRIBUTES
            .iter()
            .filter(|k| !self.seen.contains(*k))
            .map(|k| (*k).to_string())
            .collect()
    }

    /// Build the metadata, or fail naming every missing required attribute.
    pub fn finish(self) -> Result<DatasetMetadata> {
        if !self.is_complete() {
            return Err(DatasetError::MissingMetadata(self.missing()).into());
        }
        serde_json::from_value(Value::Object(self.attributes)).context("parse dataset metadata")
    }

    /// Drive an array-document feed until metadata is complete.
    ///
    /// Rows are skimmed, not parsed. The feed is left wherever extraction
    /// stopped; callers are expected to drop it.
    pub fn read_feed<R: BufRead>(mut self, feed: &mut JsonFeed<R>) -> Result<DatasetMetadata> {
        while let Some(event) = feed.next_event()? {
            match event {
                DocumentEvent::Field(key, value) => {
                    if !self.record(&key, value) {
                        trace!(attribute = %key, "ignoring non-metadata attribute");
                    }
                }
                DocumentEvent::RowsStart => {
                    if self.is_complete() {
                        debug!(offset = feed.offset(), "metadata complete at header");
                        return self.finish();
                    }
                    trace!(missing = ?self.missing(), "metadata incomplete at header, scanning for footer");
                }
                DocumentEvent::End => {
                    debug!(offset = feed.offset(), complete = self.is_complete(), "reached footer");
                    break;
                }
                DocumentEvent::Row(_) | DocumentEvent::RowsEnd => {}
            }
        }
        self.finish()
    }

    /// Parse the metadata line of an NDJSON document. No other line is
    /// consulted.
    pub fn read_first_line(mut self, line: Option<&str>) -> Result<DatasetMetadata> {
        let Some(line) = line else {
            return self.finish();
        };
        let parsed: Value = serde_json::from_str(line).context("parse NDJSON metadata line")?;
        let Value::Object(attributes) = parsed else {
            return Err(DatasetError::MalformedDocument {
                offset: 0,
                reason: "first line is not a JSON object".into(),
            }
            .into());
        };
        for (key, value) in attributes {
            self.record(&key, value);
        }
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    const COLUMNS: &str =
        r#"[{"itemOID":"IT.AGE","name":"AGE","label":"Age","dataType":"integer"}]"#;

    fn feed(doc: String) -> JsonFeed<Cursor<Vec<u8>>> {
        JsonFeed::new(Cursor::new(doc.into_bytes())).skip_rows(true)
    }

    #[test]
    fn stops_at_header_when_complete() -> Result<()> {
        let doc = format!(
            r#"{{"datasetJSONCreationDateTime":"2024-01-01T00:00:00","datasetJSONVersion":"1.1.0",
               "records":1,"name":"DM","label":"Demographics","columns":{COLUMNS},
               "rows":[[42]"#
        );
        // Truncated after the first row: completing at the header means the
        // broken tail is never read.
        let mut f = feed(doc);
        let meta = MetadataExtractor::new().read_feed(&mut f)?;
        assert_eq!(meta.records, 1);
        assert_eq!(meta.columns[0].name, "AGE");
        assert!(f.in_rows());
        Ok(())
    }

    #[test]
    fn merges_header_and_footer() -> Result<()> {
        let doc = format!(
            r#"{{"datasetJSONCreationDateTime":"2024-01-01T00:00:00","name":"DM",
               "rows":[[1],[2]],
               "datasetJSONVersion":"1.1.0","records":2,"label":"Demographics",
               "columns":{COLUMNS},"studyOID":"S1"}}"#
        );
        let meta = MetadataExtractor::new().read_feed(&mut feed(doc))?;
        assert_eq!(meta.records, 2);
        assert_eq!(meta.study_oid.as_deref(), Some("S1"));
        Ok(())
    }

    #[test]
    fn names_every_missing_attribute() {
        let doc = r#"{"name":"DM","rows":[],"records":0}"#.to_string();
        let err = MetadataExtractor::new().read_feed(&mut feed(doc)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatasetError>(),
            Some(&DatasetError::MissingMetadata(vec![
                "datasetJSONCreationDateTime".into(),
                "datasetJSONVersion".into(),
                "label".into(),
                "columns".into(),
            ]))
        );
    }

    #[test]
    fn ndjson_metadata_comes_from_the_first_line_only() -> Result<()> {
        let line = json!({
            "datasetJSONCreationDateTime": "2024-01-01T00:00:00",
            "datasetJSONVersion": "1.1.0",
            "records": 3,
            "name": "DM",
            "label": "Demographics",
            "columns": serde_json::from_str::<Value>(COLUMNS)?,
            "unrelated": true
        })
        .to_string();
        let meta = MetadataExtractor::new().read_first_line(Some(&line))?;
        assert_eq!(meta.name, "DM");

        let err = MetadataExtractor::new().read_first_line(None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::MissingMetadata(m)) if m.len() == 6
        ));
        Ok(())
    }
}
