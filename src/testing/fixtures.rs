//! Deterministic dataset documents for tests.

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

/// Creation timestamp written into every fixture.
pub const FIXTURE_CREATED: &str = "2024-03-01T10:00:00";

/// Builder for a dataset document in either layout.
///
/// Attributes are written before the rows unless moved to the footer with
/// [`DatasetFixture::in_footer`].
///
/// # Example
///
/// ```
/// use dsjson::testing::DatasetFixture;
/// use serde_json::json;
///
/// let doc = DatasetFixture::new("DM", "Demographics")
///     .column("USUBJID", "string")
///     .column("AGE", "integer")
///     .row(vec![json!("01-001"), json!(42)])
///     .to_json_string();
/// assert!(doc.contains("\"rows\""));
/// ```
#[derive(Debug, Clone)]
pub struct DatasetFixture {
    name: String,
    label: String,
    columns: Vec<Value>,
    rows: Vec<Vec<Value>>,
    extra: Map<String, Value>,
    footer: Vec<String>,
    omitted: Vec<String>,
    records: Option<u64>,
}

impl DatasetFixture {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            extra: Map::new(),
            footer: Vec::new(),
            omitted: Vec::new(),
            records: None,
        }
    }

    /// Append a column of the given wire data type.
    #[must_use]
    pub fn column(mut self, name: &str, data_type: &str) -> Self {
        self.columns.push(json!({
            "itemOID": format!("IT.{}.{name}", self.name),
            "name": name,
            "label": name,
            "dataType": data_type,
        }));
        self
    }

    #[must_use]
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Set an extra top-level attribute (e.g. `studyOID`).
    #[must_use]
    pub fn attribute(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Write these attributes after the row array instead of before it.
    #[must_use]
    pub fn in_footer<'a>(mut self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        self.footer.extend(keys.into_iter().map(str::to_string));
        self
    }

    /// Leave an attribute out of the document entirely.
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.omitted.push(key.to_string());
        self
    }

    /// Declare a record count different from the number of rows.
    #[must_use]
    pub fn declared_records(mut self, records: u64) -> Self {
        self.records = Some(records);
        self
    }

    #[must_use]
    pub fn row_values(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Rows keyed by column name.
    #[must_use]
    pub fn row_objects(&self) -> Vec<Map<String, Value>> {
        let names = self.column_names();
        self.rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned().chain(std::iter::repeat(Value::Null)))
                    .collect()
            })
            .collect()
    }

    /// Every metadata attribute in document order, minus omitted ones.
    #[must_use]
    pub fn metadata_object(&self) -> Map<String, Value> {
        let records = self.records.unwrap_or(self.rows.len() as u64);
        let mut m = Map::new();
        let mut put = |key: &str, value: Value| {
            if !self.omitted.iter().any(|k| k == key) {
                m.insert(key.to_string(), value);
            }
        };
        put("datasetJSONCreationDateTime", json!(FIXTURE_CREATED));
        put("datasetJSONVersion", json!("1.1.0"));
        put("itemGroupOID", json!(format!("IG.{}", self.name)));
        put("records", json!(records));
        put("name", json!(self.name));
        put("label", json!(self.label));
        put("columns", Value::Array(self.columns.clone()));
        for (key, value) in &self.extra {
            put(key, value.clone());
        }
        m
    }

    /// Render as an array document.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        let field = |(k, v): (&String, &Value)| format!("{}:{v}", Value::String(k.clone()));
        let meta = self.metadata_object();
        let in_footer = |k: &String| self.footer.contains(k);

        let mut parts: Vec<String> = meta.iter().filter(|(k, _)| !in_footer(*k)).map(field).collect();
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|r| Value::Array(r.clone()).to_string())
            .collect();
        parts.push(format!("\"rows\":[\n{}\n]", rows.join(",\n")));
        parts.extend(meta.iter().filter(|(k, _)| in_footer(*k)).map(field));
        format!("{{\n{}\n}}\n", parts.join(",\n"))
    }

    /// Render as NDJSON: the metadata line, then one row per line.
    #[must_use]
    pub fn to_ndjson_string(&self) -> String {
        let mut out = Value::Object(self.metadata_object()).to_string();
        out.push('\n');
        for row in &self.rows {
            out.push_str(&Value::Array(row.clone()).to_string());
            out.push('\n');
        }
        out
    }

    pub fn write_json(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        write_text(dir, file_name, &self.to_json_string())
    }

    pub fn write_ndjson(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        write_text(dir, file_name, &self.to_ndjson_string())
    }

    /// Write a gzip-compressed document; the layout follows the file name.
    #[cfg(feature = "compression-gzip")]
    pub fn write_gzip(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let text = if file_name.contains(".ndjson") {
            self.to_ndjson_string()
        } else {
            self.to_json_string()
        };
        let path = dir.join(file_name);
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create {}", path.display()))?;
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(text.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        enc.finish()
            .with_context(|| format!("finish {}", path.display()))?;
        Ok(path)
    }
}

fn write_text(dir: &Path, file_name: &str, text: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Disposition text used to exercise filters on nullable text columns.
pub const TERMINATED_BY_SPONSOR: &str = "STUDY TERMINATED BY SPONSOR";

const RACES: [&str; 3] = ["WHITE", "BLACK OR AFRICAN AMERICAN", "ASIAN"];
const ARMS: [&str; 3] = ["Placebo", "Xanomeline Low Dose", "Xanomeline High Dose"];

/// A 254-subject, subject-level analysis dataset with one column of every
/// comparison class.
///
/// Columns: `STUDYID`, `USUBJID`, `AGE` (integer), `SEX`, `RACE`, `TRT01P`,
/// `DCDECOD` (nullable), `TRTSDT` (date), `HEIGHTBL` (decimal, as text),
/// `SAFFL` (boolean).
#[must_use]
pub fn adsl_fixture() -> DatasetFixture {
    let rows = (0..254u64).map(|i| {
        let dcdecod = if i % 11 == 0 {
            json!(TERMINATED_BY_SPONSOR)
        } else if i % 5 == 0 {
            json!("ADVERSE EVENT")
        } else if i % 4 == 0 {
            Value::Null
        } else {
            json!("COMPLETED")
        };
        let race = if i % 31 == 0 {
            "AMERICAN INDIAN OR ALASKA NATIVE"
        } else {
            RACES[(i % 7).saturating_sub(4) as usize]
        };
        vec![
            json!("CDISCPILOT01"),
            json!(format!("01-701-{:04}", 1001 + i)),
            json!(50 + (i * 37) % 40),
            json!(if (i * 7) % 5 < 3 { "F" } else { "M" }),
            json!(race),
            json!(ARMS[(i % 3) as usize]),
            dcdecod,
            json!(format!("2013-{:02}-{:02}", 1 + i % 12, 1 + i % 28)),
            json!(format!("{}.{}", 150 + (i * 13) % 40, i % 10)),
            json!(i % 9 != 0),
        ]
    });

    DatasetFixture::new("ADSL", "Subject-Level Analysis Dataset")
        .column("STUDYID", "string")
        .column("USUBJID", "string")
        .column("AGE", "integer")
        .column("SEX", "string")
        .column("RACE", "string")
        .column("TRT01P", "string")
        .column("DCDECOD", "string")
        .column("TRTSDT", "date")
        .column("HEIGHTBL", "decimal")
        .column("SAFFL", "boolean")
        .attribute("studyOID", json!("CDISCPILOT01"))
        .rows(rows)
}

/// Number of fixture rows for which `predicate` holds.
///
/// # Example
///
/// ```
/// use dsjson::testing::{adsl_fixture, expected_count};
///
/// let adsl = adsl_fixture();
/// let over_80 = expected_count(&adsl, |r| r["AGE"].as_u64().is_some_and(|a| a > 80));
/// assert!(over_80 > 0);
/// ```
pub fn expected_count(
    fixture: &DatasetFixture,
    predicate: impl Fn(&Map<String, Value>) -> bool,
) -> usize {
    fixture.row_objects().iter().filter(|r| predicate(r)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adsl_is_deterministic_and_well_formed() {
        let a = adsl_fixture();
        assert_eq!(a.row_values().len(), 254);
        assert!(a.row_values().iter().all(|r| r.len() == 10));
        assert_eq!(a.to_json_string(), adsl_fixture().to_json_string());
        let parsed: Value = serde_json::from_str(&a.to_json_string()).unwrap();
        assert_eq!(parsed["records"], json!(254));
        assert_eq!(parsed["rows"].as_array().map(Vec::len), Some(254));
    }

    #[test]
    fn footer_attributes_follow_rows() {
        let doc = DatasetFixture::new("DM", "Demographics")
            .column("AGE", "integer")
            .row(vec![json!(1)])
            .in_footer(["records", "columns"])
            .to_json_string();
        let rows_at = doc.find("\"rows\"").unwrap();
        assert!(doc.find("\"records\"").unwrap() > rows_at);
        assert!(doc.find("\"name\"").unwrap() < rows_at);
    }

    #[test]
    fn ndjson_has_one_metadata_line() {
        let text = adsl_fixture().to_ndjson_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 255);
        let meta: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(meta["name"], json!("ADSL"));
    }
}
