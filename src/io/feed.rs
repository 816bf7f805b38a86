//! Pull-based event feed over a Dataset-JSON (array) document.
//!
//! The document is a single top-level object. Its attributes stream past as
//! [`DocumentEvent::Field`] events; the `rows` attribute is not materialized
//! but opened ([`DocumentEvent::RowsStart`], the "header" point), yielded one
//! element at a time ([`DocumentEvent::Row`]) and closed
//! ([`DocumentEvent::RowsEnd`]). Attributes after the rows follow, and the
//! closing brace produces [`DocumentEvent::End`] (the "footer" point).
//!
//! The feed only frames values at the byte level: it finds where one JSON
//! value ends and hands the framed bytes to `serde_json`. Nothing beyond the
//! current value is ever buffered, so a caller can stop pulling at any row and
//! resume later from exactly the next one.

use crate::error::DatasetError;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::BufRead;

/// Key of the top-level attribute holding the row array.
pub const ROWS_KEY: &str = "rows";

/// One step through a dataset document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// A top-level attribute other than `rows`.
    Field(String, Value),
    /// The row array has opened.
    RowsStart,
    /// One row of the row array.
    Row(Vec<Value>),
    /// The row array has closed.
    RowsEnd,
    /// The top-level object has closed.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Object { first: bool },
    Rows { first: bool },
    Done,
}

/// Event source over a buffered byte stream.
pub struct JsonFeed<R> {
    reader: R,
    offset: u64,
    state: State,
    skip_rows: bool,
    scratch: Vec<u8>,
}

impl<R: BufRead> JsonFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            state: State::Start,
            skip_rows: false,
            scratch: Vec::with_capacity(1024),
        }
    }

    /// When set, rows are skimmed without being parsed and no
    /// [`DocumentEvent::Row`] events are produced.
    pub fn skip_rows(mut self, skip: bool) -> Self {
        self.skip_rows = skip;
        self
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the feed is currently inside the row array.
    #[must_use]
    pub fn in_rows(&self) -> bool {
        matches!(self.state, State::Rows { .. })
    }

    /// Pull the next event; `None` once the document has been closed.
    pub fn next_event(&mut self) -> Result<Option<DocumentEvent>> {
        loop {
            match self.state {
                State::Start => {
                    self.skip_bom()?;
                    self.expect(b'{')?;
                    self.state = State::Object { first: true };
                }
                State::Object { first } => {
                    if self.skip_ws()? == Some(b'}') {
                        self.bump(1);
                        self.state = State::Done;
                        return Ok(Some(DocumentEvent::End));
                    }
                    if !first {
                        self.expect(b',')?;
                    }
                    let key = self.read_key()?;
                    self.expect(b':')?;
                    self.state = State::Object { first: false };
                    if key == ROWS_KEY && self.skip_ws()? == Some(b'[') {
                        self.bump(1);
                        self.state = State::Rows { first: true };
                        return Ok(Some(DocumentEvent::RowsStart));
                    }
                    self.capture_value()?;
                    let value: Value = serde_json::from_slice(&self.scratch)
                        .with_context(|| format!("parse attribute {key}"))?;
                    // `"rows": null` is a document without a row section.
                    if key == ROWS_KEY && !value.is_null() {
                        return Err(self.malformed("rows must be an array or null"));
                    }
                    return Ok(Some(DocumentEvent::Field(key, value)));
                }
                State::Rows { first } => {
                    if self.skip_ws()? == Some(b']') {
                        self.bump(1);
                        self.state = State::Object { first: false };
                        return Ok(Some(DocumentEvent::RowsEnd));
                    }
                    if !first {
                        self.expect(b',')?;
                    }
                    self.state = State::Rows { first: false };
                    let at = self.offset;
                    self.capture_value()?;
                    if self.skip_rows {
                        continue;
                    }
                    let row: Vec<Value> = serde_json::from_slice(&self.scratch)
                        .with_context(|| format!("parse row at byte {at}"))?;
                    return Ok(Some(DocumentEvent::Row(row)));
                }
                State::Done => return Ok(None),
            }
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> anyhow::Error {
        DatasetError::MalformedDocument {
            offset: self.offset,
            reason: reason.into(),
        }
        .into()
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        let buf = self
            .reader
            .fill_buf()
            .with_context(|| format!("read document at byte {}", self.offset))?;
        Ok(buf.first().copied())
    }

    fn bump(&mut self, n: usize) {
        self.reader.consume(n);
        self.offset += n as u64;
    }

    fn skip_ws(&mut self) -> Result<Option<u8>> {
        loop {
            match self.peek()? {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.bump(1),
                other => return Ok(other),
            }
        }
    }

    fn skip_bom(&mut self) -> Result<()> {
        let buf = self.reader.fill_buf().context("read document start")?;
        if buf.starts_with(&[0xef, 0xbb, 0xbf]) {
            self.bump(3);
        }
        Ok(())
    }

    fn expect(&mut self, want: u8) -> Result<()> {
        match self.skip_ws()? {
            Some(b) if b == want => {
                self.bump(1);
                Ok(())
            }
            Some(b) => Err(self.malformed(format!(
                "expected '{}', found '{}'",
                want as char, b as char
            ))),
            None => Err(self.malformed(format!(
                "expected '{}', found end of input",
                want as char
            ))),
        }
    }

    fn read_key(&mut self) -> Result<String> {
        if self.skip_ws()? != Some(b'"') {
            return Err(self.malformed("expected attribute name"));
        }
        self.scratch.clear();
        self.take_string()?;
        let key: String = serde_json::from_slice(&self.scratch).context("parse attribute name")?;
        Ok(key)
    }

    /// Copy the next complete JSON value into `scratch`.
    fn capture_value(&mut self) -> Result<()> {
        self.scratch.clear();
        match self.skip_ws()? {
            None => Err(self.malformed("expected a value, found end of input")),
            Some(b'"') => self.take_string(),
            Some(b'{' | b'[') => self.take_container(),
            Some(_) => self.take_scalar(),
        }
    }

    fn take_byte(&mut self) -> Result<u8> {
        match self.peek()? {
            Some(b) => {
                self.scratch.push(b);
                self.bump(1);
                Ok(b)
            }
            None => Err(self.malformed("unexpected end of input")),
        }
    }

    /// Copies a string literal, quotes included. The cursor sits on the
    /// opening quote.
    fn take_string(&mut self) -> Result<()> {
        self.take_byte()?;
        loop {
            let buf = self
                .reader
                .fill_buf()
                .with_context(|| format!("read document at byte {}", self.offset))?;
            if buf.is_empty() {
                return Err(self.malformed("unterminated string"));
            }
            match buf.iter().position(|&b| b == b'"' || b == b'\\') {
                Some(i) => {
                    let special = buf[i];
                    self.scratch.extend_from_slice(&buf[..=i]);
                    self.bump(i + 1);
                    if special == b'"' {
                        return Ok(());
                    }
                    // Escaped character; copied verbatim.
                    self.take_byte()?;
                }
                None => {
                    let n = buf.len();
                    self.scratch.extend_from_slice(buf);
                    self.bump(n);
                }
            }
        }
    }

    fn take_container(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peek()? {
                None => return Err(self.malformed("unterminated array or object")),
                Some(b'"') => self.take_string()?,
                Some(b'{' | b'[') => {
                    depth += 1;
                    self.take_byte()?;
                }
                Some(b'}' | b']') => {
                    depth -= 1;
                    self.take_byte()?;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => {
                    self.take_byte()?;
                }
            }
        }
    }

    fn take_scalar(&mut self) -> Result<()> {
        loop {
            match self.peek()? {
                None | Some(b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}') => return Ok(()),
                Some(_) => {
                    self.take_byte()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn events(doc: &str, skip: bool) -> Result<Vec<DocumentEvent>> {
        let mut feed = JsonFeed::new(Cursor::new(doc.as_bytes().to_vec())).skip_rows(skip);
        let mut out = Vec::new();
        while let Some(ev) = feed.next_event()? {
            out.push(ev);
        }
        Ok(out)
    }

    #[test]
    fn emits_header_rows_and_footer() -> Result<()> {
        let doc = r#"{ "name": "DM", "records": 2,
            "rows": [["a, \"b\"]", 1.5], [null, -2e3]],
            "label": "Demo" }"#;
        assert_eq!(
            events(doc, false)?,
            vec![
                DocumentEvent::Field("name".into(), json!("DM")),
                DocumentEvent::Field("records".into(), json!(2)),
                DocumentEvent::RowsStart,
                DocumentEvent::Row(vec![json!("a, \"b\"]"), json!(1.5)]),
                DocumentEvent::Row(vec![json!(null), json!(-2000.0)]),
                DocumentEvent::RowsEnd,
                DocumentEvent::Field("label".into(), json!("Demo")),
                DocumentEvent::End,
            ]
        );
        Ok(())
    }

    #[test]
    fn null_rows_is_an_ordinary_field() -> Result<()> {
        let doc = r#"{"name":"DM","rows": null,"label":"Demo"}"#;
        assert_eq!(
            events(doc, true)?,
            vec![
                DocumentEvent::Field("name".into(), json!("DM")),
                DocumentEvent::Field("rows".into(), json!(null)),
                DocumentEvent::Field("label".into(), json!("Demo")),
                DocumentEvent::End,
            ]
        );
        let err = events(r#"{"rows": 5}"#, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::MalformedDocument { .. })
        ));
        Ok(())
    }

    #[test]
    fn skipping_rows_still_reports_boundaries() -> Result<()> {
        let doc = "\u{feff}{\"rows\":[[1],[2]],\"columns\":[{\"a\":[1,{\"b\":\"}\"}]}]}";
        assert_eq!(
            events(doc, true)?,
            vec![
                DocumentEvent::RowsStart,
                DocumentEvent::RowsEnd,
                DocumentEvent::Field("columns".into(), json!([{"a": [1, {"b": "}"}]}])),
                DocumentEvent::End,
            ]
        );
        Ok(())
    }

    #[test]
    fn resumes_exactly_after_the_last_row() -> Result<()> {
        let mut feed = JsonFeed::new(Cursor::new(br#"{"rows":[[1],[2],[3]]}"#.to_vec()));
        assert_eq!(feed.next_event()?, Some(DocumentEvent::RowsStart));
        assert_eq!(feed.next_event()?, Some(DocumentEvent::Row(vec![json!(1)])));
        assert!(feed.in_rows());
        assert_eq!(feed.next_event()?, Some(DocumentEvent::Row(vec![json!(2)])));
        assert_eq!(feed.next_event()?, Some(DocumentEvent::Row(vec![json!(3)])));
        assert_eq!(feed.next_event()?, Some(DocumentEvent::RowsEnd));
        assert_eq!(feed.next_event()?, Some(DocumentEvent::End));
        assert_eq!(feed.next_event()?, None);
        Ok(())
    }

    #[test]
    fn truncated_document_is_malformed() {
        let err = events(r#"{"rows":[[1],[2"#, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::MalformedDocument { .. })
        ));
    }
}
