//! Line-at-a-time access for NDJSON documents.

use anyhow::{Context, Result};
use std::io::BufRead;

/// Pulls one text line at a time, without the trailing `\n` / `\r\n`.
pub struct LineFeed<R> {
    reader: R,
    line_no: u64,
    buf: String,
}

impl<R: BufRead> LineFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// 1-based number of the line most recently returned.
    #[must_use]
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Next line, or `None` at end of stream.
    pub fn next_line(&mut self) -> Result<Option<&str>> {
        self.buf.clear();
        let n = self
            .reader
            .read_line(&mut self.buf)
            .with_context(|| format!("read line {}", self.line_no + 1))?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let trimmed = self.buf.trim_end_matches(['\n', '\r']).len();
        self.buf.truncate(trimmed);
        Ok(Some(self.buf.as_str()))
    }
}
