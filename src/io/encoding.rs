//! Declared text encodings.
//!
//! Dataset documents are UTF-8 in practice; Latin-1 exports from older SAS
//! sessions also show up, so they are transcoded to UTF-8 on the fly.

use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// Encoding of the bytes on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
    /// 7-bit ASCII, read as UTF-8.
    Ascii,
}

impl TextEncoding {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Latin1 => "latin1",
            Self::Ascii => "ascii",
        }
    }

    /// Wrap a raw byte stream so that it yields UTF-8.
    #[must_use]
    pub fn decoder(self, inner: Box<dyn Read>) -> Box<dyn Read> {
        match self {
            Self::Utf8 | Self::Ascii => inner,
            Self::Latin1 => Box::new(Latin1Decoder::new(inner)),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "latin1" | "binary" | "iso-8859-1" => Ok(Self::Latin1),
            "ascii" => Ok(Self::Ascii),
            _ => Err(DatasetError::UnsupportedEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = DatasetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TextEncoding> for String {
    fn from(value: TextEncoding) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latin-1 to UTF-8 transcoder. Bytes >= 0x80 expand to two output bytes.
struct Latin1Decoder {
    inner: Box<dyn Read>,
    raw: Vec<u8>,
    pending: Option<u8>,
}

impl Latin1Decoder {
    fn new(inner: Box<dyn Read>) -> Self {
        Self {
            inner,
            raw: vec![0; 8 * 1024],
            pending: None,
        }
    }
}

impl Read for Latin1Decoder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut written = 0;
        if let Some(b) = self.pending.take() {
            buf[0] = b;
            written = 1;
        }
        // Half the remaining space guarantees every input byte fits.
        let budget = (buf.len() - written) / 2;
        if budget == 0 {
            if written > 0 {
                return Ok(written);
            }
            let mut one = [0u8; 1];
            if self.inner.read(&mut one)? == 0 {
                return Ok(0);
            }
            let (lead, trail) = encode(one[0]);
            buf[0] = lead;
            self.pending = trail;
            return Ok(1);
        }
        let want = budget.min(self.raw.len());
        let n = self.inner.read(&mut self.raw[..want])?;
        for &b in &self.raw[..n] {
            let (lead, trail) = encode(b);
            buf[written] = lead;
            written += 1;
            if let Some(t) = trail {
                buf[written] = t;
                written += 1;
            }
        }
        Ok(written)
    }
}

fn encode(b: u8) -> (u8, Option<u8>) {
    if b < 0x80 {
        (b, None)
    } else {
        (0xc0 | (b >> 6), Some(0x80 | (b & 0x3f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("UTF-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("binary".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert_eq!(
            "ucs2".parse::<TextEncoding>().unwrap_err(),
            DatasetError::UnsupportedEncoding("ucs2".into())
        );
    }

    #[test]
    fn latin1_transcodes_high_bytes() {
        let bytes = vec![b'c', b'a', b'f', 0xe9, b'!'];
        let mut r = TextEncoding::Latin1.decoder(Box::new(io::Cursor::new(bytes)));
        let mut s = String::new();
        r.read_to_string(&mut s).unwrap();
        assert_eq!(s, "café!");
    }

    #[test]
    fn latin1_handles_one_byte_buffers() {
        let mut r = Latin1Decoder::new(Box::new(io::Cursor::new(vec![0xe9, b'x'])));
        let mut out = Vec::new();
        let mut one = [0u8; 1];
        while r.read(&mut one).unwrap() == 1 {
            out.push(one[0]);
        }
        assert_eq!(String::from_utf8(out).unwrap(), "éx");
    }
}
