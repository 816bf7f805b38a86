//! Opening dataset files as fresh forward-only streams.

use crate::error::DatasetError;
use crate::io::compression::auto_detect_reader;
use crate::io::encoding::TextEncoding;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A boxed, buffered UTF-8 byte stream positioned somewhere in a document.
pub type DocumentStream = Box<dyn BufRead>;

/// Where a dataset lives and how its bytes are decoded.
///
/// Every call to [`StreamSource::open`] starts over at byte 0; dropping the
/// returned stream abandons it.
#[derive(Debug, Clone)]
pub struct StreamSource {
    path: PathBuf,
    encoding: TextEncoding,
}

impl StreamSource {
    /// Fails with [`DatasetError::FileNotFound`] when `path` is not a file.
    pub fn new(path: impl AsRef<Path>, encoding: TextEncoding) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(DatasetError::FileNotFound(path).into());
        }
        Ok(Self { path, encoding })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Open a new stream from the start of the file, decompressing and
    /// transcoding as needed.
    pub fn open(&self) -> Result<DocumentStream> {
        let path = &self.path;
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let raw = auto_detect_reader(f, path)
            .with_context(|| format!("setup decompression for {}", path.display()))?;
        Ok(Box::new(BufReader::new(self.encoding.decoder(raw))))
    }

    /// Modification time of the backing file, if the platform reports one.
    pub fn modified(&self) -> Result<Option<SystemTime>> {
        let meta = std::fs::metadata(&self.path)
            .with_context(|| format!("stat {}", self.path.display()))?;
        Ok(meta.modified().ok())
    }
}
