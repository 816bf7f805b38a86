//! Temporary dataset files for tests.
//!
//! Each helper writes a [`DatasetFixture`] into its own temporary directory
//! that is removed when the returned handle is dropped.

use super::fixtures::DatasetFixture;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A dataset file living in a temporary directory.
pub struct TempDataset {
    #[allow(dead_code)]
    dir: TempDir,
    path: PathBuf,
}

impl TempDataset {
    fn in_new_dir(write: impl FnOnce(&Path) -> Result<PathBuf>) -> Result<Self> {
        let dir = TempDir::new().context("create temporary directory")?;
        let path = write(dir.path())?;
        Ok(Self { dir, path })
    }

    /// Write `fixture` as an array document named `<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written.
    pub fn json(fixture: &DatasetFixture, name: &str) -> Result<Self> {
        Self::in_new_dir(|dir| fixture.write_json(dir, &format!("{name}.json")))
    }

    /// Write `fixture` as NDJSON named `<name>.ndjson`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written.
    pub fn ndjson(fixture: &DatasetFixture, name: &str) -> Result<Self> {
        Self::in_new_dir(|dir| fixture.write_ndjson(dir, &format!("{name}.ndjson")))
    }

    /// Write raw document text under `file_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written.
    pub fn raw(file_name: &str, contents: impl AsRef<[u8]>) -> Result<Self> {
        Self::in_new_dir(|dir| {
            let path = dir.join(file_name);
            std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
            Ok(path)
        })
    }

    /// Write `fixture` gzip-compressed under `file_name`
    /// (e.g. `adsl.ndjson.gz`).
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written.
    #[cfg(feature = "compression-gzip")]
    pub fn gzip(fixture: &DatasetFixture, file_name: &str) -> Result<Self> {
        Self::in_new_dir(|dir| fixture.write_gzip(dir, file_name))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
