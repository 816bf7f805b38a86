//! Testing utilities for dataset readers.
//!
//! This module ships what the crate's own tests use, for downstream tests of
//! code built on [`DatasetReader`](crate::DatasetReader):
//!
//! - **Fixtures**: [`DatasetFixture`] renders a dataset in either layout, with
//!   attributes split between header and footer on request; [`adsl_fixture`]
//!   is a deterministic 254-row subject-level dataset.
//! - **Temporary files**: [`TempDataset`] writes a fixture to a directory
//!   that disappears on drop.
//! - **Assertions**: row comparisons and predicates.
//!
//! # Quick Start
//!
//! ```no_run
//! use dsjson::testing::*;
//! use dsjson::{DataRequest, DatasetReader};
//!
//! # fn main() -> anyhow::Result<()> {
//! let file = TempDataset::ndjson(&adsl_fixture(), "adsl")?;
//! let mut reader = DatasetReader::open(file.path())?;
//! let rows = reader.get_data(&DataRequest::new().length(10))?;
//! assert_eq!(rows.len(), 10);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_io;

pub use assertions::*;
pub use fixtures::*;
pub use mock_io::*;
