//! Byte-level plumbing: opening files, decompression, text decoding and the
//! two document framings (event feed for array documents, line feed for
//! NDJSON).

pub mod compression;
pub mod encoding;
pub mod feed;
pub mod lines;
pub mod source;
