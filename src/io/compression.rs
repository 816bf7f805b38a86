//! Pluggable decompression for dataset documents.
//!
//! Dataset files are frequently shipped compressed (`adsl.json.gz`,
//! `adsl.ndjson.zst`). Every stream the reader opens passes through
//! [`auto_detect_reader`], so a compressed document is read exactly like a
//! plain one: forward-only, restartable from byte 0.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags:
//! - **Gzip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` (feature: `compression-xz`)
//!
//! Detection checks the file extension first and falls back to magic bytes.
//! Extra codecs can be added with [`register_codec`].

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{Arc, RwLock};

static CODEC_REGISTRY: RwLock<Vec<Arc<dyn DecompressionCodec>>> = RwLock::new(Vec::new());

fn builtin_codecs() -> Vec<Arc<dyn DecompressionCodec>> {
    vec![
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Arc::new(ZstdCodec),
        #[cfg(feature = "compression-bzip2")]
        Arc::new(Bzip2Codec),
        #[cfg(feature = "compression-xz")]
        Arc::new(XzCodec),
    ]
}

/// Built-in codecs followed by user-registered ones.
fn codecs() -> Vec<Arc<dyn DecompressionCodec>> {
    let mut all = builtin_codecs();
    // A poisoned lock still holds a valid list.
    let registered = CODEC_REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    all.extend(registered.iter().cloned());
    all
}

/// Register a custom codec. It is consulted after the built-in ones.
///
/// # Examples
/// ```
/// use dsjson::io::compression::{register_codec, DecompressionCodec};
/// use std::io::Read;
/// use std::sync::Arc;
///
/// struct Identity;
/// impl DecompressionCodec for Identity {
///     fn name(&self) -> &str { "identity" }
///     fn extensions(&self) -> &[&str] { &[".ident"] }
///     fn magic_bytes(&self) -> Option<&[u8]> { None }
///     fn wrap_reader_dyn(&self, r: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
///         Ok(r)
///     }
/// }
///
/// register_codec(Arc::new(Identity));
/// ```
pub fn register_codec(codec: Arc<dyn DecompressionCodec>) {
    let mut lock = CODEC_REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    lock.push(codec);
}

/// A decompression algorithm that can wrap a byte stream.
///
/// Implementations must be `Send + Sync` because they live in a global registry.
pub trait DecompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip").
    fn name(&self) -> &str;

    /// Lowercase file extensions with the leading dot (e.g., `&[".gz"]`).
    fn extensions(&self) -> &[&str];

    /// Magic byte signature, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap `reader` so that reads yield decompressed bytes.
    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;
}

fn detect_from_extension(path: &Path) -> Option<Arc<dyn DecompressionCodec>> {
    let path_str = path.to_string_lossy().to_lowercase();
    codecs()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| path_str.ends_with(ext)))
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<Arc<dyn DecompressionCodec>> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    codecs().into_iter().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| buf.len() >= magic.len() && buf.starts_with(magic))
    })
}

/// Strip a recognized compression suffix from a file name, so that
/// `adsl.ndjson.gz` can be classified by its inner extension.
#[must_use]
pub fn strip_compression_suffix(file_name: &str) -> &str {
    for codec in codecs() {
        for ext in codec.extensions() {
            let Some(cut) = file_name.len().checked_sub(ext.len()) else {
                continue;
            };
            if file_name.is_char_boundary(cut) && file_name[cut..].eq_ignore_ascii_case(ext) {
                return &file_name[..cut];
            }
        }
    }
    file_name
}

/// Wrap `reader` with a decompressor when the path or the leading bytes call
/// for one; otherwise return it buffered and untouched.
///
/// Note that a text file starting with `BZ` is indistinguishable from bzip2 by
/// magic bytes alone; dataset documents always start with `{`, so this cannot
/// trigger for well-formed input.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(path_hint.as_ref()) {
        return codec
            .wrap_reader_dyn(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buf_reader = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buf_reader) {
        return codec
            .wrap_reader_dyn(Box::new(buf_reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    Ok(Box::new(buf_reader))
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl DecompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl DecompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl DecompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x42, 0x5a, 0x68])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use bzip2::read::BzDecoder;
        Ok(Box::new(BzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl DecompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use xz2::read::XzDecoder;
        Ok(Box::new(XzDecoder::new(reader)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_input_passes_through() -> Result<()> {
        let mut r = auto_detect_reader(std::io::Cursor::new(b"{\"a\":1}".to_vec()), "x.json")?;
        let mut s = String::new();
        r.read_to_string(&mut s)?;
        assert_eq!(s, "{\"a\":1}");
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn suffix_is_stripped_for_known_codecs() {
        assert_eq!(strip_compression_suffix("adsl.ndjson.gz"), "adsl.ndjson");
        assert_eq!(strip_compression_suffix("adsl.ndjson"), "adsl.ndjson");
    }
}
