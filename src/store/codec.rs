//! Compression and content addressing for stored snapshots.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};

/// Gzip-compresses `raw`.
///
/// The gzip header carries no timestamp, so identical input always yields
/// identical output and therefore an identical [`content_hash`].
pub fn compress(raw: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

pub fn decompress(compressed: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(compressed).read_to_end(&mut out)?;
    Ok(out)
}

/// Lowercase hex SHA-256 of the compressed bytes.
pub fn content_hash(compressed: &[u8]) -> String {
    format!("{:x}", Sha256::digest(compressed))
}
