//! Post-decryption decompression.

use flate2::read::DeflateDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::warn;

/// ZIP compression method code for DEFLATE.
pub const METHOD_DEFLATE: u8 = 8;

/// How a resource was compressed before it was encrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Compression {
    #[default]
    Stored,
    /// Raw DEFLATE (no zlib header), method 8.
    Deflate,
}

impl From<u8> for Compression {
    fn from(method: u8) -> Self {
        if method == METHOD_DEFLATE {
            Self::Deflate
        } else {
            Self::Stored
        }
    }
}

impl From<Compression> for u8 {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Stored => 0,
            Compression::Deflate => METHOD_DEFLATE,
        }
    }
}

/// Undo `compression` on decrypted bytes.
///
/// A failed inflate is logged and the bytes are returned as they came.
pub fn decompress(compression: Compression, data: Vec<u8>) -> Vec<u8> {
    match compression {
        Compression::Stored => data,
        Compression::Deflate => {
            let mut inflated = Vec::with_capacity(data.len() * 2);
            match DeflateDecoder::new(data.as_slice()).read_to_end(&mut inflated) {
                Ok(_) => inflated,
                Err(e) => {
                    warn!(error = %e, len = data.len(), "inflate failed, using data as stored");
                    data
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_inflate() {
        let original = b"<html><body>hello hello hello hello</body></html>".repeat(20);
        assert_eq!(decompress(Compression::Deflate, deflate(&original)), original);
    }

    #[test]
    fn test_inflate_failure_falls_back() {
        let garbage = vec![0xFFu8; 64];
        assert_eq!(decompress(Compression::Deflate, garbage.clone()), garbage);
    }

    #[test]
    fn test_stored_passthrough() {
        assert_eq!(decompress(Compression::Stored, b"raw".to_vec()), b"raw");
    }

    #[test]
    fn test_method_codes() {
        assert_eq!(Compression::from(8), Compression::Deflate);
        assert_eq!(Compression::from(0), Compression::Stored);
        assert_eq!(Compression::from(12), Compression::Stored);
        assert_eq!(u8::from(Compression::Deflate), 8);
    }
}
