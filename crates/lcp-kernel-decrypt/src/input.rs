//! Ciphertext input representations.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;

use crate::error::{ResourceError, Result};

/// An external large object, read fully before decryption.
#[async_trait]
pub trait BlobSource: Send + Sync {
    /// Read the whole object.
    async fn read_all(&self) -> Result<Vec<u8>>;
}

/// A blob backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BlobSource for FileBlob {
    async fn read_all(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Encrypted resource bytes in one of the forms a caller may hold them.
pub enum Ciphertext {
    /// Raw bytes.
    Bytes(Bytes),
    /// One character per byte; every code point must be at most U+00FF.
    BinaryString(String),
    /// An external large object.
    Blob(Box<dyn BlobSource>),
}

impl Ciphertext {
    /// Normalize to raw bytes.
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.to_vec()),
            Self::BinaryString(s) => binary_string_to_bytes(&s),
            Self::Blob(blob) => blob.read_all().await,
        }
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Ciphertext::Bytes({} bytes)", bytes.len()),
            Self::BinaryString(s) => write!(f, "Ciphertext::BinaryString({} chars)", s.chars().count()),
            Self::Blob(_) => f.write_str("Ciphertext::Blob(..)"),
        }
    }
}

impl From<Vec<u8>> for Ciphertext {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Ciphertext {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

/// Convert a binary string (one char per byte) to bytes.
pub fn binary_string_to_bytes(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .enumerate()
        .map(|(index, ch)| {
            u8::try_from(u32::from(ch)).map_err(|_| ResourceError::InvalidBinaryString {
                index,
                code_point: u32::from(ch),
            })
        })
        .collect()
}

/// Convert bytes to a binary string (one char per byte).
pub fn bytes_to_binary_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_binary_string() {
        let bytes: Vec<u8> = (0..=255).collect();
        let s = bytes_to_binary_string(&bytes);
        assert_eq!(s.chars().count(), 256);
        assert_eq!(binary_string_to_bytes(&s).unwrap(), bytes);
    }

    #[test]
    fn test_binary_string_rejects_wide_chars() {
        match binary_string_to_bytes("ab\u{0100}") {
            Err(ResourceError::InvalidBinaryString { index, code_point }) => {
                assert_eq!(index, 2);
                assert_eq!(code_point, 0x100);
            }
            other => panic!("expected InvalidBinaryString, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_file_blob() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"encrypted bytes").unwrap();

        let ciphertext = Ciphertext::Blob(Box::new(FileBlob::new(file.path())));
        assert_eq!(ciphertext.into_bytes().await.unwrap(), b"encrypted bytes");
    }

    #[tokio::test]
    async fn test_missing_file_blob() {
        let dir = tempfile::tempdir().unwrap();
        let blob = FileBlob::new(dir.path().join("absent.bin"));
        assert!(matches!(blob.read_all().await, Err(ResourceError::Blob(_))));
    }
}
