//! Error types for resource decryption.

use lcp_kernel_core::DecryptError;
use thiserror::Error;

/// Errors that make a single resource undecryptable.
///
/// These never affect the license or other resources.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The path is not in the manifest, or its algorithm has no decrypt
    /// target.
    #[error("unsupported encryption for '{path}': {reason}")]
    UnsupportedEncryption { path: String, reason: String },

    /// Block-cipher failure.
    #[error("decryption failed: {0}")]
    Decrypt(#[from] DecryptError),

    /// A binary string held a character above U+00FF.
    #[error("binary string has non-byte character U+{code_point:04X} at index {index}")]
    InvalidBinaryString { index: usize, code_point: u32 },

    /// Reading an external large object failed.
    #[error("blob read failed: {0}")]
    Blob(#[from] std::io::Error),

    /// Offloaded work did not complete.
    #[error("decryption task failed: {0}")]
    Task(String),
}

impl ResourceError {
    pub fn unsupported(path: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedEncryption {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for resource operations.
pub type Result<T> = std::result::Result<T, ResourceError>;
