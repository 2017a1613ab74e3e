//! Key material for the LCP Kernel.
//!
//! Wraps the user key and the content key with strong types. Neither type
//! implements `Serialize`, and both redact themselves in `Debug` output.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, DecryptError};

/// A 32-byte user key: SHA-256 of the user passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct UserKey([u8; 32]);

impl UserKey {
    /// Derive the key from a user passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(Sha256::digest(passphrase.as_bytes()).into())
    }

    /// Parse a hex-encoded passphrase hash, as handed over by a session.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes =
            hex::decode(s.trim()).map_err(|e| CoreError::InvalidUserKey(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| CoreError::InvalidUserKey(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self(arr))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserKey(..)")
    }
}

impl AsRef<[u8]> for UserKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The per-publication content key, 16 or 32 bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey(Vec<u8>);

impl ContentKey {
    /// Wrap decrypted key bytes, rejecting lengths AES cannot use.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecryptError> {
        match bytes.len() {
            16 | 32 => Ok(Self(bytes)),
            n => Err(DecryptError::InvalidKeyLength(n)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({} bytes)", self.0.len())
    }
}

impl AsRef<[u8]> for ContentKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
