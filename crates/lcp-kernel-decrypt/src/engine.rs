//! Streaming decryption engine for content-key encrypted resources.
//!
//! Per resource: normalize the ciphertext to bytes, decrypt with the content
//! key in fixed windows, inflate when the manifest says so, then shape the
//! result into the requested output form.

use lcp_kernel_core::{cipher, ContentKey};
use std::sync::Arc;
use tracing::debug;

use crate::compression::decompress;
use crate::error::Result;
use crate::input::Ciphertext;
use crate::manifest::ManifestEntry;
use crate::output::{shape, OutputMode, Plaintext};

/// Decrypts resources with one content key.
#[derive(Debug, Clone)]
pub struct Engine {
    key: Arc<ContentKey>,
}

impl Engine {
    pub fn new(key: Arc<ContentKey>) -> Self {
        Self { key }
    }

    /// Decrypt a resource from any input representation.
    pub async fn decrypt_resource(
        &self,
        ciphertext: Ciphertext,
        entry: &ManifestEntry,
        mode: OutputMode,
        media_type: &str,
    ) -> Result<Plaintext> {
        let bytes = ciphertext.into_bytes().await?;
        self.decrypt_payload(&bytes, entry, mode, media_type)
    }

    /// Decrypt already normalized bytes.
    ///
    /// CPU-bound; callers on an async runtime may run it on a blocking thread.
    pub fn decrypt_payload(
        &self,
        data: &[u8],
        entry: &ManifestEntry,
        mode: OutputMode,
        media_type: &str,
    ) -> Result<Plaintext> {
        let plaintext = cipher::decrypt(self.key.as_bytes(), data)?;
        let plaintext = decompress(entry.compression, plaintext);
        debug!(
            encrypted = data.len(),
            decrypted = plaintext.len(),
            ?mode,
            "resource decrypted"
        );
        Ok(shape(plaintext, mode, media_type))
    }
}
