//! # LCP Kernel Decrypt
//!
//! Resource-level decryption for a protected publication.
//!
//! ## Overview
//!
//! A publication's encryption descriptor lists which resources are
//! encrypted and how. The [`EncryptionManifest`] indexes it by normalized
//! path; the [`Engine`] decrypts content-key encrypted resources; the
//! [`obfuscation`] module undoes font obfuscation, which needs no license.
//!
//! ## Pipeline
//!
//! 1. **Input**: [`Ciphertext`] as bytes, a binary string, or a [`BlobSource`]
//! 2. **Decrypt**: AES-CBC, IV in the first block, windowed
//! 3. **Decompress**: raw DEFLATE when the manifest records method 8
//! 4. **Shape**: [`OutputMode::Text`], [`OutputMode::Base64`] or
//!    [`OutputMode::Binary`]

pub mod algorithm;
pub mod compression;
pub mod engine;
pub mod error;
pub mod input;
pub mod manifest;
pub mod media_type;
pub mod obfuscation;
pub mod output;

pub use algorithm::Algorithm;
pub use compression::Compression;
pub use engine::Engine;
pub use error::{ResourceError, Result};
pub use input::{BlobSource, Ciphertext, FileBlob};
pub use manifest::{
    EncryptionDescriptor, EncryptionManifest, ManifestEntry, ResourceDescriptor, LCP_RETRIEVAL_KEY,
};
pub use output::{OutputMode, Plaintext};
