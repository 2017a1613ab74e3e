//! # LCP Kernel
//!
//! The unified API for opening LCP-protected publications: license
//! verification and resource decryption.
//!
//! ## Overview
//!
//! A [`LicenseHandler`] is created per publication. It:
//!
//! - **Verifies** one license: fields, user key, signature, content key
//! - **Decrypts** resources listed in the publication's encryption manifest
//! - **Delegates** official licenses to an external decryptor over a channel
//! - **De-obfuscates** embedded fonts, which needs no license
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lcp_kernel::{HandlerConfig, LicenseHandler, OutputMode};
//! use lcp_kernel::core::{License, UserKey};
//! use lcp_kernel::decrypt::{EncryptionDescriptor, EncryptionManifest};
//!
//! async fn example(license_json: &[u8], chapter: Vec<u8>) {
//!     let manifest = EncryptionManifest::build(EncryptionDescriptor::default());
//!     let user_key = UserKey::from_passphrase("reader passphrase");
//!     let handler = LicenseHandler::new(manifest, user_key, HandlerConfig::default());
//!
//!     let license = License::from_bytes(license_json).unwrap();
//!     handler.check_license(&license).await.unwrap();
//!
//!     let text = handler
//!         .decrypt_resource("OEBPS/chapter1.xhtml", chapter.into(), OutputMode::Text, None)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `lcp_kernel::core` - License model, verification stages, AES-CBC
//! - `lcp_kernel::decrypt` - Manifest, engine, font de-obfuscation
//! - `lcp_kernel::channel` - Delegated channel and pending requests

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;

// Re-export component crates
pub use lcp_kernel_channel as channel;
pub use lcp_kernel_core as core;
pub use lcp_kernel_decrypt as decrypt;

// Re-export main types for convenience
pub use config::HandlerConfig;
pub use error::{HandlerError, Result};
pub use handler::{LicenseHandler, LicenseState, LicenseStatus, Session, Stage, Strategy};

// Re-export commonly used component types
pub use lcp_kernel_channel::{DecryptChannel, MemoryChannel, RemoteEnd};
pub use lcp_kernel_core::{License, LicenseError, UserKey};
pub use lcp_kernel_decrypt::{Ciphertext, EncryptionManifest, OutputMode, Plaintext};
