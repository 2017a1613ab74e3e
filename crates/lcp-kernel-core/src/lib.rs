//! # LCP Kernel Core
//!
//! Pure primitives for the LCP Kernel: the license model, canonicalization,
//! license verification stages, and the AES-CBC primitive.
//!
//! This crate contains no I/O and no async. It is pure computation over
//! license documents and key material.
//!
//! ## Key Types
//!
//! - [`License`] - A parsed license: raw JSON plus a typed view
//! - [`UserKey`] / [`ContentKey`] - Key material with redacted `Debug`
//! - [`ProfilePolicy`] - Decides which licenses are official
//! - [`Certificate`] - The provider certificate embedded in a signature
//!
//! ## Verification stages
//!
//! [`check_fields`], [`check_user_key`], [`verify_signature`] and
//! [`derive_content_key`] are run in that order by the handler in the
//! `lcp-kernel` crate.

pub mod canonical;
pub mod certificate;
pub mod cipher;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod license;
pub mod profile;
pub mod signature;
pub mod validation;

pub use canonical::{canonical_json, license_signing_input};
pub use certificate::Certificate;
pub use crypto::{ContentKey, UserKey};
pub use error::{CoreError, DecryptError, FieldError, LicenseError, Result};
pub use keys::{check_user_key, derive_content_key, UserKeyCheck};
pub use license::{License, LicenseDocument};
pub use profile::{Profile, ProfilePolicy, BASIC_PROFILE, PROFILE_1_0};
pub use signature::{verify_signature, verify_signature_with, RSA_SHA256};
pub use validation::{check_fields, validate_fields, MANDATORY_FIELDS};
