//! # LCP Kernel Testkit
//!
//! Testing utilities for the LCP Kernel.
//!
//! ## Golden Vectors
//!
//! Canonical JSON and key derivation vectors that every reading system must
//! reproduce byte for byte.
//!
//! ## Generators
//!
//! Proptest strategies for licenses ids, passphrases, JSON trees and
//! encrypted resources.
//!
//! ## Fixtures
//!
//! Signed licenses over a throwaway RSA issuer with a self-signed
//! certificate, plus helpers to package resources the way a publication
//! stores them.
//!
//! ```rust,no_run
//! use lcp_kernel_testkit::fixtures::LicenseFixture;
//!
//! let fixture = LicenseFixture::new().with_passphrase("secret");
//! let license = fixture.build().unwrap();
//! assert_eq!(license.id(), Some(fixture.id.as_str()));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    deflate_raw, encrypt_resource, font_resource, issuer_certificate, lcp_resource, manifest,
    package_resource, sign_value, LicenseFixture, OFFICIAL_PROVIDER, PASSPHRASE, TEST_PROVIDER,
};
pub use generators::{resource_from_params, ResourceParams};
pub use vectors::{all_vectors, key_vectors, verify_all_vectors, GoldenVector, KeyVector};
