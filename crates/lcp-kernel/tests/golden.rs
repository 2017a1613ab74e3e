//! Golden vectors for cross-implementation verification.
//!
//! Every reading system must produce identical:
//! - canonical license bytes (the signed message)
//! - user keys from passphrases
//! - font obfuscation keys

use lcp_kernel::core::{canonical_json, License, UserKey};
use lcp_kernel_testkit::vectors::{derive_vector, encode_vector};
use lcp_kernel_testkit::{all_vectors, key_vectors, verify_all_vectors, LicenseFixture};

#[test]
fn test_all_vectors_pass() {
    for (name, passed) in verify_all_vectors() {
        assert!(passed, "golden vector failed: {name}");
    }
}

#[test]
fn test_canonical_vectors_through_facade() {
    for vector in all_vectors() {
        let encoded = encode_vector(&vector).unwrap();
        assert_eq!(encoded, vector.expected, "vector: {}", vector.name);
    }
}

#[test]
fn test_key_vectors_through_facade() {
    for vector in key_vectors() {
        assert_eq!(
            derive_vector(&vector).as_deref(),
            Some(vector.expected_hex),
            "vector: {}",
            vector.name
        );
    }
    let empty: String = UserKey::from_passphrase("")
        .as_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    assert_eq!(
        empty,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn test_signing_input_ignores_member_order() {
    let fixture = LicenseFixture::new();
    let value = fixture.build_value().unwrap();

    let reordered: serde_json::Value = serde_json::from_str(&value.to_string()).unwrap();
    let a = License::from_value(value).unwrap();
    let b = License::from_value(reordered).unwrap();
    assert_eq!(a.signing_input().unwrap(), b.signing_input().unwrap());

    let without_signature = {
        let mut raw = a.raw().clone();
        raw.as_object_mut().unwrap().remove("signature");
        raw
    };
    assert_eq!(a.signing_input().unwrap(), canonical_json(&without_signature));
}
