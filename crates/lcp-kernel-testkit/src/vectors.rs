//! Golden test vectors for deterministic verification.
//!
//! Canonical encoding must reproduce the provider's signed bytes exactly,
//! and key derivations must agree with every other reading system.

use lcp_kernel_core::{canonical_json, license_signing_input, UserKey};
use lcp_kernel_decrypt::obfuscation::{adobe_key, idpf_key};
use serde_json::Value;

/// A canonical JSON vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input document as JSON text.
    pub input: &'static str,
    /// Encode as a license signing input (top-level `signature` dropped).
    pub signing: bool,
    /// Expected canonical text.
    pub expected: &'static str,
}

/// Which key derivation a [`KeyVector`] exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDerivation {
    /// SHA-256 of a passphrase.
    UserKey,
    /// SHA-1 of the trimmed publication identifier.
    IdpfFont,
    /// UUID bytes of the publication identifier.
    AdobeFont,
}

/// A key derivation vector.
#[derive(Debug, Clone)]
pub struct KeyVector {
    pub name: &'static str,
    pub derivation: KeyDerivation,
    pub input: &'static str,
    /// Expected key (hex).
    pub expected_hex: &'static str,
}

/// Get all canonical JSON vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "nested keys sorted, arrays kept in order",
            input: r#"{"b":1,"a":{"d":[3,1],"c":null}}"#,
            signing: false,
            expected: r#"{"a":{"c":null,"d":[3,1]},"b":1}"#,
        },
        GoldenVector {
            name: "top-level signature dropped",
            input: r#"{"signature":{"value":"x"},"provider":"p","id":"1"}"#,
            signing: true,
            expected: r#"{"id":"1","provider":"p"}"#,
        },
        GoldenVector {
            name: "nested signature kept",
            input: r#"{"user":{"signature":"s"},"id":"1"}"#,
            signing: true,
            expected: r#"{"id":"1","user":{"signature":"s"}}"#,
        },
        GoldenVector {
            name: "string escapes",
            input: r#"{"t":"a\"b\\c\n\u0001"}"#,
            signing: false,
            expected: r#"{"t":"a\"b\\c\n\u0001"}"#,
        },
        GoldenVector {
            name: "non-ascii written raw, slash unescaped",
            input: r#"{"href":"http://x/y","é":"é"}"#,
            signing: false,
            expected: "{\"href\":\"http://x/y\",\"\u{e9}\":\"\u{e9}\"}",
        },
        GoldenVector {
            name: "integral floats lose their fraction",
            input: r#"{"n":1.0,"m":-0.5}"#,
            signing: false,
            expected: r#"{"m":-0.5,"n":1}"#,
        },
        GoldenVector {
            name: "keys ordered by utf-16 code units",
            input: r#"{"Ａ":2,"😀":1}"#,
            signing: false,
            expected: "{\"\u{1F600}\":1,\"\u{FF21}\":2}",
        },
        GoldenVector {
            name: "license shaped document",
            input: r#"{
                "id": "abc",
                "issued": "2024-01-01T00:00:00Z",
                "encryption": {
                    "profile": "http://readium.org/lcp/basic-profile",
                    "user_key": {"text_hint": "h", "algorithm": "a"}
                },
                "links": [{"rel": "hint", "href": "http://x/y"}],
                "rights": {"print": 10, "copy": 2048},
                "signature": {"value": "zz"}
            }"#,
            signing: true,
            expected: concat!(
                r#"{"encryption":{"profile":"http://readium.org/lcp/basic-profile","#,
                r#""user_key":{"algorithm":"a","text_hint":"h"}},"id":"abc","#,
                r#""issued":"2024-01-01T00:00:00Z","links":[{"href":"http://x/y","rel":"hint"}],"#,
                r#""rights":{"copy":2048,"print":10}}"#,
            ),
        },
    ]
}

/// Get all key derivation vectors.
pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "user key of 'abc'",
            derivation: KeyDerivation::UserKey,
            input: "abc",
            expected_hex: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        KeyVector {
            name: "idpf key trims the identifier",
            derivation: KeyDerivation::IdpfFont,
            input: "  abc\n",
            expected_hex: "a9993e364706816aba3e25717850c26c9cd0d89d",
        },
        KeyVector {
            name: "adobe key from urn:uuid identifier",
            derivation: KeyDerivation::AdobeFont,
            input: "urn:uuid:00112233-4455-6677-8899-aabbccddeeff",
            expected_hex: "00112233445566778899aabbccddeeff",
        },
    ]
}

/// Compute the canonical text for a vector.
pub fn encode_vector(vector: &GoldenVector) -> anyhow::Result<String> {
    let value: Value = serde_json::from_str(vector.input)?;
    let bytes = if vector.signing {
        license_signing_input(&value)?
    } else {
        canonical_json(&value)
    };
    Ok(String::from_utf8(bytes)?)
}

/// Compute the key for a vector, hex encoded.
pub fn derive_vector(vector: &KeyVector) -> Option<String> {
    match vector.derivation {
        KeyDerivation::UserKey => Some(hex::encode(
            UserKey::from_passphrase(vector.input).as_bytes(),
        )),
        KeyDerivation::IdpfFont => Some(hex::encode(idpf_key(vector.input))),
        KeyDerivation::AdobeFont => adobe_key(vector.input).map(hex::encode),
    }
}

/// Verify every vector, returning `(name, passed)` pairs.
pub fn verify_all_vectors() -> Vec<(&'static str, bool)> {
    let canonical = all_vectors().into_iter().map(|v| {
        let passed = encode_vector(&v).map(|s| s == v.expected).unwrap_or(false);
        (v.name, passed)
    });
    let keys = key_vectors().into_iter().map(|v| {
        let passed = derive_vector(&v).as_deref() == Some(v.expected_hex);
        (v.name, passed)
    });
    canonical.chain(keys).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_vectors() {
        for vector in all_vectors() {
            assert_eq!(
                encode_vector(&vector).unwrap(),
                vector.expected,
                "vector: {}",
                vector.name
            );
        }
    }

    #[test]
    fn test_key_vectors() {
        for vector in key_vectors() {
            assert_eq!(
                derive_vector(&vector).as_deref(),
                Some(vector.expected_hex),
                "vector: {}",
                vector.name
            );
        }
    }

    #[test]
    fn test_verify_all() {
        let results = verify_all_vectors();
        assert_eq!(results.len(), all_vectors().len() + key_vectors().len());
        for (name, passed) in results {
            assert!(passed, "vector failed: {name}");
        }
    }
}
