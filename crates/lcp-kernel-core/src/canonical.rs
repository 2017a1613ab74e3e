//! Canonical JSON encoding for license signatures.
//!
//! The signature of a license covers a deterministic rendering of the
//! license document with the `signature` member removed:
//! - Object keys sorted by UTF-16 code unit order, at every depth
//! - Array order preserved
//! - No insignificant whitespace
//! - Strings escaped the way a standard JSON encoder escapes them
//!
//! The encoder is written out by hand so the byte output never depends on
//! the ordering behavior of `serde_json::Map`.

use serde_json::{Map, Number, Value};

use crate::error::CoreError;

/// Name of the top-level member excluded from the signed bytes.
pub const SIGNATURE_FIELD: &str = "signature";

/// Encode a JSON value to canonical bytes.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Construct the signed message for a license document.
///
/// Removes the top-level `signature` member and canonicalizes the rest.
pub fn license_signing_input(document: &Value) -> Result<Vec<u8>, CoreError> {
    let object = document
        .as_object()
        .ok_or_else(|| CoreError::MalformedLicense("license is not a JSON object".into()))?;

    let mut buf = Vec::new();
    encode_object_canonical(
        &mut buf,
        object.iter().filter(|(key, _)| key.as_str() != SIGNATURE_FIELD),
    );
    Ok(buf)
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s),
        Value::Array(items) => encode_array(buf, items),
        Value::Object(map) => encode_map(buf, map),
    }
}

/// Encode a number the way a JavaScript signer prints it.
///
/// Integral floats print without a fraction (`1.0` is `1`), negative zero
/// prints as `0`, and exponents carry an explicit sign (`1e+21`). Other
/// fractional values use the shortest round-trip digits, which match
/// JavaScript between `1e-7` and `1e21`.
fn encode_number(buf: &mut Vec<u8>, n: &Number) {
    if n.is_i64() || n.is_u64() {
        buf.extend_from_slice(n.to_string().as_bytes());
        return;
    }

    match n.as_f64() {
        Some(f) if f == 0.0 => buf.push(b'0'),
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
            buf.extend_from_slice(format!("{f:.0}").as_bytes());
        }
        _ => {
            let text = n.to_string();
            match text.split_once('e') {
                Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                    buf.extend_from_slice(format!("{mantissa}e+{exponent}").as_bytes());
                }
                _ => buf.extend_from_slice(text.as_bytes()),
            }
        }
    }
}

/// Encode a string with JSON escaping.
fn encode_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\u{08}' => buf.extend_from_slice(b"\\b"),
            '\u{0c}' => buf.extend_from_slice(b"\\f"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                buf.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.push(b'"');
}

/// Encode an array, preserving element order.
fn encode_array(buf: &mut Vec<u8>, items: &[Value]) {
    buf.push(b'[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_value_to(buf, item);
    }
    buf.push(b']');
}

fn encode_map(buf: &mut Vec<u8>, map: &Map<String, Value>) {
    encode_object_canonical(buf, map.iter());
}

/// Encode an object canonically.
///
/// Keys are sorted by UTF-16 code units. This differs from byte order only
/// when a supplementary-plane character meets one at or above U+E000.
fn encode_object_canonical<'a>(
    buf: &mut Vec<u8>,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
) {
    let mut entries: Vec<(&String, &Value)> = entries.collect();
    entries.sort_by(|a, b| a.0.encode_utf16().cmp(b.0.encode_utf16()));

    buf.push(b'{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_string(buf, key);
        buf.push(b':');
        encode_value_to(buf, value);
    }
    buf.push(b'}');
}
