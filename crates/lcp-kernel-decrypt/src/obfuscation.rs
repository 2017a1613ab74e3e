//! Embedded font de-obfuscation.
//!
//! Both schemes XOR a fixed-size prefix of the font with a key derived from
//! the publication unique identifier. XOR is its own inverse, so the same
//! functions obfuscate.

use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::algorithm::Algorithm;
use crate::error::{ResourceError, Result};

/// Bytes covered by IDPF obfuscation.
pub const IDPF_PREFIX_LEN: usize = 1040;

/// Bytes covered by Adobe obfuscation.
pub const ADOBE_PREFIX_LEN: usize = 1024;

/// IDPF key: SHA-1 of the trimmed identifier.
pub fn idpf_key(unique_identifier: &str) -> [u8; 20] {
    Sha1::digest(unique_identifier.trim().as_bytes()).into()
}

/// Adobe key: the 16 bytes of the UUID in the identifier.
pub fn adobe_key(unique_identifier: &str) -> Option<[u8; 16]> {
    let trimmed = unique_identifier.trim();
    let raw = trimmed
        .get(..9)
        .filter(|prefix| prefix.eq_ignore_ascii_case("urn:uuid:"))
        .map_or(trimmed, |_| &trimmed[9..]);
    Uuid::parse_str(raw).ok().map(|uuid| *uuid.as_bytes())
}

/// XOR the first `prefix_len` bytes of `data` with `key`, cycling the key.
pub fn xor_prefix(data: &mut [u8], key: &[u8], prefix_len: usize) {
    if key.is_empty() {
        return;
    }
    let end = prefix_len.min(data.len());
    for (byte, k) in data[..end].iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}

/// De-obfuscate a font resource.
pub fn deobfuscate(
    path: &str,
    algorithm: &Algorithm,
    unique_identifier: Option<&str>,
    mut data: Vec<u8>,
) -> Result<Vec<u8>> {
    let identifier = unique_identifier
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ResourceError::unsupported(path, "publication has no unique identifier"))?;

    match algorithm {
        Algorithm::IdpfFont => {
            xor_prefix(&mut data, &idpf_key(identifier), IDPF_PREFIX_LEN);
        }
        Algorithm::AdobeFont => {
            let key = adobe_key(identifier).ok_or_else(|| {
                ResourceError::unsupported(path, format!("identifier is not a UUID: {identifier}"))
            })?;
            xor_prefix(&mut data, &key, ADOBE_PREFIX_LEN);
        }
        other => {
            return Err(ResourceError::unsupported(
                path,
                format!("{other} is not a font obfuscation algorithm"),
            ))
        }
    }
    Ok(data)
}
