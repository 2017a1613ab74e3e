//! User key check and content key derivation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::debug;

use crate::cipher;
use crate::crypto::{ContentKey, UserKey};
use crate::error::{CoreError, LicenseError, Result};
use crate::license::License;
use crate::profile::ProfilePolicy;

/// Outcome of the user key stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKeyCheck {
    /// The license is official; the external decryptor checks the key.
    Skipped,
    /// `key_check` decrypted to the license id.
    Verified,
}

/// Confirm the user key opens this license.
///
/// `key_check` is the license id encrypted under the user key. Any decrypt
/// failure or mismatch means the key is wrong.
pub fn check_user_key(
    license: &License,
    user_key: &UserKey,
    policy: &ProfilePolicy,
) -> Result<UserKeyCheck> {
    if license.is_official(policy) {
        debug!("official license, user key check skipped");
        return Ok(UserKeyCheck::Skipped);
    }

    let key_check = license
        .user_key_info()
        .and_then(|info| info.key_check.as_deref())
        .ok_or_else(|| missing("encryption/user_key/key_check"))?;
    let id = license.id().ok_or_else(|| missing("id"))?;

    let encrypted = BASE64
        .decode(key_check.trim())
        .map_err(|_| LicenseError::InvalidUserKey)?;
    let decrypted =
        cipher::decrypt(user_key.as_bytes(), &encrypted).map_err(|_| LicenseError::InvalidUserKey)?;

    if decrypted != id.as_bytes() {
        return Err(LicenseError::InvalidUserKey);
    }
    Ok(UserKeyCheck::Verified)
}

/// Decrypt the content key with the user key.
pub fn derive_content_key(license: &License, user_key: &UserKey) -> Result<ContentKey> {
    let encrypted_value = license
        .content_key_info()
        .and_then(|info| info.encrypted_value.as_deref())
        .ok_or_else(|| missing("encryption/content_key/encrypted_value"))?;

    let encrypted = BASE64
        .decode(encrypted_value.trim())
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let key_bytes = cipher::decrypt(user_key.as_bytes(), &encrypted)?;
    Ok(ContentKey::from_bytes(key_bytes)?)
}

fn missing(path: &str) -> LicenseError {
    CoreError::MalformedLicense(format!("license must contain '{path}'")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecryptError;
    use crate::profile::{BASIC_PROFILE, PROFILE_1_0};
    use serde_json::json;

    const LICENSE_ID: &str = "5a3e3a1b-9b24-4c5e-b4c2-0e4b3f6b1f9d";

    fn encrypt_b64(key: &UserKey, plaintext: &[u8]) -> String {
        BASE64.encode(cipher::encrypt(key.as_bytes(), &[7u8; 16], plaintext).unwrap())
    }

    fn license_for(key: &UserKey, profile: &str, provider: &str, content_key: &[u8]) -> License {
        License::from_value(json!({
            "id": LICENSE_ID,
            "provider": provider,
            "encryption": {
                "profile": profile,
                "content_key": { "encrypted_value": encrypt_b64(key, content_key) },
                "user_key": { "key_check": encrypt_b64(key, LICENSE_ID.as_bytes()) }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_correct_user_key_verifies() {
        let key = UserKey::from_passphrase("reader");
        let license = license_for(&key, BASIC_PROFILE, "p.example", &[1u8; 32]);
        assert_eq!(
            check_user_key(&license, &key, &ProfilePolicy::default()).unwrap(),
            UserKeyCheck::Verified
        );
    }

    #[test]
    fn test_wrong_user_key_rejected() {
        let key = UserKey::from_passphrase("reader");
        let license = license_for(&key, BASIC_PROFILE, "p.example", &[1u8; 32]);
        let wrong = UserKey::from_passphrase("intruder");
        assert!(matches!(
            check_user_key(&license, &wrong, &ProfilePolicy::default()),
            Err(LicenseError::InvalidUserKey)
        ));
    }

    #[test]
    fn test_official_license_skips_check() {
        let key = UserKey::from_passphrase("reader");
        let license = license_for(&key, PROFILE_1_0, "p.example", &[1u8; 32]);
        let wrong = UserKey::from_passphrase("anyone");
        assert_eq!(
            check_user_key(&license, &wrong, &ProfilePolicy::default()).unwrap(),
            UserKeyCheck::Skipped
        );
    }

    #[test]
    fn test_exempt_provider_is_checked() {
        let key = UserKey::from_passphrase("reader");
        let license = license_for(&key, PROFILE_1_0, "www.tea-ebook.com", &[1u8; 32]);
        let wrong = UserKey::from_passphrase("anyone");
        assert!(check_user_key(&license, &wrong, &ProfilePolicy::default()).is_err());
    }

    #[test]
    fn test_derive_content_key() {
        let key = UserKey::from_passphrase("reader");
        let content = [9u8; 32];
        let license = license_for(&key, BASIC_PROFILE, "p.example", &content);
        let derived = derive_content_key(&license, &key).unwrap();
        assert_eq!(derived.as_bytes(), &content);
    }

    #[test]
    fn test_derive_rejects_bad_key_length() {
        let key = UserKey::from_passphrase("reader");
        let license = license_for(&key, BASIC_PROFILE, "p.example", &[9u8; 20]);
        assert!(matches!(
            derive_content_key(&license, &key),
            Err(LicenseError::ContentKey(DecryptError::InvalidKeyLength(20)))
        ));
    }
}
