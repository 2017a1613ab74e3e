//! License field validation: mandatory members, profile, and rights window.

use chrono::{DateTime, Utc};

use crate::error::{FieldError, LicenseError};
use crate::license::{parse_timestamp, License};
use crate::profile::Profile;

/// Member paths every license must carry.
pub const MANDATORY_FIELDS: &[&str] = &[
    "id",
    "issued",
    "provider",
    "encryption",
    "encryption/profile",
    "encryption/content_key",
    "encryption/content_key/algorithm",
    "encryption/content_key/encrypted_value",
    "encryption/user_key",
    "encryption/user_key/algorithm",
    "encryption/user_key/key_check",
    "encryption/user_key/text_hint",
    "links",
    "signature",
    "signature/algorithm",
    "signature/certificate",
    "signature/value",
];

/// Check a license's fields against `now`.
///
/// All problems are collected; an empty list means the license passes.
/// This performs:
/// - Presence of every mandatory member (one error per missing path)
/// - Profile recognition, when a profile is present
/// - Rights window: `start` not in the future, `end` not in the past
pub fn validate_fields(license: &License, now: DateTime<Utc>) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = MANDATORY_FIELDS
        .iter()
        .filter(|path| license.field(path).is_none())
        .map(|path| FieldError::MissingField((*path).to_string()))
        .collect();

    if let Some(profile) = license.profile().filter(|p| !p.is_empty()) {
        if Profile::from_uri(profile).is_none() {
            errors.push(FieldError::UnsupportedProfile(profile.to_string()));
        }
    }

    if let Some(rights) = &license.document().rights {
        if let Some(start) = rights.start.as_deref().filter(|s| !s.is_empty()) {
            match parse_timestamp(start) {
                Some(start) if start > now => errors.push(FieldError::RightsNotYetValid(start)),
                Some(_) => {}
                None => errors.push(invalid_timestamp("rights/start", start)),
            }
        }
        if let Some(end) = rights.end.as_deref().filter(|s| !s.is_empty()) {
            match parse_timestamp(end) {
                Some(end) if end < now => errors.push(FieldError::RightsExpired(end)),
                Some(_) => {}
                None => errors.push(invalid_timestamp("rights/end", end)),
            }
        }
    }

    errors
}

/// [`validate_fields`] as a pipeline stage.
pub fn check_fields(license: &License, now: DateTime<Utc>) -> Result<(), LicenseError> {
    let errors = validate_fields(license, now);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(LicenseError::Fields(errors))
    }
}

fn invalid_timestamp(path: &str, value: &str) -> FieldError {
    FieldError::InvalidTimestamp {
        path: path.to_string(),
        value: value.to_string(),
    }
}
