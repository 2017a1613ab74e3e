//! Encryption profiles and the trust policy attached to them.

use serde::{Deserialize, Serialize};

/// URI of the basic (test) encryption profile.
pub const BASIC_PROFILE: &str = "http://readium.org/lcp/basic-profile";

/// URI of the production encryption profile.
pub const PROFILE_1_0: &str = "http://readium.org/lcp/profile-1.0";

/// A recognized encryption profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    /// `http://readium.org/lcp/basic-profile`
    Basic,
    /// `http://readium.org/lcp/profile-1.0`
    V1_0,
}

impl Profile {
    /// Parse a profile URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            BASIC_PROFILE => Some(Self::Basic),
            PROFILE_1_0 => Some(Self::V1_0),
            _ => None,
        }
    }

    /// The profile URI.
    pub fn as_uri(self) -> &'static str {
        match self {
            Self::Basic => BASIC_PROFILE,
            Self::V1_0 => PROFILE_1_0,
        }
    }
}

/// Decides which licenses are "official", i.e. trusted to an external
/// privileged decryptor instead of being checked and decrypted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePolicy {
    /// Providers that ship `profile-1.0` licenses but whose content is
    /// still decrypted locally.
    pub exempt_providers: Vec<String>,
}

impl ProfilePolicy {
    /// Whether a license with this profile and provider is official.
    pub fn is_official(&self, profile: Option<&str>, provider: Option<&str>) -> bool {
        let exempt = provider
            .map(|p| self.exempt_providers.iter().any(|e| e == p))
            .unwrap_or(false);
        !exempt && profile == Some(PROFILE_1_0)
    }
}

impl Default for ProfilePolicy {
    fn default() -> Self {
        Self {
            exempt_providers: vec![
                "www.tea-ebook.com".to_string(),
                "www.tea-ebook.com-PP".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_uri_roundtrip() {
        for profile in [Profile::Basic, Profile::V1_0] {
            assert_eq!(Profile::from_uri(profile.as_uri()), Some(profile));
        }
        assert_eq!(Profile::from_uri("http://example.com/profile"), None);
    }

    #[test]
    fn test_official_requires_profile_1_0() {
        let policy = ProfilePolicy::default();
        assert!(policy.is_official(Some(PROFILE_1_0), Some("provider.example")));
        assert!(policy.is_official(Some(PROFILE_1_0), None));
        assert!(!policy.is_official(Some(BASIC_PROFILE), Some("provider.example")));
        assert!(!policy.is_official(None, None));
    }

    #[test]
    fn test_exempt_provider_is_not_official() {
        let policy = ProfilePolicy::default();
        assert!(!policy.is_official(Some(PROFILE_1_0), Some("www.tea-ebook.com")));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: ProfilePolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, ProfilePolicy::default());

        let policy: ProfilePolicy =
            serde_json::from_str(r#"{"exempt_providers":["a.example"]}"#).unwrap();
        assert_eq!(policy.exempt_providers, vec!["a.example".to_string()]);
    }
}
