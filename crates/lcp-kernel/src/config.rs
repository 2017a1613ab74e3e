//! Handler configuration.

use lcp_kernel_core::ProfilePolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the [`LicenseHandler`](crate::LicenseHandler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Run license checks and local decryption on tokio's blocking pool.
    pub offload_cpu_work: bool,
    /// Which licenses are official and go to the external decryptor.
    pub profile_policy: ProfilePolicy,
    /// Strip whitespace around delegated text results.
    pub trim_delegated_text: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            offload_cpu_work: true,
            profile_policy: ProfilePolicy::default(),
            trim_delegated_text: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: HandlerConfig =
            serde_json::from_str(r#"{ "offload_cpu_work": false }"#).unwrap();
        assert!(!config.offload_cpu_work);
        assert!(config.trim_delegated_text);
        assert_eq!(config.profile_policy, ProfilePolicy::default());
    }
}
