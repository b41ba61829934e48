//! Provider configuration

use std::time::Duration;

use serde::Deserialize;
use stratus_core::retry::RetryPolicy;

/// The `provider` block of a configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// AWS region; falls back to the SDK's region resolution when unset
    pub region: Option<String>,
    /// Endpoint override, e.g. for a local emulator
    pub endpoint_url: Option<String>,
    /// Time budget for deleting each removed notification target
    pub cleanup_timeout_secs: Option<u64>,
    /// Full backoff settings for target cleanup
    pub cleanup_retry: Option<RetryPolicy>,
}

impl ProviderConfig {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Retry policy for dependent cleanup
    ///
    /// `cleanup_timeout_secs` overrides the timeout of `cleanup_retry`.
    pub fn cleanup_policy(&self) -> RetryPolicy {
        let policy = self.cleanup_retry.clone().unwrap_or_default();
        match self.cleanup_timeout_secs {
            Some(secs) => policy.with_timeout(Duration::from_secs(secs)),
            None => policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_thirty_second_cleanup() {
        let config: ProviderConfig = serde_json::from_str("{}").unwrap();
        assert!(config.region.is_none());
        assert_eq!(config.cleanup_policy().timeout, Duration::from_secs(30));
    }

    #[test]
    fn timeout_override() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"region": "eu-west-1", "cleanup_timeout_secs": 5}"#).unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.cleanup_policy().timeout, Duration::from_secs(5));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<ProviderConfig>(r#"{"regoin": "x"}"#).is_err());
    }
}
