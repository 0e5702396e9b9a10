//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::request::resolve;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field: field.into(), reason: reason.into() }
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `policy.version` is empty
    /// - a manifest entry cannot be resolved against the origin
    /// - `policy.shell_path` or `push.open_url` is not root-relative
    /// - `policy.degraded.status` is outside 400..=599
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;

        if self.max_bytes == 0 {
            return Err(ConfigError::invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }

        let policy = &self.policy;
        if policy.version.trim().is_empty() {
            return Err(ConfigError::invalid("policy.version", "must not be empty"));
        }

        for entry in &policy.manifest {
            resolve(&origin, entry).map_err(|e| ConfigError::invalid("policy.manifest", format!("{entry}: {e}")))?;
        }

        if !policy.shell_path.starts_with('/') {
            return Err(ConfigError::invalid("policy.shell_path", "must start with '/'"));
        }
        if !self.push.open_url.starts_with('/') {
            return Err(ConfigError::invalid("push.open_url", "must start with '/'"));
        }

        if !(400..=599).contains(&policy.degraded.status) {
            return Err(ConfigError::invalid("policy.degraded.status", "must be an HTTP error status (400-599)"));
        }

        let shell_precached = policy
            .manifest
            .iter()
            .filter_map(|entry| resolve(&origin, entry).ok())
            .any(|url| url.origin() == origin.origin() && url.path() == policy.shell_path);
        if !shell_precached {
            tracing::warn!(
                shell_path = %policy.shell_path,
                "shell document is not in the manifest; navigation fallback will rely on runtime caching"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CachePolicyConfig;

    fn with_policy(policy: CachePolicyConfig) -> AppConfig {
        AppConfig { policy, ..Default::default() }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = with_policy(CachePolicyConfig { version: "  ".into(), ..Default::default() });
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "policy.version"));
    }

    #[test]
    fn test_validate_unresolvable_manifest_entry() {
        let config = with_policy(CachePolicyConfig {
            manifest: vec!["/".into(), "file:///etc/passwd".into()],
            ..Default::default()
        });
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "policy.manifest"));
    }

    #[test]
    fn test_validate_shell_path_must_be_root_relative() {
        let config = with_policy(CachePolicyConfig { shell_path: "index.html".into(), ..Default::default() });
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "policy.shell_path"));
    }

    #[test]
    fn test_validate_degraded_status_range() {
        let mut policy = CachePolicyConfig::default();
        policy.degraded.status = 200;
        let result = with_policy(policy).validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "policy.degraded.status"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() }; // minimum valid values
        assert!(config.validate().is_ok());

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
