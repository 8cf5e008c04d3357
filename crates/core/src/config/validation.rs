//! Configuration validation rules.
//!
//! Runs after `AppConfig` has been loaded from environment, files, or
//! defaults. Anything rejected here never reaches the worker at runtime.

use std::collections::HashSet;

use crate::config::AppConfig;
use crate::routing::PRECACHE;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` for an empty `cache_id`, and
    /// `ConfigError::Invalid` if:
    /// - `cache_id` contains characters outside `[A-Za-z0-9_.-]`
    /// - `origin` is not an absolute http(s) URL
    /// - `network_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    /// - `navigation_fallback_path` does not start with `/`
    /// - a precache exclusion or route pattern is not a valid regex
    /// - a route has `max_entries == 0`, an empty, duplicated, or reserved `cache_name`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_id.is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_id".into(),
                hint: "set SWKIT_CACHE_ID or cache_id in the config file".into(),
            });
        }
        if !self
            .cache_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("cache_id", "may only contain ASCII letters, digits, '-', '_' and '.'"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme()))),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if self.network_timeout_ms < 100 {
            return Err(invalid("network_timeout_ms", "must be at least 100ms"));
        }
        if self.network_timeout_ms > 300_000 {
            return Err(invalid("network_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.navigation_fallback_path.starts_with('/') {
            return Err(invalid("navigation_fallback_path", "must start with '/'"));
        }

        for (i, pattern) in self.precache_exclusions.iter().enumerate() {
            regex::Regex::new(pattern).map_err(|e| invalid(format!("precache_exclusions[{i}]"), e.to_string()))?;
        }

        let mut names = HashSet::new();
        for (i, route) in self.runtime_caching.iter().enumerate() {
            if route.max_entries == 0 {
                return Err(invalid(format!("runtime_caching[{i}].max_entries"), "must be greater than 0"));
            }
            if route.cache_name.is_empty() {
                return Err(invalid(format!("runtime_caching[{i}].cache_name"), "must not be empty"));
            }
            if route.cache_name == PRECACHE || route.cache_name.starts_with("precache-") {
                return Err(invalid(format!("runtime_caching[{i}].cache_name"), "is reserved for the precache"));
            }
            if !names.insert(route.cache_name.as_str()) {
                return Err(invalid(format!("runtime_caching[{i}].cache_name"), "is used by another route"));
            }
            regex::Regex::new(&route.url_pattern)
                .map_err(|e| invalid(format!("runtime_caching[{i}].url_pattern"), e.to_string()))?;
        }

        if self.runtime_caching.is_empty() {
            tracing::warn!("no runtime_caching routes configured; only the precache will serve offline");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuntimeRoute, Strategy};

    fn route(name: &str, max_entries: usize) -> RuntimeRoute {
        RuntimeRoute {
            url_pattern: "/api/".into(),
            strategy: Strategy::NetworkFirst,
            cache_name: name.into(),
            max_entries,
        }
    }

    fn invalid_field(config: &AppConfig) -> String {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_cache_id() {
        let config = AppConfig { cache_id: String::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { field, .. }) if field == "cache_id"));

        let config = AppConfig { cache_id: "my app".into(), ..Default::default() };
        assert_eq!(invalid_field(&config), "cache_id");
    }

    #[test]
    fn test_validate_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(invalid_field(&config), "origin");

        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert_eq!(invalid_field(&config), "origin");
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { network_timeout_ms: 50, ..Default::default() };
        assert_eq!(invalid_field(&config), "network_timeout_ms");

        let config = AppConfig { network_timeout_ms: 301_000, ..Default::default() };
        assert_eq!(invalid_field(&config), "network_timeout_ms");

        let config = AppConfig { network_timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(invalid_field(&config), "max_bytes");
    }

    #[test]
    fn test_validate_fallback_path() {
        let config = AppConfig { navigation_fallback_path: "index.html".into(), ..Default::default() };
        assert_eq!(invalid_field(&config), "navigation_fallback_path");
    }

    #[test]
    fn test_validate_exclusion_regex() {
        let config = AppConfig { precache_exclusions: vec!["[".into()], ..Default::default() };
        assert_eq!(invalid_field(&config), "precache_exclusions[0]");
    }

    #[test]
    fn test_validate_zero_max_entries() {
        let config = AppConfig { runtime_caching: vec![route("api-cache", 0)], ..Default::default() };
        assert_eq!(invalid_field(&config), "runtime_caching[0].max_entries");
    }

    #[test]
    fn test_validate_duplicate_cache_name() {
        let config =
            AppConfig { runtime_caching: vec![route("api-cache", 1), route("api-cache", 2)], ..Default::default() };
        assert_eq!(invalid_field(&config), "runtime_caching[1].cache_name");
    }

    #[test]
    fn test_validate_reserved_cache_name() {
        let config = AppConfig { runtime_caching: vec![route("precache", 1)], ..Default::default() };
        assert_eq!(invalid_field(&config), "runtime_caching[0].cache_name");
    }

    #[test]
    fn test_validate_empty_routes_allowed() {
        let config = AppConfig { runtime_caching: Vec::new(), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
