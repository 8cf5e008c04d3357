//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWKIT_*)
//! 2. TOML config file (if SWKIT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Base URL of the public HN API proxied by the default routes.
const HN_ENDPOINT: &str = r"https://api\.hnpwa\.com/v0";

/// Caching strategy for a runtime route.
///
/// Only network-first is supported; any other name fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "networkFirst", alias = "network_first")]
    NetworkFirst,
}

/// One runtime caching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRoute {
    /// Regex tested against the full request URL.
    pub url_pattern: String,

    #[serde(default = "default_strategy")]
    pub strategy: Strategy,

    /// Logical cache name; the partition is `{cache_id}-{cache_name}`.
    pub cache_name: String,

    /// Maximum entries kept in the partition (must be > 0).
    pub max_entries: usize,
}

fn default_strategy() -> Strategy {
    Strategy::NetworkFirst
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWKIT_*)
/// 2. TOML config file (if SWKIT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Namespace prefix for every cache partition.
    ///
    /// Set via SWKIT_CACHE_ID environment variable.
    #[serde(default = "default_cache_id")]
    pub cache_id: String,

    /// Origin the application (and its precached assets) is served from.
    ///
    /// Set via SWKIT_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SWKIT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWKIT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Deadline for every network request in milliseconds.
    ///
    /// Set via SWKIT_NETWORK_TIMEOUT_MS environment variable.
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// Maximum response body bytes accepted from the network.
    ///
    /// Set via SWKIT_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Document served to navigations that neither network nor cache can answer.
    ///
    /// Set via SWKIT_NAVIGATION_FALLBACK_PATH environment variable.
    #[serde(default = "default_navigation_fallback_path")]
    pub navigation_fallback_path: String,

    /// Regexes of build output paths left out of the asset manifest.
    #[serde(default = "default_precache_exclusions")]
    pub precache_exclusions: Vec<String>,

    /// Runtime caching rules, evaluated in order.
    #[serde(default = "default_runtime_caching")]
    pub runtime_caching: Vec<RuntimeRoute>,
}

fn default_cache_id() -> String {
    "elmhnpwa".into()
}

fn default_origin() -> String {
    "http://localhost:5001".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swkit-cache.sqlite")
}

fn default_user_agent() -> String {
    "swkit/0.1".into()
}

fn default_network_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_navigation_fallback_path() -> String {
    "/index.html".into()
}

fn default_precache_exclusions() -> Vec<String> {
    vec![r"manifest\.json$".into()]
}

fn default_runtime_caching() -> Vec<RuntimeRoute> {
    [
        (format!("{HN_ENDPOINT}/(news|newest|ask|show|jobs)"), "feed-cache"),
        (format!("{HN_ENDPOINT}/item/"), "item-cache"),
        (format!("{HN_ENDPOINT}/user/"), "user-cache"),
    ]
    .into_iter()
    .map(|(url_pattern, cache_name)| RuntimeRoute {
        url_pattern,
        strategy: Strategy::NetworkFirst,
        cache_name: cache_name.into(),
        max_entries: 30,
    })
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_id: default_cache_id(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            network_timeout_ms: default_network_timeout_ms(),
            max_bytes: default_max_bytes(),
            navigation_fallback_path: default_navigation_fallback_path(),
            precache_exclusions: default_precache_exclusions(),
            runtime_caching: default_runtime_caching(),
        }
    }
}

impl AppConfig {
    /// Network deadline as Duration for use with reqwest/tokio.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWKIT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed("SWKIT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    /// Load configuration from a TOML file layered over the defaults.
    ///
    /// Environment variables still take precedence over the file.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::extract(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file(path))
                .merge(
                    Env::prefixed("SWKIT_")
                        .ignore(&["CONFIG_FILE"])
                        .map(|key| key.as_str().to_lowercase().into())
                        .split("__"),
                ),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_id, "elmhnpwa");
        assert_eq!(config.db_path, PathBuf::from("./swkit-cache.sqlite"));
        assert_eq!(config.user_agent, "swkit/0.1");
        assert_eq!(config.navigation_fallback_path, "/index.html");
        assert_eq!(config.precache_exclusions, vec![r"manifest\.json$".to_string()]);
        assert_eq!(config.runtime_caching.len(), 3);
        assert!(config.runtime_caching.iter().all(|r| r.max_entries == 30));
        assert!(
            config
                .runtime_caching
                .iter()
                .all(|r| r.strategy == Strategy::NetworkFirst)
        );
    }

    #[test]
    fn test_network_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.network_timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_load_from_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swkit.toml",
                r#"
                cache_id = "demo"
                navigation_fallback_path = "/shell.html"

                [[runtime_caching]]
                url_pattern = "/api/"
                strategy = "networkFirst"
                cache_name = "api-cache"
                max_entries = 5
                "#,
            )?;
            jail.set_env("SWKIT_NETWORK_TIMEOUT_MS", "2500");

            let config = AppConfig::load_from(std::path::Path::new("swkit.toml")).unwrap();
            assert_eq!(config.cache_id, "demo");
            assert_eq!(config.navigation_fallback_path, "/shell.html");
            assert_eq!(config.network_timeout_ms, 2500);
            assert_eq!(config.runtime_caching.len(), 1);
            assert_eq!(config.runtime_caching[0].cache_name, "api-cache");
            Ok(())
        });
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swkit.toml",
                r#"
                [[runtime_caching]]
                url_pattern = "/api/"
                strategy = "cacheFirst"
                cache_name = "api-cache"
                max_entries = 5
                "#,
            )?;

            let result = AppConfig::load_from(std::path::Path::new("swkit.toml"));
            assert!(matches!(result, Err(ConfigError::LoadFailed(_))));
            Ok(())
        });
    }

    #[test]
    fn test_zero_max_entries_rejected_at_load() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swkit.toml",
                r#"
                [[runtime_caching]]
                url_pattern = "/api/"
                cache_name = "api-cache"
                max_entries = 0
                "#,
            )?;

            let result = AppConfig::load_from(std::path::Path::new("swkit.toml"));
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field.contains("max_entries")));
            Ok(())
        });
    }
}
