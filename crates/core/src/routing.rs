//! Route Matcher: classify request URLs into runtime cache partitions.
//!
//! Patterns are evaluated in declared order and the first match wins.

use std::fmt;
use std::num::NonZeroUsize;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigError, RuntimeRoute};

/// Reserved logical name of the precache partition.
pub const PRECACHE: &str = "precache";

/// Logical cache partition name, fixed at configuration time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheName(String);

impl CacheName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage partition for this name under `cache_id`.
    pub fn partition(&self, cache_id: &str) -> String {
        format!("{cache_id}-{}", self.0)
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One resource class: URL predicate, target partition, and size bound.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    matcher: Regex,
    pub cache_name: CacheName,
    pub partition: String,
    pub max_entries: NonZeroUsize,
}

impl RoutePattern {
    pub fn new(pattern: &str, cache_name: CacheName, cache_id: &str, max_entries: NonZeroUsize) -> Result<Self, regex::Error> {
        let matcher = Regex::new(pattern)?;
        let partition = cache_name.partition(cache_id);
        Ok(Self { matcher, cache_name, partition, max_entries })
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.matcher.is_match(url.as_str())
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }
}

/// Result of classifying a request URL.
#[derive(Debug, Clone, Copy)]
pub enum Classification<'a> {
    Matched(&'a RoutePattern),
    Unmatched,
}

/// Ordered list of route patterns.
#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
    routes: Vec<RoutePattern>,
}

impl RouteMatcher {
    pub fn new(routes: Vec<RoutePattern>) -> Self {
        Self { routes }
    }

    /// Build the matcher from configured runtime routes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a pattern that fails to compile or
    /// a zero `max_entries`.
    pub fn from_config(cache_id: &str, routes: &[RuntimeRoute]) -> Result<Self, ConfigError> {
        let routes = routes
            .iter()
            .enumerate()
            .map(|(i, route)| {
                let max_entries = NonZeroUsize::new(route.max_entries).ok_or_else(|| ConfigError::Invalid {
                    field: format!("runtime_caching[{i}].max_entries"),
                    reason: "must be greater than 0".into(),
                })?;
                RoutePattern::new(&route.url_pattern, CacheName::new(&route.cache_name), cache_id, max_entries).map_err(
                    |e| ConfigError::Invalid { field: format!("runtime_caching[{i}].url_pattern"), reason: e.to_string() },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    /// First pattern matching `url`, or `Unmatched`.
    pub fn classify(&self, url: &Url) -> Classification<'_> {
        match self.routes.iter().find(|r| r.matches(url)) {
            Some(route) => Classification::Matched(route),
            None => Classification::Unmatched,
        }
    }

    /// Route by its logical cache name.
    pub fn route(&self, name: &str) -> Option<&RoutePattern> {
        self.routes.iter().find(|r| r.cache_name.as_str() == name)
    }

    pub fn routes(&self) -> &[RoutePattern] {
        &self.routes
    }
}
