//! Strategy Dispatcher: network-first with cache fallback.
//!
//! 1. Fetch from the network under a deadline.
//! 2. On a 2xx response, write it through the eviction policy (best effort)
//!    and return it.
//! 3. On error, timeout, or non-2xx status, answer from the route's
//!    partition, or fail with `NETWORK_AND_CACHE_MISS`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::{CacheKey, CacheStore};
use crate::eviction::EvictionPolicy;
use crate::routing::RoutePattern;
use crate::transport::{Request, Response, Transport};

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    RuntimeCache,
    Precache,
    Fallback,
}

/// A response together with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

impl Served {
    pub fn new(response: Response, source: ResponseSource) -> Self {
        Self { response, source }
    }
}

/// Fetch through `transport`, failing with `NETWORK_TIMEOUT` once `timeout` elapses.
///
/// Dropping the returned future abandons the in-flight request.
pub async fn fetch_with_deadline(
    transport: &dyn Transport, request: &Request, timeout: Duration,
) -> Result<Response, Error> {
    match tokio::time::timeout(timeout, transport.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::NetworkTimeout(format!("{} after {}ms", request.url, timeout.as_millis()))),
    }
}

/// Network-first strategy bound to a transport, store, and eviction policy.
pub struct NetworkFirst {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CacheStore>,
    eviction: Arc<EvictionPolicy>,
    timeout: Duration,
}

impl NetworkFirst {
    pub fn new(
        transport: Arc<dyn Transport>, store: Arc<dyn CacheStore>, eviction: Arc<EvictionPolicy>, timeout: Duration,
    ) -> Self {
        Self { transport, store, eviction, timeout }
    }

    /// Serve `request`, already classified to `route`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NetworkAndCacheMiss` when the network fails and the
    /// partition holds no entry for the request. Storage errors never
    /// surface from here.
    pub async fn handle(&self, route: &RoutePattern, request: &Request) -> Result<Served, Error> {
        let key = CacheKey::for_request(request);

        let failure = match fetch_with_deadline(self.transport.as_ref(), request, self.timeout).await {
            Ok(response) if response.is_success() => {
                if let Err(e) = self.eviction.put(&route.cache_name, &key, &response).await {
                    tracing::warn!(
                        cache_name = %route.cache_name,
                        key = %key,
                        error = %e,
                        "cache write failed; serving uncached network response"
                    );
                }
                return Ok(Served::new(response, ResponseSource::Network));
            }
            Ok(response) => format!("status {}", response.status),
            Err(e) => e.to_string(),
        };

        tracing::debug!(
            cache_name = %route.cache_name,
            pattern = route.pattern(),
            key = %key,
            reason = %failure,
            "network failed, trying cache"
        );

        match self.store.get(&route.partition, &key).await {
            Ok(Some(entry)) => {
                tracing::info!(cache_name = %route.cache_name, key = %key, "served from runtime cache");
                Ok(Served::new(entry.response, ResponseSource::RuntimeCache))
            }
            Ok(None) => Err(Error::NetworkAndCacheMiss(format!("{key} ({failure})"))),
            Err(e) => {
                tracing::warn!(cache_name = %route.cache_name, key = %key, error = %e, "cache read failed");
                Err(Error::NetworkAndCacheMiss(format!("{key} ({failure})")))
            }
        }
    }
}
