//! The offline worker: entry point for activation and fetch events.
//!
//! Per-request flow:
//!
//! 1. Non-GET requests are declined.
//! 2. Same-origin paths in the active precache are served from it.
//! 3. Requests matching a runtime route go through network-first.
//! 4. Unmatched navigations are fetched directly; unmatched sub-resources
//!    are declined.
//! 5. Navigations that still fail get the fallback document.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::config::AppConfig;
use crate::eviction::EvictionPolicy;
use crate::fallback::NavigationFallback;
use crate::manifest::PrecacheManifest;
use crate::precache::{ActivationReport, PrecacheManager};
use crate::routing::{Classification, RouteMatcher, RoutePattern};
use crate::strategy::{NetworkFirst, ResponseSource, Served, fetch_with_deadline};
use crate::transport::{Request, Transport};

/// Answer to a fetch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The worker produced a response.
    Respond(Served),
    /// The worker declines; the host performs its default network handling.
    PassThrough,
}

/// Cache orchestration for one `cache_id`.
pub struct OfflineWorker {
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    matcher: RouteMatcher,
    eviction: Arc<EvictionPolicy>,
    strategy: NetworkFirst,
    precache: PrecacheManager,
    fallback: NavigationFallback,
    timeout: Duration,
}

impl OfflineWorker {
    /// Assemble a worker from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an unusable route configuration and
    /// storage errors from restoring the active precache.
    pub async fn open(
        config: &AppConfig, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let matcher = RouteMatcher::from_config(&config.cache_id, &config.runtime_caching)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let timeout = config.network_timeout();

        let eviction = Arc::new(EvictionPolicy::new(Arc::clone(&store), matcher.routes()));
        let strategy = NetworkFirst::new(Arc::clone(&transport), Arc::clone(&store), Arc::clone(&eviction), timeout);
        let precache =
            PrecacheManager::load(&config.cache_id, origin, Arc::clone(&store), Arc::clone(&transport), timeout).await?;

        tracing::info!(
            cache_id = %config.cache_id,
            routes = matcher.routes().len(),
            precache_version = ?precache.active_version().await,
            "offline worker ready"
        );

        Ok(Self {
            store,
            transport,
            matcher,
            eviction,
            strategy,
            precache,
            fallback: NavigationFallback::new(&config.navigation_fallback_path),
            timeout,
        })
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn precache(&self) -> &PrecacheManager {
        &self.precache
    }

    /// Activation event: reconcile the precache with `manifest`.
    pub async fn activate(&self, manifest: &PrecacheManifest) -> Result<ActivationReport, Error> {
        if !manifest.contains(self.fallback.path()) {
            tracing::warn!(
                path = %self.fallback.path(),
                version = %manifest.version(),
                "manifest does not include the navigation fallback document"
            );
        }
        self.precache.activate(manifest).await
    }

    /// Fetch interception event.
    ///
    /// # Errors
    ///
    /// Returns `Error::NetworkAndCacheMiss` (or the network error for an
    /// unmatched request) when nothing can answer a sub-resource, and
    /// `Error::PrecacheUnavailable` when a navigation fails and the fallback
    /// document is not precached.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "declining non-GET request");
            return Ok(FetchOutcome::PassThrough);
        }

        match self.precache.lookup_url(&request.url).await {
            Ok(Some(response)) => {
                return Ok(FetchOutcome::Respond(Served::new(response, ResponseSource::Precache)));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %request.url, error = %e, "precache read failed"),
        }

        match self.matcher.classify(&request.url) {
            Classification::Matched(route) => match self.strategy.handle(route, request).await {
                Ok(served) => Ok(FetchOutcome::Respond(served)),
                Err(e) => self.fall_back(request, e).await,
            },
            Classification::Unmatched if request.is_navigation() => {
                match fetch_with_deadline(self.transport.as_ref(), request, self.timeout).await {
                    Ok(response) => Ok(FetchOutcome::Respond(Served::new(response, ResponseSource::Network))),
                    Err(e) => self.fall_back(request, e).await,
                }
            }
            Classification::Unmatched => Ok(FetchOutcome::PassThrough),
        }
    }

    async fn fall_back(&self, request: &Request, error: Error) -> Result<FetchOutcome, Error> {
        match self.fallback.serve(&self.precache, request).await {
            Ok(Some(document)) => {
                tracing::info!(url = %request.url, reason = %error, "serving navigation fallback");
                Ok(FetchOutcome::Respond(Served::new(document, ResponseSource::Fallback)))
            }
            Ok(None) if request.is_navigation() => Err(Error::PrecacheUnavailable(format!(
                "{} is not precached; {error}",
                self.fallback.path()
            ))),
            Ok(None) => Err(error),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "navigation fallback read failed");
                Err(error)
            }
        }
    }

    fn route(&self, cache_name: &str) -> Result<&RoutePattern, Error> {
        self.matcher
            .route(cache_name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown cache name: {cache_name}")))
    }

    /// Cached runtime entry for a GET of `url` in `cache_name`.
    pub async fn runtime_entry(&self, cache_name: &str, url: &Url) -> Result<Option<CacheEntry>, Error> {
        let route = self.route(cache_name)?;
        self.store
            .get(&route.partition, &CacheKey::for_request(&Request::get(url.clone())))
            .await
    }

    /// Keys of `cache_name`, oldest first.
    pub async fn runtime_keys(&self, cache_name: &str) -> Result<Vec<CacheKey>, Error> {
        let route = self.route(cache_name)?;
        self.eviction.settle(&route.cache_name).await?;
        self.store.keys_ordered_by_insertion(&route.partition).await
    }

    /// Delete the whole runtime partition of `cache_name`.
    pub async fn purge(&self, cache_name: &str) -> Result<bool, Error> {
        let route = self.route(cache_name)?;
        let removed = self.eviction.clear(&route.cache_name).await?;
        tracing::info!(cache_name, removed, "purged runtime cache");
        Ok(removed)
    }

    /// Wait for pending eviction passes on every runtime partition.
    pub async fn settle(&self) -> Result<(), Error> {
        for route in self.matcher.routes() {
            self.eviction.settle(&route.cache_name).await?;
        }
        Ok(())
    }
}
