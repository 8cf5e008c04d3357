//! Navigation Fallback: answer failed navigations with the app shell.

use crate::Error;
use crate::precache::PrecacheManager;
use crate::transport::{Request, Response};

/// Serves the precached fallback document to navigation requests.
#[derive(Debug, Clone)]
pub struct NavigationFallback {
    path: String,
}

impl NavigationFallback {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The fallback document for `request`, if it is a navigation and the
    /// document is precached. Sub-resource requests never get a fallback.
    pub async fn serve(&self, precache: &PrecacheManager, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_navigation() {
            return Ok(None);
        }
        let document = precache.lookup(&self.path).await?;
        if document.is_none() {
            tracing::warn!(path = %self.path, url = %request.url, "navigation fallback document is not precached");
        }
        Ok(document)
    }
}
