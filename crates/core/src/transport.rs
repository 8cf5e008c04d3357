//! Network transport abstraction.
//!
//! The worker never talks to the network directly; it goes through a
//! [`Transport`] so the HTTP stack can be swapped (reqwest in production,
//! a scripted transport in tests).

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Whether a request loads a full document or a sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Full document load (page navigation).
    Navigate,
    /// Script, style, image, API call, ...
    Subresource,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(method: &str, url: Url, mode: RequestMode) -> Self {
        Self { method: method.trim().to_ascii_uppercase(), url, mode }
    }

    /// A sub-resource GET.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Subresource)
    }

    /// A navigation GET.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// A response payload with its headers, as fetched or as cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Performs the actual network request.
///
/// Implementations return `Ok` for any HTTP status; deciding whether a
/// status counts as success is the caller's policy. `Err` is reserved for
/// requests that produced no response at all.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Scripted transport for tests in this and dependent crates.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted reply for one URL.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Ok(u16, &'static str),
        Fail,
        Hang,
    }

    /// Transport answering from a per-URL script; unknown URLs fail.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<HashMap<String, Reply>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, url: &str, reply: Reply) {
            self.replies
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(url.to_string(), reply);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(request.url.as_str())
                .cloned();
            match reply {
                Some(Reply::Ok(status, body)) => Ok(Response::new(
                    status,
                    vec![("content-type".to_string(), "text/plain".to_string())],
                    body.as_bytes().to_vec(),
                )),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(Error::Network("hung".into()))
                }
                Some(Reply::Fail) | None => Err(Error::Network(format!("unreachable: {}", request.url))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_method_normalized() {
        let req = Request::new(" post ", Url::parse("https://example.com").unwrap(), RequestMode::Subresource);
        assert_eq!(req.method, "POST");
        assert!(!req.is_get());
        assert!(!req.is_navigation());
    }

    #[test]
    fn test_navigate_request() {
        let req = Request::navigate(Url::parse("https://example.com/").unwrap());
        assert!(req.is_get());
        assert!(req.is_navigation());
    }

    #[test]
    fn test_response_success_range() {
        assert!(Response::new(200, vec![], "").is_success());
        assert!(Response::new(204, vec![], "").is_success());
        assert!(!Response::new(304, vec![], "").is_success());
        assert!(!Response::new(503, vec![], "").is_success());
    }

    #[test]
    fn test_response_header_lookup() {
        let resp = Response::new(200, vec![("Content-Type".into(), "text/html".into())], "");
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.header("etag"), None);
    }
}
