//! Unified error types for swkit.
//!
//! The code prefix in each message is stable and doubles as the
//! machine-readable error class for hosts.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Backend failure with no dedicated variant; carries the backend's message.
    #[error("STORAGE_ERROR: {0}")]
    StorageBackend(String),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored data could not be decoded.
    #[error("STORAGE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The store refused a write because its quota is exhausted.
    #[error("STORAGE_ERROR: quota exceeded ({0} entries)")]
    QuotaExceeded(usize),

    /// Network request failed before a response arrived.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Network request exceeded its deadline.
    #[error("NETWORK_TIMEOUT: {0}")]
    NetworkTimeout(String),

    /// Response body exceeded the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Neither the network nor the runtime cache could answer.
    #[error("NETWORK_AND_CACHE_MISS: {0}")]
    NetworkAndCacheMiss(String),

    /// An asset listed in the manifest could not be fetched during activation.
    #[error("PRECACHE_FETCH_ERROR: {path}: {reason}")]
    PrecacheFetch { path: String, reason: String },

    /// No active precache holds the requested document.
    #[error("PRECACHE_UNAVAILABLE: {0}")]
    PrecacheUnavailable(String),

    /// Manifest is malformed.
    #[error("INVALID_MANIFEST: {0}")]
    InvalidManifest(String),
}

impl Error {
    /// Whether this error came from the cache backend.
    ///
    /// Storage errors are non-fatal for request handling: the caller serves
    /// what it already has and logs the failure.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Database(_)
                | Error::StorageBackend(_)
                | Error::MigrationFailed(_)
                | Error::CorruptEntry(_)
                | Error::QuotaExceeded(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            other => Error::StorageBackend(other.to_string()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => -32602,
            Error::CacheMiss(_) => -32001,
            Error::Database(_)
            | Error::StorageBackend(_)
            | Error::MigrationFailed(_)
            | Error::CorruptEntry(_)
            | Error::QuotaExceeded(_) => -32002,
            Error::Network(_) => -32003,
            Error::NetworkTimeout(_) => -32004,
            Error::FetchTooLarge(_) => -32005,
            Error::NetworkAndCacheMiss(_) => -32006,
            Error::PrecacheFetch { .. } => -32007,
            Error::PrecacheUnavailable(_) => -32008,
            Error::InvalidManifest(_) => -32009,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NetworkAndCacheMiss("https://example.com/item/1".to_string());
        assert!(err.to_string().starts_with("NETWORK_AND_CACHE_MISS"));
        assert!(err.to_string().contains("/item/1"));
    }

    #[test]
    fn test_precache_fetch_display() {
        let err = Error::PrecacheFetch { path: "/js/app.js".into(), reason: "status 404".into() };
        assert_eq!(err.to_string(), "PRECACHE_FETCH_ERROR: /js/app.js: status 404");
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::QuotaExceeded(10).is_storage());
        assert!(Error::CorruptEntry("bad".into()).is_storage());
        assert!(!Error::Network("down".into()).is_storage());
    }

    #[test]
    fn test_call_error_conversion_keeps_cause() {
        let inner: tokio_rusqlite::Error<Error> = tokio_rusqlite::Error::Error(Error::CorruptEntry("bad row".into()));
        assert!(matches!(Error::from(inner), Error::CorruptEntry(msg) if msg == "bad row"));

        let closed: tokio_rusqlite::Error<Error> = tokio_rusqlite::Error::ConnectionClosed;
        let err = Error::from(closed);
        assert!(err.is_storage());
        assert!(err.to_string().contains("ConnectionClosed"));

        let err = Error::StorageBackend("disk I/O error".into());
        assert!(err.is_storage());
        assert_eq!(err.to_string(), "STORAGE_ERROR: disk I/O error");
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32002);
        assert!(mcp_err.message.contains("disk I/O error"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let err = Error::NetworkAndCacheMiss("x".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32006);
    }
}
