//! Asset manifest produced by the build step.
//!
//! A manifest is an ordered list of `(path, fingerprint)` pairs plus a
//! version string. When no version is given, it is derived from the
//! entries, so any fingerprint change yields a new version.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;

/// One static file and its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AssetEntry {
    /// Origin-relative path, always starting with `/`.
    pub path: String,
    pub fingerprint: String,
}

impl AssetEntry {
    pub fn new(path: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self { path: path.into(), fingerprint: fingerprint.into() }
    }
}

/// Compute the content fingerprint of an asset.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Derive a manifest version from its ordered entries.
pub fn compute_version(entries: &[AssetEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.path.as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.fingerprint.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// A versioned, ordered set of assets to precache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheManifest {
    version: String,
    entries: Vec<AssetEntry>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    version: Option<String>,
    entries: Vec<AssetEntry>,
}

impl PrecacheManifest {
    /// Build a manifest whose version is derived from `entries`.
    pub fn new(entries: Vec<AssetEntry>) -> Result<Self, Error> {
        let version = compute_version(&entries);
        Self::with_version(version, entries)
    }

    /// Build a manifest with an explicit version.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidManifest` if the version is empty, a path is
    /// not origin-relative, a fingerprint is empty, or a path repeats.
    pub fn with_version(version: impl Into<String>, entries: Vec<AssetEntry>) -> Result<Self, Error> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(Error::InvalidManifest("version must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !entry.path.starts_with('/') {
                return Err(Error::InvalidManifest(format!("path must start with '/': {}", entry.path)));
            }
            if entry.fingerprint.is_empty() {
                return Err(Error::InvalidManifest(format!("empty fingerprint for {}", entry.path)));
            }
            if !seen.insert(entry.path.as_str()) {
                return Err(Error::InvalidManifest(format!("duplicate path {}", entry.path)));
            }
        }

        Ok(Self { version, entries })
    }

    /// Parse the JSON form `{ "version"?: string, "entries": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: RawManifest = serde_json::from_str(json).map_err(|e| Error::InvalidManifest(e.to_string()))?;
        match raw.version {
            Some(version) => Self::with_version(version, raw.entries),
            None => Self::new(raw.entries),
        }
    }

    /// Read and parse a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidManifest(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidManifest(e.to_string()))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[AssetEntry] {
        &self.entries
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<AssetEntry> {
        vec![AssetEntry::new("/index.html", "aaa"), AssetEntry::new("/js/main.js", "bbb")]
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(b"hello");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fingerprint(b"hello"));
        assert_ne!(fp, fingerprint(b"hello!"));
    }

    #[test]
    fn test_version_changes_with_fingerprint() {
        let v1 = PrecacheManifest::new(entries()).unwrap();
        let mut changed = entries();
        changed[1].fingerprint = "ccc".into();
        let v2 = PrecacheManifest::new(changed).unwrap();
        assert_ne!(v1.version(), v2.version());
        assert_eq!(v1.version(), PrecacheManifest::new(entries()).unwrap().version());
    }

    #[test]
    fn test_rejects_duplicate_path() {
        let mut dup = entries();
        dup.push(AssetEntry::new("/index.html", "zzz"));
        assert!(matches!(PrecacheManifest::new(dup), Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_rejects_relative_path() {
        let result = PrecacheManifest::new(vec![AssetEntry::new("index.html", "aaa")]);
        assert!(matches!(result, Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_from_json_with_and_without_version() {
        let explicit = PrecacheManifest::from_json(
            r#"{"version":"v2","entries":[{"path":"/index.html","fingerprint":"aaa"}]}"#,
        )
        .unwrap();
        assert_eq!(explicit.version(), "v2");
        assert!(explicit.contains("/index.html"));

        let derived = PrecacheManifest::from_json(r#"{"entries":[{"path":"/index.html","fingerprint":"aaa"}]}"#)
            .unwrap();
        assert_eq!(derived.version(), compute_version(derived.entries()));
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(PrecacheManifest::from_json("{"), Err(Error::InvalidManifest(_))));
    }
}
