//! Precache manifest generation from a build output directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use swkit_core::manifest::fingerprint;
use swkit_core::{AssetEntry, PrecacheManifest};
use walkdir::WalkDir;

/// Walk `root` and fingerprint every file whose origin-relative path
/// matches none of `exclusions`.
pub fn generate(root: &Path, exclusions: &[String]) -> Result<PrecacheManifest> {
    let exclusions = exclusions
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid exclusion pattern: {p}")))
        .collect::<Result<Vec<_>>>()?;

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root)?;
        let path = format!(
            "/{}",
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        );

        if exclusions.iter().any(|re| re.is_match(&path)) {
            tracing::debug!(%path, "excluded from precache");
            continue;
        }

        let bytes = fs::read(entry.path()).with_context(|| format!("failed to read {}", entry.path().display()))?;
        entries.push(AssetEntry::new(path, fingerprint(&bytes)));
    }

    let manifest = PrecacheManifest::new(entries)?;
    tracing::info!(root = %root.display(), assets = manifest.entries().len(), version = %manifest.version(), "generated manifest");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("js/main.js"), "main()").unwrap();
        fs::write(dir.path().join("manifest.json"), "{}").unwrap();
        dir
    }

    #[test]
    fn test_generate_applies_exclusions() {
        let dir = site();
        let manifest = generate(dir.path(), &[r"manifest\.json$".to_string()]).unwrap();

        let paths: Vec<&str> = manifest.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/index.html", "/js/main.js"]);
        assert_eq!(manifest.entries()[1].fingerprint, fingerprint(b"main()"));
    }

    #[test]
    fn test_version_tracks_content() {
        let dir = site();
        let before = generate(dir.path(), &[]).unwrap();
        assert_eq!(before.entries().len(), 3);
        assert_eq!(generate(dir.path(), &[]).unwrap().version(), before.version());

        fs::write(dir.path().join("js/main.js"), "main(2)").unwrap();
        assert_ne!(generate(dir.path(), &[]).unwrap().version(), before.version());
    }

    #[test]
    fn test_invalid_exclusion() {
        let dir = site();
        assert!(generate(dir.path(), &["(".to_string()]).is_err());
    }

    #[test]
    fn test_missing_root() {
        assert!(generate(Path::new("/nonexistent/swkit-site"), &[]).is_err());
    }
}
