//! On-disk cache mapping film page URLs to TMDB ids.
//!
//! The cache is a single pretty-printed JSON object loaded into memory once
//! and rewritten wholesale on every insert. Entries never expire: once a URL
//! has resolved to an id, that mapping is treated as permanently valid.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

/// Errors for cache persistence.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The cache file is not a valid JSON object of strings.
    #[error("cache file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent URL→TMDB-id cache.
#[derive(Debug)]
pub struct TmdbCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl TmdbCache {
    /// Opens the cache, loading existing entries from disk.
    ///
    /// A missing file yields an empty cache; a malformed file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the file exists but cannot be read or
    /// parsed.
    #[instrument(level = "debug", fields(path = %path.display()))]
    pub fn open(path: PathBuf) -> Result<Self, CacheError> {
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };

        debug!(entries = entries.len(), "opened id cache");
        Ok(Self { path, entries })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up the cached id for a film page URL.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    /// Inserts a mapping and rewrites the cache file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the file cannot be written.
    pub fn put(&mut self, url: &str, id: &str) -> Result<(), CacheError> {
        self.entries.insert(url.to_string(), id.to_string());
        self.flush()
    }

    /// Number of cached mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the cache holds no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str = "https://letterboxd.com/film/dune-part-two/";

    #[test]
    fn test_open_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = TmdbCache::open(temp.path().join("cache.json")).unwrap();
        assert!(cache.is_empty());
        assert!(cache.get(URL).is_none());
    }

    #[test]
    fn test_put_then_get() {
        let temp = TempDir::new().unwrap();
        let mut cache = TmdbCache::open(temp.path().join("cache.json")).unwrap();

        cache.put(URL, "693134").unwrap();
        assert_eq!(cache.get(URL), Some("693134"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entries_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");

        {
            let mut cache = TmdbCache::open(path.clone()).unwrap();
            cache.put(URL, "693134").unwrap();
            cache
                .put("https://letterboxd.com/film/the-matrix/", "603")
                .unwrap();
        }

        let cache = TmdbCache::open(path).unwrap();
        assert_eq!(cache.get(URL), Some("693134"));
        assert_eq!(
            cache.get("https://letterboxd.com/film/the-matrix/"),
            Some("603")
        );
    }

    #[test]
    fn test_file_is_a_pretty_printed_json_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");

        let mut cache = TmdbCache::open(path.clone()).unwrap();
        cache.put(URL, "693134").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains('\n'), "cache file should be pretty-printed");
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed[URL], "693134");
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let temp = TempDir::new().unwrap();
        let mut cache = TmdbCache::open(temp.path().join("cache.json")).unwrap();

        cache.put(URL, "1").unwrap();
        cache.put(URL, "2").unwrap();
        assert_eq!(cache.get(URL), Some("2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_open_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(TmdbCache::open(path), Err(CacheError::Json(_))));
    }
}
