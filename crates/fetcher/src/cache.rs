//! Content-addressed HTTP response cache (§4.1, §5: "HTTP cache directory:
//! append-only per URL; concurrent readers allowed; writers keyed by URL
//! hash, so there is no write-write contention").

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::FetchError;

pub struct HttpCache {
    root: PathBuf,
}

impl HttpCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_for(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(format!("{}.html", Self::key_for(url)))
    }

    pub fn get(&self, url: &str) -> Option<String> {
        fs::read_to_string(self.path_for(url)).ok()
    }

    /// Writes the body for `url`, creating the cache directory if needed.
    /// Each URL hashes to its own file, so concurrent writers for different
    /// URLs never contend; a write for the same URL is an idempotent
    /// overwrite (the body for a given URL is expected to be stable).
    pub fn put(&self, url: &str, body: &str) -> Result<(), FetchError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| FetchError::CacheIo(format!("creating {}: {e}", self.root.display())))?;
        let path = self.path_for(url);
        let tmp_path = path.with_extension("html.tmp");
        fs::write(&tmp_path, body)
            .map_err(|e| FetchError::CacheIo(format!("writing {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| FetchError::CacheIo(format!("renaming into {}: {e}", path.display())))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::new(dir.path());
        assert!(cache.get("https://example.org/hum0001").is_none());
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::new(dir.path());
        cache.put("https://example.org/hum0001", "<html>body</html>").unwrap();
        assert_eq!(
            cache.get("https://example.org/hum0001").as_deref(),
            Some("<html>body</html>")
        );
    }

    #[test]
    fn different_urls_hash_to_different_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::new(dir.path());
        cache.put("https://example.org/a", "a").unwrap();
        cache.put("https://example.org/b", "b").unwrap();
        assert_eq!(cache.get("https://example.org/a").as_deref(), Some("a"));
        assert_eq!(cache.get("https://example.org/b").as_deref(), Some("b"));
    }
}
