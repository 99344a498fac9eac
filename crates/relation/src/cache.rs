//! Disk-persisted memoizing cache for relation-service lookups (§4.3.5(f),
//! §6, §9). Reads are lock-free after an initial populate; the single
//! writer lock is only taken on insert, and the whole map is flushed to
//! disk once at stage teardown — matching §5's "shared read-mostly state"
//! model for the relation cache.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::error::RelationError;

#[derive(Debug, Default)]
pub struct RelationCache {
    inner: RwLock<HashMap<String, Vec<String>>>,
}

impl RelationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a persisted cache file if it exists; an absent file is treated
    /// as an empty cache rather than an error (first run of the pipeline).
    pub fn load(path: &Path) -> Result<Self, RelationError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| RelationError::CacheIo(format!("reading {}: {e}", path.display())))?;
        let map: HashMap<String, Vec<String>> = serde_json::from_str(&raw)
            .map_err(|e| RelationError::CacheIo(format!("parsing {}: {e}", path.display())))?;
        Ok(Self {
            inner: RwLock::new(map),
        })
    }

    pub fn get(&self, jgas_id: &str) -> Option<Vec<String>> {
        self.inner
            .read()
            .expect("relation cache lock poisoned")
            .get(jgas_id)
            .cloned()
    }

    pub fn insert(&self, jgas_id: String, jgad_ids: Vec<String>) {
        self.inner
            .write()
            .expect("relation cache lock poisoned")
            .insert(jgas_id, jgad_ids);
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("relation cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the whole map to `path` atomically: serialize to a sibling
    /// temp file, then rename over the target (§5 "stages write atomically
    /// via temp-file + rename").
    pub fn flush(&self, path: &Path) -> Result<(), RelationError> {
        let snapshot = self.inner.read().expect("relation cache lock poisoned");
        let body = serde_json::to_string_pretty(&*snapshot)
            .map_err(|e| RelationError::CacheIo(format!("serializing cache: {e}")))?;
        drop(snapshot);

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, body)
            .map_err(|e| RelationError::CacheIo(format!("writing {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, path)
            .map_err(|e| RelationError::CacheIo(format!("renaming into {}: {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_cache() {
        let cache = RelationCache::load(Path::new("/nonexistent/relation-cache.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let cache = RelationCache::new();
        cache.insert("JGAS000114".into(), vec!["JGAD000220".into(), "JGAD000410".into()]);
        assert_eq!(
            cache.get("JGAS000114"),
            Some(vec!["JGAD000220".to_string(), "JGAD000410".to_string()])
        );
        assert_eq!(cache.get("JGAS999999"), None);
    }

    #[test]
    fn flush_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relation-cache.json");

        let cache = RelationCache::new();
        cache.insert("JGAS000114".into(), vec!["JGAD000220".into()]);
        cache.flush(&path).unwrap();

        let reloaded = RelationCache::load(&path).unwrap();
        assert_eq!(reloaded.get("JGAS000114"), Some(vec!["JGAD000220".to_string()]));
    }
}
