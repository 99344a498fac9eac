//! The relation-service port: study -> dataset expansion (§4.3.5(f), §6),
//! wrapped with a disk-persisted memoizing cache so a pipeline run never
//! asks the same JGAS id twice (§4.3.5 "This pipeline is pure apart from
//! step (f). The relation service must be memoized for the run.").

mod cache;
mod client;
mod error;

use std::path::Path;
use std::pin::Pin;
use std::future::Future;

pub use cache::RelationCache;
pub use client::{HttpRelationService, RelationService};
pub use error::RelationError;

/// Wraps any [`RelationService`] with the memoizing cache. Cache hits never
/// touch the inner service; misses populate the cache as they resolve.
pub struct CachingRelationService<R: RelationService> {
    inner: R,
    cache: RelationCache,
}

impl<R: RelationService> CachingRelationService<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RelationCache::new(),
        }
    }

    pub fn with_cache(inner: R, cache: RelationCache) -> Self {
        Self { inner, cache }
    }

    pub fn from_cache_file(inner: R, path: &Path) -> Result<Self, RelationError> {
        Ok(Self {
            inner,
            cache: RelationCache::load(path)?,
        })
    }

    pub fn flush(&self, path: &Path) -> Result<(), RelationError> {
        self.cache.flush(path)
    }

    pub fn cache(&self) -> &RelationCache {
        &self.cache
    }
}

impl<R: RelationService> RelationService for CachingRelationService<R> {
    fn get_datasets_from_study<'a>(
        &'a self,
        jgas_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RelationError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(cached) = self.cache.get(jgas_id) {
                return Ok(cached);
            }
            let resolved = self.inner.get_datasets_from_study(jgas_id).await?;
            self.cache.insert(jgas_id.to_string(), resolved.clone());
            Ok(resolved)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct CountingService {
        calls: Mutex<Vec<String>>,
        expansions: HashMap<String, Vec<String>>,
    }

    impl RelationService for CountingService {
        fn get_datasets_from_study<'a>(
            &'a self,
            jgas_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RelationError>> + Send + 'a>> {
            self.calls.lock().unwrap().push(jgas_id.to_string());
            let result = self.expansions.get(jgas_id).cloned().unwrap_or_default();
            Box::pin(async move { Ok(result) })
        }
    }

    #[tokio::test]
    async fn second_lookup_of_same_id_hits_the_cache() {
        let mut expansions = HashMap::new();
        expansions.insert("JGAS000114".to_string(), vec!["JGAD000220".to_string()]);
        let inner = CountingService {
            calls: Mutex::new(Vec::new()),
            expansions,
        };
        let service = CachingRelationService::new(inner);

        let first = service.get_datasets_from_study("JGAS000114").await.unwrap();
        let second = service.get_datasets_from_study("JGAS000114").await.unwrap();

        assert_eq!(first, vec!["JGAD000220".to_string()]);
        assert_eq!(second, vec!["JGAD000220".to_string()]);
        assert_eq!(service.inner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn flush_and_reload_preserves_memoized_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relation-cache.json");

        let mut expansions = HashMap::new();
        expansions.insert("JGAS000114".to_string(), vec!["JGAD000220".to_string()]);
        let inner = CountingService {
            calls: Mutex::new(Vec::new()),
            expansions,
        };
        let service = CachingRelationService::new(inner);
        service.get_datasets_from_study("JGAS000114").await.unwrap();
        service.flush(&path).unwrap();

        let reloaded_cache = RelationCache::load(&path).unwrap();
        assert_eq!(
            reloaded_cache.get("JGAS000114"),
            Some(vec!["JGAD000220".to_string()])
        );
    }
}
