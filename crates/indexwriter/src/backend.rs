//! Pluggable key-value storage for the document store (§4.6). Keys are
//! `{logicalIndex}/{id}` strings; values are opaque bytes (a JSON-encoded
//! [`crate::StoredDoc`]) — the backend itself knows nothing about the
//! document shapes it stores.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::IndexWriterError;

pub trait IndexBackend: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexWriterError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexWriterError>;
    fn delete(&self, key: &str) -> Result<(), IndexWriterError>;
    fn exists(&self, key: &str) -> Result<bool, IndexWriterError> {
        Ok(self.get(key)?.is_some())
    }
    /// Scans every value under `prefix`, calling the visitor for each one.
    /// Used for humId allocation and for facet/ICD10 batch passes.
    fn scan_prefix(&self, prefix: &str, visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexWriterError>) -> Result<(), IndexWriterError>;
}

#[derive(Clone, Debug, Default)]
pub enum BackendConfig {
    Redb { path: String },
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn redb(path: impl Into<String>) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn IndexBackend>, IndexWriterError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(crate::redb_backend::RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(IndexWriterError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// In-memory backend for tests and for single-process development runs.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexWriterError> {
        self.records
            .write()
            .map_err(|_| IndexWriterError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexWriterError> {
        Ok(self.records.read().map_err(|_| IndexWriterError::backend("poisoned lock"))?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), IndexWriterError> {
        self.records.write().map_err(|_| IndexWriterError::backend("poisoned lock"))?.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str, visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexWriterError>) -> Result<(), IndexWriterError> {
        let guard = self.records.read().map_err(|_| IndexWriterError::backend("poisoned lock"))?;
        for (key, value) in guard.iter() {
            if key.starts_with(prefix) {
                visitor(value)?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "backend-redb")]
pub use crate::redb_backend::RedbBackend;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let backend = InMemoryBackend::new();
        backend.put("research/hum0014", b"payload").unwrap();
        assert_eq!(backend.get("research/hum0014").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn scan_prefix_only_visits_matching_keys() {
        let backend = InMemoryBackend::new();
        backend.put("research/hum0014", b"a").unwrap();
        backend.put("dataset/JGAD000001-v1", b"b").unwrap();

        let mut seen = Vec::new();
        backend.scan_prefix("research/", &mut |v| {
            seen.push(v.to_vec());
            Ok(())
        }).unwrap();

        assert_eq!(seen, vec![b"a".to_vec()]);
    }

    #[test]
    fn delete_removes_the_key() {
        let backend = InMemoryBackend::new();
        backend.put("research/hum0014", b"a").unwrap();
        backend.delete("research/hum0014").unwrap();
        assert_eq!(backend.get("research/hum0014").unwrap(), None);
    }
}
