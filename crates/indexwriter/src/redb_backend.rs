//! Redb-backed [`IndexBackend`] (§4.6): a pure-Rust embedded store so the
//! document store has no external-process dependency.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::backend::IndexBackend;
use crate::error::IndexWriterError;

const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexWriterError> {
        let db = Database::create(path).map_err(IndexWriterError::backend)?;

        let write_txn = db.begin_write().map_err(IndexWriterError::backend)?;
        {
            write_txn.open_table(DOCUMENTS_TABLE).map_err(IndexWriterError::backend)?;
        }
        write_txn.commit().map_err(IndexWriterError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexWriterError> {
        let write_txn = self.db.begin_write().map_err(IndexWriterError::backend)?;
        {
            let mut table = write_txn.open_table(DOCUMENTS_TABLE).map_err(IndexWriterError::backend)?;
            table.insert(key, value).map_err(IndexWriterError::backend)?;
        }
        write_txn.commit().map_err(IndexWriterError::backend)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexWriterError> {
        let read_txn = self.db.begin_read().map_err(IndexWriterError::backend)?;
        let table = read_txn.open_table(DOCUMENTS_TABLE).map_err(IndexWriterError::backend)?;
        match table.get(key).map_err(IndexWriterError::backend)? {
            Some(value) => Ok(Some(value.value().to_vec())),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<(), IndexWriterError> {
        let write_txn = self.db.begin_write().map_err(IndexWriterError::backend)?;
        {
            let mut table = write_txn.open_table(DOCUMENTS_TABLE).map_err(IndexWriterError::backend)?;
            table.remove(key).map_err(IndexWriterError::backend)?;
        }
        write_txn.commit().map_err(IndexWriterError::backend)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str, visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexWriterError>) -> Result<(), IndexWriterError> {
        let read_txn = self.db.begin_read().map_err(IndexWriterError::backend)?;
        let table = read_txn.open_table(DOCUMENTS_TABLE).map_err(IndexWriterError::backend)?;

        for item in table.range(prefix..).map_err(IndexWriterError::backend)? {
            let (key, value) = item.map_err(IndexWriterError::backend)?;
            if !key.value().starts_with(prefix) {
                break;
            }
            visitor(value.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn roundtrip_through_redb() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend.put("research/hum0014", b"payload").unwrap();
        assert_eq!(backend.get("research/hum0014").unwrap(), Some(b"payload".to_vec()));

        backend.delete("research/hum0014").unwrap();
        assert_eq!(backend.get("research/hum0014").unwrap(), None);
    }

    #[test]
    fn scan_prefix_stops_at_the_boundary() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend.put("dataset/JGAD000001-v1", b"a").unwrap();
        backend.put("dataset/JGAD000002-v1", b"b").unwrap();
        backend.put("research/hum0014", b"c").unwrap();

        let mut seen = Vec::new();
        backend.scan_prefix("dataset/", &mut |v| {
            seen.push(v.to_vec());
            Ok(())
        }).unwrap();

        assert_eq!(seen.len(), 2);
    }
}
