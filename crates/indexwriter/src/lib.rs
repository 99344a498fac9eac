//! IndexWriter (§4.6): `create`/`update`/`delete` over three logical
//! indices (`research`, `research-version`, `dataset`) with optimistic
//! concurrency (sequence number + primary term) and humId allocation.

mod backend;
mod error;
#[cfg(feature = "backend-redb")]
mod redb_backend;

pub use backend::{BackendConfig, IndexBackend, InMemoryBackend};
#[cfg(feature = "backend-redb")]
pub use redb_backend::RedbBackend;
pub use error::IndexWriterError;

use common::{HumId, Research, ResearchVersion};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

pub const RESEARCH_INDEX: &str = "research";
pub const RESEARCH_VERSION_INDEX: &str = "research-version";
pub const DATASET_INDEX: &str = "dataset";

const HUM_ID_ALLOCATION_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDoc {
    seq_no: u64,
    primary_term: u64,
    doc: serde_json::Value,
}

/// A document plus the optimistic-concurrency tokens an updater must
/// present on its next write.
#[derive(Debug, Clone)]
pub struct GetResult<T> {
    pub doc: T,
    pub seq_no: u64,
    pub primary_term: u64,
}

pub struct IndexWriter {
    backend: Box<dyn IndexBackend>,
}

impl IndexWriter {
    pub fn new(backend: Box<dyn IndexBackend>) -> Self {
        Self { backend }
    }

    pub fn open(config: &BackendConfig) -> Result<Self, IndexWriterError> {
        Ok(Self::new(config.build()?))
    }

    fn key(logical_index: &str, id: &str) -> String {
        format!("{logical_index}/{id}")
    }

    pub fn get<T: DeserializeOwned>(&self, logical_index: &str, id: &str) -> Result<Option<GetResult<T>>, IndexWriterError> {
        let Some(bytes) = self.backend.get(&Self::key(logical_index, id))? else {
            return Ok(None);
        };
        let stored: StoredDoc = serde_json::from_slice(&bytes)?;
        let doc = serde_json::from_value(stored.doc)?;
        Ok(Some(GetResult { doc, seq_no: stored.seq_no, primary_term: stored.primary_term }))
    }

    /// Fails with `Conflict` if a document already exists at `id`.
    pub fn create(&self, logical_index: &str, id: &str, doc: &impl Serialize) -> Result<(), IndexWriterError> {
        let key = Self::key(logical_index, id);
        if self.backend.exists(&key)? {
            return Err(IndexWriterError::Conflict(key));
        }
        let stored = StoredDoc { seq_no: 0, primary_term: 1, doc: serde_json::to_value(doc)? };
        self.backend.put(&key, &serde_json::to_vec(&stored)?)
    }

    /// Returns `Ok(None)` — never an error — when `seq_no`/`primary_term`
    /// no longer match, so callers can retry with a fresh read (§5 "Shared
    /// resource policy").
    pub fn update<T: DeserializeOwned>(
        &self,
        logical_index: &str,
        id: &str,
        doc: &impl Serialize,
        seq_no: u64,
        primary_term: u64,
    ) -> Result<Option<GetResult<T>>, IndexWriterError> {
        let key = Self::key(logical_index, id);
        let Some(existing_bytes) = self.backend.get(&key)? else {
            return Ok(None);
        };
        let existing: StoredDoc = serde_json::from_slice(&existing_bytes)?;
        if existing.seq_no != seq_no || existing.primary_term != primary_term {
            return Ok(None);
        }

        let updated = StoredDoc { seq_no: existing.seq_no + 1, primary_term, doc: serde_json::to_value(doc)? };
        self.backend.put(&key, &serde_json::to_vec(&updated)?)?;
        let doc = serde_json::from_value(updated.doc)?;
        Ok(Some(GetResult { doc, seq_no: updated.seq_no, primary_term: updated.primary_term }))
    }

    /// Soft delete: sets `status` to `"deleted"` in place rather than
    /// removing the key, so historical seq_no/primary_term reads stay
    /// meaningful.
    pub fn delete(&self, logical_index: &str, id: &str) -> Result<(), IndexWriterError> {
        let key = Self::key(logical_index, id);
        let Some(existing_bytes) = self.backend.get(&key)? else {
            return Ok(());
        };
        let mut existing: StoredDoc = serde_json::from_slice(&existing_bytes)?;
        if let serde_json::Value::Object(map) = &mut existing.doc {
            map.insert("status".to_string(), serde_json::Value::String("deleted".to_string()));
        }
        existing.seq_no += 1;
        self.backend.put(&key, &serde_json::to_vec(&existing)?)
    }

    /// Generates the next humId and reserves it with create-only
    /// semantics, retrying up to [`HUM_ID_ALLOCATION_RETRIES`] times on a
    /// race against another allocator (§4.6).
    pub fn allocate_hum_id(&self) -> Result<HumId, IndexWriterError> {
        for _ in 0..HUM_ID_ALLOCATION_RETRIES {
            let mut existing = Vec::new();
            self.backend.scan_prefix(&format!("{RESEARCH_INDEX}/"), &mut |bytes| {
                if let Ok(stored) = serde_json::from_slice::<StoredDoc>(bytes) {
                    if let Some(hum_id) = stored.doc.get("humId").and_then(|v| v.as_str()) {
                        if let Ok(parsed) = hum_id.parse::<HumId>() {
                            existing.push(parsed);
                        }
                    }
                }
                Ok(())
            })?;

            let candidate = HumId::next_after(existing);
            let placeholder = serde_json::json!({ "humId": candidate.to_string() });
            match self.create(RESEARCH_INDEX, &candidate.to_string(), &placeholder) {
                Ok(()) => return Ok(candidate),
                Err(IndexWriterError::Conflict(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(IndexWriterError::HumIdAllocationExhausted(HUM_ID_ALLOCATION_RETRIES))
    }

    /// Atomically creates a Research record's first version (§4.6):
    /// writes `ResearchVersion v1` first, then fills in the `Research`
    /// placeholder reserved by [`Self::allocate_hum_id`]. If the Research
    /// write fails, the version write is rolled back best-effort.
    pub fn create_research(&self, research: &Research, version: &ResearchVersion) -> Result<(), IndexWriterError> {
        let hum_id = research.hum_id.to_string();
        let version_id = version.hum_version_id.to_string();

        self.create(RESEARCH_VERSION_INDEX, &version_id, version)?;

        match self.update::<Research>(RESEARCH_INDEX, &hum_id, research, 0, 1) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                self.rollback_version(&version_id);
                Err(IndexWriterError::Backend(format!(
                    "research document {hum_id} was not in its freshly-allocated state"
                )))
            }
            Err(err) => {
                self.rollback_version(&version_id);
                Err(err)
            }
        }
    }

    /// Lists every document under `logical_index`. The document's own id
    /// field (`humId`, `datasetId`, ...) is part of `T`, so callers don't
    /// need the storage key back. Used by the search layer, which has no
    /// separate query index and scans the document store directly (§4.7).
    pub fn scan<T: DeserializeOwned>(&self, logical_index: &str) -> Result<Vec<GetResult<T>>, IndexWriterError> {
        let prefix = format!("{logical_index}/");
        let mut results = Vec::new();
        let mut first_error = None;
        self.backend.scan_prefix(&prefix, &mut |bytes| {
            let stored: StoredDoc = serde_json::from_slice(bytes)?;
            match serde_json::from_value(stored.doc) {
                Ok(doc) => results.push(GetResult { doc, seq_no: stored.seq_no, primary_term: stored.primary_term }),
                Err(err) => first_error.get_or_insert(err),
            };
            Ok(())
        })?;
        if let Some(err) = first_error {
            return Err(err.into());
        }
        Ok(results)
    }

    fn rollback_version(&self, version_id: &str) {
        if let Err(err) = self.backend.delete(&Self::key(RESEARCH_VERSION_INDEX, version_id)) {
            tracing::warn!(version_id, %err, "best-effort rollback of ResearchVersion failed");
        }
    }
}
