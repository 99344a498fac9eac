//! Molecular-data key normalization (§4.3.6): row labels map through a
//! ja/en → canonical key table. A sentinel canonical value discards the
//! whole row; some canonical keys are "split keys" that duplicate one
//! incoming row across multiple canonical fields.

use std::collections::HashMap;

use tracing::warn;
use unicode_normalization::UnicodeNormalization;

/// What a raw row label resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MolDataKeyResolution {
    /// One canonical field.
    Canonical(String),
    /// The row is duplicated into all of these canonical fields.
    Split(Vec<String>),
    /// The row carries no usable data and must be dropped entirely.
    Discard,
    /// No mapping on file; the raw label survives unchanged and a warning
    /// is logged.
    Unknown(String),
}

#[derive(Debug, Clone, Default)]
pub struct MolDataKeyTable {
    entries: HashMap<String, MolDataKeyResolution>,
}

fn normalize_lookup_key(raw: &str) -> String {
    raw.nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

impl MolDataKeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_canonical(&mut self, raw_label: &str, canonical_key: impl Into<String>) {
        self.entries
            .insert(normalize_lookup_key(raw_label), MolDataKeyResolution::Canonical(canonical_key.into()));
    }

    pub fn insert_split(&mut self, raw_label: &str, canonical_keys: Vec<String>) {
        self.entries
            .insert(normalize_lookup_key(raw_label), MolDataKeyResolution::Split(canonical_keys));
    }

    pub fn insert_discard(&mut self, raw_label: &str) {
        self.entries.insert(normalize_lookup_key(raw_label), MolDataKeyResolution::Discard);
    }

    pub fn resolve(&self, raw_label: &str) -> MolDataKeyResolution {
        match self.entries.get(&normalize_lookup_key(raw_label)) {
            Some(resolution) => resolution.clone(),
            None => {
                warn!(label = raw_label, "unmapped molecular-data key preserved as-is");
                MolDataKeyResolution::Unknown(raw_label.to_string())
            }
        }
    }
}
