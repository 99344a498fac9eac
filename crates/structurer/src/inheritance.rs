//! Metadata inheritance (§4.4.2): a child dataset ID discovered inside
//! molecular data inherits criteria/releaseDate/typeOfData from the nearest
//! ancestor by dotted-prefix match; an explicit per-child override table
//! supersedes prefix matching entirely.

use std::collections::HashMap;

use common::Criteria;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InheritedMetadata {
    pub criteria: Vec<Criteria>,
    pub release_date: Option<String>,
    pub type_of_data: (Option<String>, Option<String>),
}

#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    /// Metadata attached directly to a dataset ID as it appeared in a
    /// summary table (the candidate ancestors).
    declared: HashMap<String, InheritedMetadata>,
    /// Explicit per-child overrides, keyed on the child ID itself.
    overrides: HashMap<String, InheritedMetadata>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, dataset_id: impl Into<String>, metadata: InheritedMetadata) {
        self.declared.insert(dataset_id.into(), metadata);
    }

    pub fn set_override(&mut self, child_id: impl Into<String>, metadata: InheritedMetadata) {
        self.overrides.insert(child_id.into(), metadata);
    }

    /// Resolves metadata for `dataset_id`: an explicit override wins
    /// outright; otherwise the nearest dotted-prefix ancestor with declared
    /// metadata applies (`hum0014.v3.T2DM-1.v1` checks
    /// `hum0014.v3.T2DM-1`, then `hum0014.v3`, then `hum0014`).
    pub fn resolve(&self, dataset_id: &str) -> InheritedMetadata {
        if let Some(metadata) = self.overrides.get(dataset_id) {
            return metadata.clone();
        }
        if let Some(metadata) = self.declared.get(dataset_id) {
            return metadata.clone();
        }

        for ancestor in ancestors(dataset_id) {
            if let Some(metadata) = self.declared.get(&ancestor) {
                return metadata.clone();
            }
        }

        InheritedMetadata::default()
    }
}

/// Yields `hum0014.v3.T2DM-1`, `hum0014.v3`, `hum0014` for
/// `hum0014.v3.T2DM-1.v1`, nearest first.
fn ancestors(dataset_id: &str) -> Vec<String> {
    let parts: Vec<&str> = dataset_id.split('.').collect();
    (1..parts.len()).rev().map(|n| parts[..n].join(".")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_ancestor_wins_over_farther_one() {
        let mut table = MetadataTable::new();
        table.declare("hum0014.v3", InheritedMetadata { release_date: Some("2021-04-01".into()), ..Default::default() });
        table.declare(
            "hum0014.v3.T2DM-1",
            InheritedMetadata { release_date: Some("2022-09-15".into()), ..Default::default() },
        );

        let resolved = table.resolve("hum0014.v3.T2DM-1.v1");
        assert_eq!(resolved.release_date.as_deref(), Some("2022-09-15"));
    }

    #[test]
    fn explicit_override_supersedes_prefix_match() {
        let mut table = MetadataTable::new();
        table.declare("hum0014.v3", InheritedMetadata { release_date: Some("2021-04-01".into()), ..Default::default() });
        table.set_override(
            "hum0014.v3.T2DM-1.v1",
            InheritedMetadata { release_date: Some("2023-01-01".into()), ..Default::default() },
        );

        let resolved = table.resolve("hum0014.v3.T2DM-1.v1");
        assert_eq!(resolved.release_date.as_deref(), Some("2023-01-01"));
    }

    #[test]
    fn no_ancestor_declared_returns_default() {
        let table = MetadataTable::new();
        assert_eq!(table.resolve("hum0099.v1.X-1.v1"), InheritedMetadata::default());
    }
}
