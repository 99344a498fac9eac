//! Facet-Normalizer (§4.5): one TSV mapping table per named facet field,
//! `raw value -> canonical value`. `__PENDING__` means "use as-is"; values
//! not yet present in the table are recorded so a curator can add them.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FacetError;

pub const PENDING: &str = "__PENDING__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub raw: String,
    pub canonical: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct FacetMappingTable {
    rows: BTreeMap<String, MappingRow>,
    /// Values looked up with no matching row, collected for curation.
    unmapped: Vec<String>,
}

impl FacetMappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, FacetError> {
        let mut csv_reader = csv::ReaderBuilder::new().delimiter(b'\t').has_headers(false).from_reader(reader);
        let mut rows = BTreeMap::new();
        for record in csv_reader.deserialize::<MappingRow>() {
            let row: MappingRow = record.map_err(|source| FacetError::MappingRead { path: "<reader>".into(), source })?;
            rows.insert(row.raw.clone(), row);
        }
        Ok(Self { rows, unmapped: Vec::new() })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FacetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Writes the table back to `path` via temp-file + rename (§5 "stages
    /// write atomically"), but only when `dirty()` reports a change.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FacetError> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tsv.tmp");
        {
            let file = std::fs::File::create(&tmp_path)?;
            let mut writer = csv::WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(file);
            for row in self.rows.values() {
                writer.serialize(row).map_err(|source| FacetError::MappingWrite { path: path.display().to_string(), source })?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Resolves `raw` to its canonical value. `__PENDING__` and unmapped
    /// values are both returned unchanged; unmapped ones are additionally
    /// recorded (and a placeholder row inserted) for later curation.
    pub fn normalize(&mut self, raw: &str) -> String {
        if let Some(row) = self.rows.get(raw) {
            if row.canonical == PENDING {
                return raw.to_string();
            }
            return row.canonical.clone();
        }

        warn!(raw, "unmapped facet value recorded as pending curation");
        self.unmapped.push(raw.to_string());
        self.rows.insert(
            raw.to_string(),
            MappingRow { raw: raw.to_string(), canonical: PENDING.to_string(), notes: String::new() },
        );
        raw.to_string()
    }

    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }

    /// True once `normalize` has recorded at least one new row, meaning
    /// `save` would produce a different file than what was loaded.
    pub fn dirty(&self) -> bool {
        !self.unmapped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mapping_is_applied() {
        let mut table = FacetMappingTable::from_reader("wgs\tWhole Genome Sequencing\t\n".as_bytes()).unwrap();
        assert_eq!(table.normalize("wgs"), "Whole Genome Sequencing");
        assert!(!table.dirty());
    }

    #[test]
    fn pending_row_passes_through_unchanged() {
        let mut table = FacetMappingTable::from_reader("foo\t__PENDING__\tneeds review\n".as_bytes()).unwrap();
        assert_eq!(table.normalize("foo"), "foo");
    }

    #[test]
    fn unmapped_value_is_recorded_and_returned_as_is() {
        let mut table = FacetMappingTable::new();
        assert_eq!(table.normalize("novel-assay"), "novel-assay");
        assert_eq!(table.unmapped(), &["novel-assay".to_string()]);
        assert!(table.dirty());
    }

    #[test]
    fn repeated_unmapped_lookup_only_applies_once() {
        let mut table = FacetMappingTable::new();
        table.normalize("novel-assay");
        assert_eq!(table.normalize("novel-assay"), "novel-assay");
        assert_eq!(table.unmapped().len(), 2);
    }
}
