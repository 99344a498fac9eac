//! The "controlled-access row special cases" table (§4.2): certain rows are
//! keyed by `(humId, cell count, first cell text)` and replaced wholesale
//! with hand-authored cell data rather than parsed from the table, because
//! their markup is too irregular to parse reliably.
//!
//! The mapping file on disk is a flat JSON array of [`ControlledAccessRowEntry`]
//! (HashMaps can't carry struct keys through `serde_json`), which
//! [`ControlledAccessRowFixes::from_entries`] turns into the lookup table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlledAccessRowKey {
    pub hum_id: String,
    pub cell_count: usize,
    pub first_cell: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlledAccessRowEntry {
    pub hum_id: String,
    pub cell_count: usize,
    pub first_cell: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ControlledAccessRowFixes {
    entries: HashMap<ControlledAccessRowKey, Vec<String>>,
}

impl ControlledAccessRowFixes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ControlledAccessRowEntry>) -> Self {
        let mut fixes = Self::new();
        for entry in entries {
            fixes.insert(
                ControlledAccessRowKey {
                    hum_id: entry.hum_id,
                    cell_count: entry.cell_count,
                    first_cell: entry.first_cell,
                },
                entry.cells,
            );
        }
        fixes
    }

    pub fn insert(&mut self, key: ControlledAccessRowKey, cells: Vec<String>) {
        self.entries.insert(key, cells);
    }

    /// Returns the hand-authored replacement cells for a row, if this exact
    /// `(humId, cell count, first cell)` combination has one on file.
    pub fn lookup(&self, hum_id: &str, cell_count: usize, first_cell: &str) -> Option<&[String]> {
        let key = ControlledAccessRowKey {
            hum_id: hum_id.to_string(),
            cell_count,
            first_cell: first_cell.to_string(),
        };
        self.entries.get(&key).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_key_match_is_required() {
        let mut fixes = ControlledAccessRowFixes::new();
        fixes.insert(
            ControlledAccessRowKey {
                hum_id: "hum0014".into(),
                cell_count: 3,
                first_cell: "Type II".into(),
            },
            vec!["Type II".into(), "fixed-a".into(), "fixed-b".into()],
        );

        assert!(fixes.lookup("hum0014", 3, "Type II").is_some());
        assert!(fixes.lookup("hum0014", 4, "Type II").is_none());
        assert!(fixes.lookup("hum0015", 3, "Type II").is_none());
    }

    #[test]
    fn builds_from_flat_entry_list() {
        let fixes = ControlledAccessRowFixes::from_entries(vec![ControlledAccessRowEntry {
            hum_id: "hum0014".into(),
            cell_count: 2,
            first_cell: "T2DM-1".into(),
            cells: vec!["T2DM-1".into(), "fixed".into()],
        }]);

        assert_eq!(fixes.lookup("hum0014", 2, "T2DM-1"), Some(["T2DM-1".to_string(), "fixed".to_string()].as_slice()));
    }
}
