//! Dataset-ID expansion map (§4.4.5): maps a raw ID token to the set of
//! dataset IDs that actually carry it in their experiments, so publication
//! and controlled-access-user dataset IDs can be rewritten from raw tokens
//! to real owners.

use std::collections::{BTreeMap, BTreeSet};

use normalizer::NormalizedMolDataRow;

pub type ExpansionMap = BTreeMap<String, BTreeSet<String>>;

/// For every row, every ID it carries "owns" every other ID on that same
/// row — since all of them cause the row to be inverted into that many
/// datasets' experiment lists (§4.4.1).
pub fn build_expansion_map(rows: &[NormalizedMolDataRow]) -> ExpansionMap {
    let mut map = ExpansionMap::new();
    for row in rows {
        for raw_id in &row.dataset_ids {
            map.entry(raw_id.clone()).or_default().extend(row.dataset_ids.iter().cloned());
        }
    }
    map
}

/// Rewrites a list of raw IDs into their owning dataset IDs. An ID with no
/// entry in the map (never seen in any experiment) passes through
/// unchanged.
pub fn rewrite_ids(raw_ids: &[String], map: &ExpansionMap) -> Vec<String> {
    let mut out = BTreeSet::new();
    for raw_id in raw_ids {
        match map.get(raw_id) {
            Some(owners) => out.extend(owners.iter().cloned()),
            None => {
                out.insert(raw_id.clone());
            }
        }
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(dataset_ids: Vec<&str>) -> NormalizedMolDataRow {
        NormalizedMolDataRow {
            id: None,
            header: None,
            data: BTreeMap::new(),
            footers: Vec::new(),
            dataset_ids: dataset_ids.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn ids_sharing_a_row_own_each_other() {
        let rows = vec![row(vec!["JGAD000001", "JGAD000002"])];
        let map = build_expansion_map(&rows);
        assert_eq!(
            map.get("JGAD000001").unwrap(),
            &["JGAD000001".to_string(), "JGAD000002".to_string()].into_iter().collect()
        );
    }

    #[test]
    fn unseen_id_passes_through_unchanged() {
        let map = ExpansionMap::new();
        assert_eq!(rewrite_ids(&["JGAD999999".to_string()], &map), vec!["JGAD999999".to_string()]);
    }

    #[test]
    fn seen_id_rewrites_to_its_owners() {
        let rows = vec![row(vec!["JGAD000001", "JGAD000002"])];
        let map = build_expansion_map(&rows);
        assert_eq!(
            rewrite_ids(&["JGAD000001".to_string()], &map),
            vec!["JGAD000001".to_string(), "JGAD000002".to_string()]
        );
    }
}
