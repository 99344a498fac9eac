//! Facet-Normalizer and ICD10-Normalizer (§4.5): two idempotent
//! post-processing passes over structured `Dataset`s, run after the
//! Structurer and before indexing.

mod error;
mod icd10;
mod mapping;
mod searchable;

pub use error::{FacetError, ValidationError};
pub use icd10::{check, normalize_diseases, Icd10LabelTable, Icd10SplitTable, SplitEntry};
pub use mapping::{FacetMappingTable, MappingRow, PENDING};
pub use searchable::{normalize_searchable, FACET_FIELDS};

use std::collections::BTreeMap;

use common::Dataset;

/// Runs the Facet-Normalizer over every experiment's `searchable` block in
/// `dataset`, mutating `tables` with any newly-discovered unmapped values.
/// Returns true if any value was rewritten.
pub fn normalize_facets(dataset: &mut Dataset, tables: &mut BTreeMap<String, FacetMappingTable>) -> bool {
    let mut changed = false;
    for experiment in &mut dataset.experiments {
        if normalize_searchable(&mut experiment.searchable, tables) {
            changed = true;
        }
    }
    changed
}

/// Runs the ICD10-Normalizer over every experiment's `searchable.diseases`
/// list in `dataset`.
pub fn normalize_icd10(dataset: &mut Dataset, labels: &Icd10LabelTable, splits: &Icd10SplitTable) {
    let hum_id = dataset.hum_id.to_string();
    for experiment in &mut dataset.experiments {
        experiment.searchable.diseases = normalize_diseases(&hum_id, &experiment.searchable.diseases, labels, splits);
    }
}

/// `--check` mode (§4.5): validates every disease in `dataset` and
/// collects all violations rather than stopping at the first one.
pub fn check_icd10(dataset: &Dataset, labels: &Icd10LabelTable) -> Vec<ValidationError> {
    let hum_id = dataset.hum_id.to_string();
    let dataset_id = dataset.dataset_id.to_string();
    dataset
        .experiments
        .iter()
        .flat_map(|experiment| check(&hum_id, &dataset_id, &experiment.searchable.diseases, labels))
        .collect()
}
