//! Applies a [`FacetMappingTable`] to every named facet field of one
//! `Searchable` block (§4.5). Each field gets its own table, keyed by the
//! field name used in `facet-mappings/{fieldName}.tsv`.

use std::collections::BTreeMap;

use common::Searchable;

use crate::mapping::FacetMappingTable;

/// The facet fields normalized against an editable mapping table. Fields
/// not listed here (e.g. `subject_count`, `variant_counts`) are numeric or
/// structured and have no raw/canonical string form to map.
pub const FACET_FIELDS: &[&str] = &[
    "assayType",
    "tissues",
    "population",
    "fileTypes",
    "healthStatus",
    "sex",
    "ageGroup",
    "libraryKits",
    "readType",
    "processedDataTypes",
    "cellLine",
];

fn field_mut<'a>(searchable: &'a mut Searchable, field: &str) -> Option<&'a mut Vec<String>> {
    match field {
        "assayType" => Some(&mut searchable.assay_type),
        "tissues" => Some(&mut searchable.tissues),
        "population" => Some(&mut searchable.population),
        "fileTypes" => Some(&mut searchable.file_types),
        "healthStatus" => Some(&mut searchable.health_status),
        "sex" => Some(&mut searchable.sex),
        "ageGroup" => Some(&mut searchable.age_group),
        "libraryKits" => Some(&mut searchable.library_kits),
        "readType" => Some(&mut searchable.read_type),
        "processedDataTypes" => Some(&mut searchable.processed_data_types),
        "cellLine" => Some(&mut searchable.cell_line),
        _ => None,
    }
}

/// Normalizes every facet field of `searchable` in place, using one
/// mapping table per field. Returns true if any value actually changed,
/// so callers only re-write a Dataset (and its mapping tables) when
/// necessary (§4.5 "applies only when a change would occur").
pub fn normalize_searchable(searchable: &mut Searchable, tables: &mut BTreeMap<String, FacetMappingTable>) -> bool {
    let mut changed = false;

    for &field in FACET_FIELDS {
        let Some(values) = field_mut(searchable, field) else { continue };
        let table = tables.entry(field.to_string()).or_default();

        for value in values.iter_mut() {
            let normalized = table.normalize(value);
            if &normalized != value {
                changed = true;
                *value = normalized;
            }
        }
    }

    changed
}
