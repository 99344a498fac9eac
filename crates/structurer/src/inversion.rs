//! Inversion of molecular data to datasets (§4.4.1): each row carries the
//! set of dataset IDs it belongs to; this groups rows by dataset ID and
//! turns each dataset's row list into an ordered `Experiment` list.

use std::collections::BTreeMap;

use common::{
    BilingualTextValue, Disease, Experiment, ExperimentBase, FieldValue, Lang, Platform, PolicyRef, Searchable,
    VariantCounts,
};
use normalizer::NormalizedMolDataRow;
use parser::RawFieldValue;

use crate::bilingual_merge::merge_text_value;

/// `datasetId -> rows that belong to it`, in encounter order.
pub fn invert_rows_by_dataset<'a>(rows: &'a [NormalizedMolDataRow]) -> BTreeMap<String, Vec<&'a NormalizedMolDataRow>> {
    let mut grouped: BTreeMap<String, Vec<&NormalizedMolDataRow>> = BTreeMap::new();
    for row in rows {
        for dataset_id in &row.dataset_ids {
            grouped.entry(dataset_id.clone()).or_default().push(row);
        }
    }
    grouped
}

fn single_lang_field_to_bilingual(value: &RawFieldValue, lang: common::Lang) -> FieldValue {
    let tv = match value {
        RawFieldValue::Single(tv) => tv.clone(),
        RawFieldValue::Multi(values) => match values.first() {
            Some(tv) => tv.clone(),
            None => return FieldValue::Single(BilingualTextValue::default()),
        },
    };
    match lang {
        common::Lang::Ja => FieldValue::Single(merge_text_value(Some(tv), None)),
        common::Lang::En => FieldValue::Single(merge_text_value(None, Some(tv))),
    }
}

/// Builds one bilingual `Experiment` per ja/en row pair belonging to a
/// dataset. Rows are paired by `id` (falling back to position) the same way
/// other per-language lists are paired in §4.4.3.
pub fn build_experiments(
    ja_rows: &[&NormalizedMolDataRow],
    en_rows: &[&NormalizedMolDataRow],
) -> Vec<Experiment> {
    let mut experiments = Vec::new();
    let max_len = ja_rows.len().max(en_rows.len());

    for idx in 0..max_len {
        let ja_row = ja_rows.get(idx).copied();
        let en_row = find_matching_row(ja_row, en_rows, idx);

        let header = merge_text_value(
            ja_row.and_then(|r| r.header.clone()),
            en_row.and_then(|r| r.header.clone()),
        );

        let mut data = BTreeMap::new();
        if let Some(row) = ja_row {
            for (key, value) in &row.data {
                data.insert(key.clone(), single_lang_field_to_bilingual(value, common::Lang::Ja));
            }
        }
        if let Some(row) = en_row {
            for (key, value) in &row.data {
                let en_value = single_lang_field_to_bilingual(value, common::Lang::En);
                data.entry(key.clone())
                    .and_modify(|existing| *existing = merge_field(existing, &en_value))
                    .or_insert(en_value);
            }
        }

        let footers = merge_footers(ja_row, en_row);
        let searchable = project_searchable(&data);

        experiments.push(Experiment {
            base: ExperimentBase { header, data, footers },
            searchable,
        });
    }

    experiments
}

/// Every text the given field key carries, each cell split on comma/slash
/// the same way multi-valued raw fields are elsewhere (§4.3.3, §4.3.5).
/// English is preferred, falling back to Japanese for an en-only pipeline
/// run (§4.7.4's pick-lang rule).
fn field_texts(data: &BTreeMap<String, FieldValue>, key: &str) -> Vec<String> {
    let Some(value) = data.get(key) else {
        return Vec::new();
    };
    let cells: &[BilingualTextValue] = match value {
        FieldValue::Single(v) => std::slice::from_ref(v),
        FieldValue::Multi(vs) => vs.as_slice(),
    };
    cells
        .iter()
        .filter_map(|bv| bv.pick_lang(Lang::En).map(|tv| tv.text.as_str()))
        .flat_map(|text| text.split(|c| c == ',' || c == '/'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The first (and usually only) value a scalar field key carries.
fn field_scalar(data: &BTreeMap<String, FieldValue>, key: &str) -> Option<String> {
    field_texts(data, key).into_iter().next()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "はい" | "あり" => Some(true),
        "false" | "no" | "n" | "いいえ" | "なし" => Some(false),
        _ => None,
    }
}

/// Projects a merged Experiment's `data` map onto the fixed `Searchable`
/// shape (§3), reading each facet/structured field from its own canonical
/// key. Facet-field canonicalization (`facet::normalize_searchable`) and
/// ICD10/policy attachment both run later, against the values built here.
fn project_searchable(data: &BTreeMap<String, FieldValue>) -> Searchable {
    let mut searchable = Searchable {
        assay_type: field_texts(data, "assayType"),
        tissues: field_texts(data, "tissues"),
        population: field_texts(data, "population"),
        file_types: field_texts(data, "fileTypes"),
        health_status: field_texts(data, "healthStatus"),
        sex: field_texts(data, "sex"),
        age_group: field_texts(data, "ageGroup"),
        library_kits: field_texts(data, "libraryKits"),
        read_type: field_texts(data, "readType"),
        processed_data_types: field_texts(data, "processedDataTypes"),
        cell_line: field_texts(data, "cellLine"),
        ..Searchable::default()
    };

    let vendor = field_scalar(data, "platformVendor");
    let model = field_scalar(data, "platformModel");
    if vendor.is_some() || model.is_some() {
        searchable.platform = vec![Platform { vendor, model }];
    }

    searchable.subject_count = field_texts(data, "subjectCount")
        .iter()
        .filter_map(|entry| {
            let (kind, count) = entry.split_once(':')?;
            Some((kind.trim().to_string(), count.trim().parse::<u64>().ok()?))
        })
        .collect();

    searchable.read_length = field_scalar(data, "readLength");
    searchable.reference_genome = field_scalar(data, "referenceGenome");
    searchable.is_tumor = field_scalar(data, "isTumor").as_deref().and_then(parse_bool);
    searchable.has_phenotype_data = field_scalar(data, "hasPhenotypeData").as_deref().and_then(parse_bool);

    searchable.diseases =
        field_texts(data, "diseases").into_iter().map(|label| Disease { label, icd10: None }).collect();
    searchable.policies = field_texts(data, "policies").into_iter().map(|id| PolicyRef { id }).collect();

    let variant_counts = VariantCounts {
        snv: field_scalar(data, "variantCountsSnv").and_then(|v| v.parse().ok()),
        indel: field_scalar(data, "variantCountsIndel").and_then(|v| v.parse().ok()),
        cnv: field_scalar(data, "variantCountsCnv").and_then(|v| v.parse().ok()),
        sv: field_scalar(data, "variantCountsSv").and_then(|v| v.parse().ok()),
        total: field_scalar(data, "variantCountsTotal").and_then(|v| v.parse().ok()),
    };
    searchable.variant_counts = (variant_counts != VariantCounts::default()).then_some(variant_counts);

    searchable.sequencing_depth = field_scalar(data, "sequencingDepth");
    searchable.target_coverage = field_scalar(data, "targetCoverage");
    searchable.data_volume_gb = field_scalar(data, "dataVolumeGb").and_then(|v| v.parse().ok());

    searchable
}

fn find_matching_row<'a>(
    ja_row: Option<&'a NormalizedMolDataRow>,
    en_rows: &[&'a NormalizedMolDataRow],
    fallback_idx: usize,
) -> Option<&'a NormalizedMolDataRow> {
    if let Some(ja) = ja_row {
        if let Some(id) = &ja.id {
            if let Some(found) = en_rows.iter().find(|r| r.id.as_deref() == Some(id.as_str())) {
                return Some(*found);
            }
        }
    }
    en_rows.get(fallback_idx).copied()
}

fn merge_field(ja: &FieldValue, en: &FieldValue) -> FieldValue {
    let ja_tv = ja.first().cloned();
    let en_tv = en.first().cloned();
    FieldValue::Single(BilingualTextValue {
        ja: ja_tv.and_then(|bv| bv.ja),
        en: en_tv.and_then(|bv| bv.en),
    })
}

fn merge_footers(
    ja_row: Option<&NormalizedMolDataRow>,
    en_row: Option<&NormalizedMolDataRow>,
) -> Vec<BilingualTextValue> {
    let ja_footers = ja_row.map(|r| r.footers.clone()).unwrap_or_default();
    let en_footers = en_row.map(|r| r.footers.clone()).unwrap_or_default();
    let len = ja_footers.len().max(en_footers.len());
    (0..len)
        .map(|i| merge_text_value(ja_footers.get(i).cloned(), en_footers.get(i).cloned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TextValue;

    fn row(id: &str, dataset_ids: Vec<&str>) -> NormalizedMolDataRow {
        NormalizedMolDataRow {
            id: Some(id.to_string()),
            header: Some(TextValue::new(id, id)),
            data: BTreeMap::new(),
            footers: Vec::new(),
            dataset_ids: dataset_ids.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn rows_group_by_every_dataset_id_they_carry() {
        let rows = vec![row("r1", vec!["JGAD000001"]), row("r2", vec!["JGAD000001", "JGAD000002"])];
        let grouped = invert_rows_by_dataset(&rows);

        assert_eq!(grouped.get("JGAD000001").unwrap().len(), 2);
        assert_eq!(grouped.get("JGAD000002").unwrap().len(), 1);
    }

    #[test]
    fn experiments_pair_rows_by_id() {
        let ja_row = row("r1", vec!["JGAD000001"]);
        let en_row = row("r1", vec!["JGAD000001"]);
        let experiments = build_experiments(&[&ja_row], &[&en_row]);

        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].base.header.ja.as_ref().unwrap().text, "r1");
        assert_eq!(experiments[0].base.header.en.as_ref().unwrap().text, "r1");
    }

    #[test]
    fn experiment_data_is_projected_into_searchable() {
        let mut en_row = row("r1", vec!["JGAD000001"]);
        en_row.data = BTreeMap::from([
            ("assayType".to_string(), RawFieldValue::Single(TextValue::new("WGS, WES", "WGS, WES"))),
            ("platformVendor".to_string(), RawFieldValue::Single(TextValue::new("Illumina", "Illumina"))),
            ("platformModel".to_string(), RawFieldValue::Single(TextValue::new("NovaSeq 6000", "NovaSeq 6000"))),
            ("subjectCount".to_string(), RawFieldValue::Single(TextValue::new("case:10,control:5", ""))),
            ("isTumor".to_string(), RawFieldValue::Single(TextValue::new("yes", "yes"))),
            ("diseases".to_string(), RawFieldValue::Single(TextValue::new("Type 2 diabetes mellitus", ""))),
            ("policies".to_string(), RawFieldValue::Single(TextValue::new("POL-1", "POL-1"))),
            ("variantCountsSnv".to_string(), RawFieldValue::Single(TextValue::new("42", "42"))),
            ("dataVolumeGb".to_string(), RawFieldValue::Single(TextValue::new("12.5", "12.5"))),
        ]);

        let experiments = build_experiments(&[], &[&en_row]);
        let searchable = &experiments[0].searchable;

        assert_eq!(searchable.assay_type, vec!["WGS".to_string(), "WES".to_string()]);
        assert_eq!(
            searchable.platform,
            vec![Platform { vendor: Some("Illumina".to_string()), model: Some("NovaSeq 6000".to_string()) }]
        );
        assert_eq!(searchable.subject_count.get("case"), Some(&10));
        assert_eq!(searchable.subject_count.get("control"), Some(&5));
        assert_eq!(searchable.is_tumor, Some(true));
        assert_eq!(searchable.diseases, vec![Disease { label: "Type 2 diabetes mellitus".to_string(), icd10: None }]);
        assert_eq!(searchable.policies, vec![PolicyRef { id: "POL-1".to_string() }]);
        assert_eq!(searchable.variant_counts.as_ref().unwrap().snv, Some(42));
        assert_eq!(searchable.data_volume_gb, Some(12.5));
    }

    #[test]
    fn empty_data_projects_to_default_searchable() {
        let en_row = row("r1", vec!["JGAD000001"]);
        let experiments = build_experiments(&[], &[&en_row]);
        assert_eq!(experiments[0].searchable, Searchable::default());
    }
}
