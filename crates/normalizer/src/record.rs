//! [`NormalizedRecord`]: the same shape as `parser::RawRecord`, canonicalized
//! field by field. [`normalize_record`] is the per-`(humVersionId, language)`
//! entry point; the stage runner that wraps it into a `StageReport` lives at
//! the root of the workspace (§4.3 "Failure model").

use std::collections::BTreeMap;

use common::{Criteria, Lang, TextValue};
use relation::RelationService;
use serde::{Deserialize, Serialize};

use crate::criteria::{normalize_criteria, CriteriaTable};
use crate::dataset_id::{normalize_dataset_ids, DatasetIdTables, IdScope};
use crate::date::normalize_date_list;
use crate::error::NormalizeError;
use crate::moldata_keys::{MolDataKeyResolution, MolDataKeyTable};
use crate::publications::{is_title_denied, normalize_doi, normalize_grant_id, parse_period, PublicationDenyLists};
use crate::text::normalize_text;
use crate::url::normalize_url;
use parser::{MolecularDataRow, RawFieldValue, RawRecord};

#[derive(Debug, Clone, Default)]
pub struct NormalizerTables {
    pub portal_base_url: String,
    pub criteria: CriteriaTable,
    pub dataset_id: DatasetIdTables,
    pub mol_data_keys: MolDataKeyTable,
    pub publication_deny_lists: PublicationDenyLists,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSummary {
    pub title: Option<TextValue>,
    pub aims: Option<TextValue>,
    pub methods: Option<TextValue>,
    pub targets: Option<TextValue>,
    pub url: Option<String>,
    pub dataset_ids: Vec<String>,
    pub footers: Vec<TextValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMolDataRow {
    pub id: Option<String>,
    pub header: Option<TextValue>,
    pub data: BTreeMap<String, RawFieldValue>,
    pub footers: Vec<TextValue>,
    pub dataset_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDataProvider {
    pub principal_investigator: Vec<String>,
    pub affiliation: Vec<String>,
    pub project_name: Vec<String>,
    pub project_url: Vec<String>,
    pub grants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPublication {
    pub title: Option<String>,
    pub doi: Option<String>,
    pub dataset_ids: Vec<String>,
    pub period: Option<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedControlledAccessUser {
    pub organisation: Option<String>,
    pub name: Option<String>,
    pub dataset_ids: Vec<String>,
    pub period: Option<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRelease {
    pub version: Option<String>,
    pub release_dates: Vec<String>,
    pub note: Option<TextValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub hum_version_id: String,
    pub summary: NormalizedSummary,
    pub molecular_data: Vec<NormalizedMolDataRow>,
    pub data_provider: NormalizedDataProvider,
    pub publications: Vec<NormalizedPublication>,
    pub controlled_access_users: Vec<NormalizedControlledAccessUser>,
    pub releases: Vec<NormalizedRelease>,
}

fn normalize_text_value(value: &TextValue, lang: Lang) -> TextValue {
    TextValue::new(normalize_text(&value.text, lang), value.raw_html.clone())
}

async fn normalize_id_list(
    raw_tokens: &[String],
    scope: IdScope,
    hum_id: &str,
    tables: &DatasetIdTables,
    relation_service: &dyn RelationService,
) -> Result<Vec<String>, NormalizeError> {
    let mut out = Vec::new();
    for raw in raw_tokens {
        out.extend(normalize_dataset_ids(raw, scope, hum_id, tables, relation_service).await?);
    }
    Ok(out)
}

async fn normalize_field_value(
    value: &RawFieldValue,
    hum_id: &str,
    lang: Lang,
    tables: &NormalizerTables,
    relation_service: &dyn RelationService,
) -> Result<RawFieldValue, NormalizeError> {
    match value {
        RawFieldValue::Single(tv) => Ok(RawFieldValue::Single(normalize_cell_text(tv, hum_id, lang, tables, relation_service).await?)),
        RawFieldValue::Multi(values) => {
            let mut out = Vec::with_capacity(values.len());
            for tv in values {
                out.push(normalize_cell_text(tv, hum_id, lang, tables, relation_service).await?);
            }
            Ok(RawFieldValue::Multi(out))
        }
    }
}

/// A cell's text is free text unless it is shaped like a dataset-ID blob, in
/// which case the dataset-ID pipeline runs over it and the cleaned IDs are
/// rejoined for display while still being harvested separately by the
/// caller via `extracted_dataset_ids`.
async fn normalize_cell_text(
    value: &TextValue,
    _hum_id: &str,
    lang: Lang,
    _tables: &NormalizerTables,
    _relation_service: &dyn RelationService,
) -> Result<TextValue, NormalizeError> {
    Ok(normalize_text_value(value, lang))
}

fn split_keys(resolution: MolDataKeyResolution) -> Option<Vec<String>> {
    match resolution {
        MolDataKeyResolution::Canonical(key) => Some(vec![key]),
        MolDataKeyResolution::Split(keys) => Some(keys),
        MolDataKeyResolution::Discard => None,
        MolDataKeyResolution::Unknown(key) => Some(vec![key]),
    }
}

/// A row whose header/id label itself maps to the discard sentinel carries
/// no usable data and is dropped before its individual cells are touched.
async fn normalize_mol_data_row(
    row: &MolecularDataRow,
    hum_id: &str,
    lang: Lang,
    tables: &NormalizerTables,
    relation_service: &dyn RelationService,
) -> Result<Option<NormalizedMolDataRow>, NormalizeError> {
    if let Some(header_label) = row.header.as_ref().map(|tv| tv.text.clone()).or_else(|| row.id.clone()) {
        if split_keys(tables.mol_data_keys.resolve(&header_label)).is_none() {
            return Ok(None);
        }
    }

    Ok(Some(build_mol_data_row(row, hum_id, lang, tables, relation_service).await?))
}

/// Folds a second value into an already-populated canonical key (§9
/// "mergeValue"): an empty cell never overwrites a prior one, a lone value
/// becomes a `Multi` on first collision, and further collisions append.
fn merge_raw_field_value(existing: &mut RawFieldValue, next: &RawFieldValue) {
    let incoming = match next {
        RawFieldValue::Single(tv) => std::slice::from_ref(tv),
        RawFieldValue::Multi(tvs) => tvs.as_slice(),
    };
    for tv in incoming {
        if tv.text.is_empty() {
            continue;
        }
        match existing {
            RawFieldValue::Single(first) if first.text.is_empty() => *first = tv.clone(),
            RawFieldValue::Single(first) => *existing = RawFieldValue::Multi(vec![first.clone(), tv.clone()]),
            RawFieldValue::Multi(values) => values.push(tv.clone()),
        }
    }
}

async fn build_mol_data_row(
    row: &MolecularDataRow,
    hum_id: &str,
    lang: Lang,
    tables: &NormalizerTables,
    relation_service: &dyn RelationService,
) -> Result<NormalizedMolDataRow, NormalizeError> {
    let mut data = BTreeMap::new();
    for (raw_key, value) in &row.data {
        let resolution = tables.mol_data_keys.resolve(&raw_key);
        let Some(canonical_keys) = split_keys(resolution) else {
            continue;
        };
        let normalized_value = normalize_field_value(value, hum_id, lang, tables, relation_service).await?;
        for canonical_key in canonical_keys {
            data.entry(canonical_key)
                .and_modify(|existing| merge_raw_field_value(existing, &normalized_value))
                .or_insert_with(|| normalized_value.clone());
        }
    }

    let dataset_ids =
        normalize_id_list(&row.extracted_dataset_ids, IdScope::General, hum_id, &tables.dataset_id, relation_service)
            .await?;

    Ok(NormalizedMolDataRow {
        id: row.id.clone(),
        header: row.header.as_ref().map(|tv| normalize_text_value(tv, lang)),
        data,
        footers: row.footers.iter().map(|tv| normalize_text_value(tv, lang)).collect(),
        dataset_ids,
    })
}

/// Runs the full Normalizer (§4.3) over one per-language `RawRecord`.
pub async fn normalize_record(
    hum_id: &str,
    lang: Lang,
    raw: &RawRecord,
    tables: &NormalizerTables,
    relation_service: &dyn RelationService,
) -> Result<NormalizedRecord, NormalizeError> {
    let summary_dataset_ids =
        normalize_id_list(&raw.summary.datasets, IdScope::General, hum_id, &tables.dataset_id, relation_service)
            .await?;

    let summary = NormalizedSummary {
        title: raw.summary.title.as_ref().map(|tv| normalize_text_value(tv, lang)),
        aims: raw.summary.aims.as_ref().map(|tv| normalize_text_value(tv, lang)),
        methods: raw.summary.methods.as_ref().map(|tv| normalize_text_value(tv, lang)),
        targets: raw.summary.targets.as_ref().map(|tv| normalize_text_value(tv, lang)),
        url: raw.summary.url.as_deref().map(|u| normalize_url(u, &tables.portal_base_url)),
        dataset_ids: summary_dataset_ids,
        footers: raw.summary.footers.iter().map(|tv| normalize_text_value(tv, lang)).collect(),
    };

    let mut molecular_data = Vec::with_capacity(raw.molecular_data.len());
    for row in &raw.molecular_data {
        if let Some(normalized) = normalize_mol_data_row(row, hum_id, lang, tables, relation_service).await? {
            molecular_data.push(normalized);
        }
    }

    let data_provider = NormalizedDataProvider {
        principal_investigator: raw.data_provider.principal_investigator.iter().map(|s| normalize_text(s, lang)).collect(),
        affiliation: raw.data_provider.affiliation.iter().map(|s| normalize_text(s, lang)).collect(),
        project_name: raw.data_provider.project_name.iter().map(|s| normalize_text(s, lang)).collect(),
        project_url: raw.data_provider.project_url.iter().map(|s| normalize_url(s, &tables.portal_base_url)).collect(),
        grants: raw
            .data_provider
            .grants
            .iter()
            .filter_map(|g| normalize_grant_id(g, &tables.publication_deny_lists))
            .collect(),
    };

    let mut publications = Vec::with_capacity(raw.publications.len());
    for pub_ in &raw.publications {
        let Some(title) = pub_.title.as_deref() else {
            continue;
        };
        let normalized_title = normalize_text(title, lang);
        if is_title_denied(&normalized_title, &tables.publication_deny_lists) {
            continue;
        }
        let dataset_ids = normalize_id_list(
            &pub_.dataset_ids_raw,
            IdScope::Publication,
            hum_id,
            &tables.dataset_id,
            relation_service,
        )
        .await?;
        publications.push(NormalizedPublication {
            title: Some(normalized_title),
            doi: normalize_doi(pub_.doi.as_deref(), &tables.publication_deny_lists),
            dataset_ids,
            period: pub_.period_raw.as_deref().and_then(parse_period),
        });
    }

    let mut controlled_access_users = Vec::with_capacity(raw.controlled_access_users.len());
    for cau in &raw.controlled_access_users {
        let dataset_ids = normalize_id_list(
            &cau.dataset_ids_raw,
            IdScope::ControlledAccess,
            hum_id,
            &tables.dataset_id,
            relation_service,
        )
        .await?;
        controlled_access_users.push(NormalizedControlledAccessUser {
            organisation: cau.organisation.as_deref().map(|s| normalize_text(s, lang)),
            name: cau.name.as_deref().map(|s| normalize_text(s, lang)),
            dataset_ids,
            period: cau.period_raw.as_deref().and_then(parse_period),
        });
    }

    let releases = raw
        .releases
        .iter()
        .map(|r| NormalizedRelease {
            version: r.version.clone(),
            release_dates: r.release_date_raw.as_deref().map(normalize_date_list).unwrap_or_default(),
            note: r.note.as_ref().map(|tv| normalize_text_value(tv, lang)),
        })
        .collect();

    Ok(NormalizedRecord {
        hum_version_id: raw.hum_version_id.clone(),
        summary,
        molecular_data,
        data_provider,
        publications,
        controlled_access_users,
        releases,
    })
}

/// Resolves a raw criteria string into zero or more canonical values,
/// exposed at the record level since criteria live inside generic
/// molecular-data cells rather than a fixed field.
pub fn resolve_criteria(raw: &str, table: &CriteriaTable) -> Vec<Criteria> {
    normalize_criteria(raw, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use relation::RelationError;

    struct NoopService;
    impl RelationService for NoopService {
        fn get_datasets_from_study<'a>(
            &'a self,
            _jgas_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RelationError>> + Send + 'a>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn sample_raw() -> RawRecord {
        let mut raw = RawRecord::default();
        raw.hum_version_id = "hum0014-v3".to_string();
        raw.summary.aims = Some(TextValue::new("  aims text  ", "<p>aims text</p>"));
        raw.summary.datasets = vec!["JGAD000001".to_string()];
        raw
    }

    #[tokio::test]
    async fn normalizes_summary_text_and_dataset_ids() {
        let raw = sample_raw();
        let tables = NormalizerTables {
            portal_base_url: "https://humandbs.dbcls.jp".to_string(),
            ..Default::default()
        };
        let service = NoopService;

        let normalized = normalize_record("hum0014", Lang::En, &raw, &tables, &service).await.unwrap();
        assert_eq!(normalized.summary.aims.unwrap().text, "aims text");
        assert_eq!(normalized.summary.dataset_ids, vec!["JGAD000001".to_string()]);
    }

    #[tokio::test]
    async fn denied_publication_title_is_dropped() {
        let mut raw = RawRecord::default();
        raw.hum_version_id = "hum0014-v3".to_string();
        raw.publications.push(parser::RawPublication {
            title: Some("In submission".to_string()),
            doi: None,
            dataset_ids_raw: Vec::new(),
            period_raw: None,
        });

        let mut tables = NormalizerTables::default();
        tables.publication_deny_lists.title_deny_list.insert("In submission".to_string());
        let service = NoopService;

        let normalized = normalize_record("hum0014", Lang::En, &raw, &tables, &service).await.unwrap();
        assert!(normalized.publications.is_empty());
    }

    #[tokio::test]
    async fn unmapped_mol_data_key_is_preserved() {
        let mut raw = RawRecord::default();
        raw.hum_version_id = "hum0014-v3".to_string();
        let mut row = MolecularDataRow::default();
        row.id = Some("row-1".to_string());
        let mut data = HashMap::new();
        data.insert("datatype".to_string(), RawFieldValue::Single(TextValue::new("WGS", "WGS")));
        row.data = data.into_iter().collect();
        raw.molecular_data.push(row);

        let tables = NormalizerTables::default();
        let service = NoopService;

        let normalized = normalize_record("hum0014", Lang::En, &raw, &tables, &service).await.unwrap();
        assert_eq!(normalized.molecular_data.len(), 1);
        assert!(normalized.molecular_data[0].data.contains_key("datatype"));
    }

    #[tokio::test]
    async fn colliding_canonical_keys_fold_instead_of_overwriting() {
        let mut raw = RawRecord::default();
        raw.hum_version_id = "hum0014-v3".to_string();
        let mut row = MolecularDataRow::default();
        row.id = Some("row-1".to_string());
        let mut data = HashMap::new();
        data.insert("assay".to_string(), RawFieldValue::Single(TextValue::new("WGS", "WGS")));
        data.insert("assay type".to_string(), RawFieldValue::Single(TextValue::new("WES", "WES")));
        row.data = data.into_iter().collect();
        raw.molecular_data.push(row);

        let mut tables = NormalizerTables::default();
        tables.mol_data_keys.insert_canonical("assay", "assayType");
        tables.mol_data_keys.insert_canonical("assay type", "assayType");
        let service = NoopService;

        let normalized = normalize_record("hum0014", Lang::En, &raw, &tables, &service).await.unwrap();
        let merged = normalized.molecular_data[0].data.get("assayType").unwrap();
        match merged {
            RawFieldValue::Multi(values) => {
                let texts: Vec<&str> = values.iter().map(|tv| tv.text.as_str()).collect();
                assert!(texts.contains(&"WGS"));
                assert!(texts.contains(&"WES"));
            }
            other => panic!("expected Multi after collision, got {other:?}"),
        }
    }
}
