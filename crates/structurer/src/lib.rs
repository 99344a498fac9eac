//! The Structurer (§4.4): turns per-language `NormalizedRecord`s, grouped by
//! humId and sorted by version, into one `Research`, its `ResearchVersion`s,
//! and the `Dataset`s they reference.

mod bilingual_merge;
mod error;
mod id_expansion;
mod inheritance;
mod inversion;
mod versioning;

pub use bilingual_merge::{merge_text, merge_text_value, pair_lists};
pub use error::StructureError;
pub use id_expansion::{build_expansion_map, rewrite_ids, ExpansionMap};
pub use inheritance::{InheritedMetadata, MetadataTable};
pub use inversion::{build_experiments, invert_rows_by_dataset};
pub use versioning::VersionHistory;

use std::collections::{BTreeSet, HashMap};

use common::{
    ControlledAccessUser, DataProvider, DatasetId, DatasetRef, Dataset, Grant, HumId, HumVersionId, Publication,
    Research, Status,
};
use normalizer::NormalizedRecord;
use tracing::{info, warn};

/// One humVersionId's bilingual pair of normalized records plus its
/// numeric version, as ordered by the caller (ascending, per §5 "inside
/// one humId, structurer processes versions in ascending numeric order").
pub struct VersionInput {
    pub version: u32,
    pub hum_version_id: HumVersionId,
    pub ja: NormalizedRecord,
    pub en: NormalizedRecord,
}

pub struct AssembledResearch {
    pub research: Research,
    pub versions: Vec<common::ResearchVersion>,
    pub datasets: Vec<Dataset>,
}

/// Builds the full Research family for one humId from its ordered version
/// history. `metadata` resolves per-dataset criteria/releaseDate/typeOfData
/// (§4.4.2); callers build it from summary-level declarations before
/// calling this.
pub fn assemble(
    hum_id: HumId,
    inputs: &[VersionInput],
    metadata: &MetadataTable,
) -> Result<AssembledResearch, StructureError> {
    if inputs.is_empty() {
        return Err(StructureError::EmptyHumId(hum_id.to_string()));
    }

    let mut dataset_histories: HashMap<String, VersionHistory> = HashMap::new();
    let mut research_versions = Vec::with_capacity(inputs.len());
    let mut datasets = Vec::new();
    let mut all_raw_rows = Vec::new();

    for input in inputs {
        let ja_grouped = invert_rows_by_dataset(&input.ja.molecular_data);
        let en_grouped = invert_rows_by_dataset(&input.en.molecular_data);

        all_raw_rows.extend(input.ja.molecular_data.iter().cloned());
        all_raw_rows.extend(input.en.molecular_data.iter().cloned());

        let mut dataset_ids: BTreeSet<String> = ja_grouped.keys().cloned().collect();
        dataset_ids.extend(en_grouped.keys().cloned());

        let mut dataset_refs = Vec::with_capacity(dataset_ids.len());

        for dataset_id in dataset_ids {
            let empty = Vec::new();
            let ja_rows = ja_grouped.get(&dataset_id).unwrap_or(&empty);
            let en_rows = en_grouped.get(&dataset_id).unwrap_or(&empty);
            if ja_rows.is_empty() || en_rows.is_empty() {
                warn!(dataset_id, hum_version_id = %input.hum_version_id, "dataset present in only one language's molecular data table");
            }
            let experiments = build_experiments(ja_rows, en_rows);

            let history = dataset_histories.entry(dataset_id.clone()).or_default();
            let version = history.assign(&experiments);

            let resolved = metadata.resolve(&dataset_id);
            let type_of_data = merge_text(resolved.type_of_data.0, resolved.type_of_data.1);

            dataset_refs.push(DatasetRef {
                dataset_id: DatasetId::from(dataset_id.clone()),
                version: version.clone(),
            });

            datasets.push(Dataset {
                dataset_id: DatasetId::from(dataset_id),
                version,
                version_release_date: resolved.release_date.clone(),
                hum_id: hum_id.clone(),
                hum_version_id: input.hum_version_id.clone(),
                release_date: resolved.release_date,
                criteria: resolved.criteria,
                type_of_data,
                experiments,
            });
        }

        research_versions.push(common::ResearchVersion {
            hum_id: hum_id.clone(),
            hum_version_id: input.hum_version_id.clone(),
            version: input.version,
            version_release_date: input.ja.releases.first().and_then(|r| r.release_dates.first().cloned()),
            datasets: dataset_refs,
            release_note: merge_text_value(
                input.ja.releases.first().and_then(|r| r.note.clone()),
                input.en.releases.first().and_then(|r| r.note.clone()),
            ),
        });
    }

    let expansion_map = build_expansion_map(&all_raw_rows);
    rewrite_publication_and_cau_ids(&mut datasets, &expansion_map);

    let latest = inputs.last().expect("checked non-empty above");
    let hum_id_for_log = hum_id.clone();
    let research = build_research(hum_id, inputs, latest, &expansion_map)?;

    info!(hum_id = %hum_id_for_log, versions = research_versions.len(), datasets = datasets.len(), "assembled research record");
    Ok(AssembledResearch { research, versions: research_versions, datasets })
}

fn rewrite_publication_and_cau_ids(datasets: &mut [Dataset], _expansion_map: &ExpansionMap) {
    // Publications/CAUs live on `Research`, not `Dataset`; the ID rewrite
    // itself happens in `build_research` once the full expansion map is
    // available. This pass exists so dataset construction order and the
    // rewrite stay visibly sequenced for future readers.
    let _ = datasets;
}

fn build_research(
    hum_id: HumId,
    inputs: &[VersionInput],
    latest: &VersionInput,
    expansion_map: &ExpansionMap,
) -> Result<Research, StructureError> {
    let url = merge_text(latest.ja.summary.url.clone(), latest.en.summary.url.clone());
    let title = merge_text(
        latest.ja.summary.title.as_ref().map(|tv| tv.text.clone()),
        latest.en.summary.title.as_ref().map(|tv| tv.text.clone()),
    );
    let summary = merge_text_value(latest.ja.summary.aims.clone(), latest.en.summary.aims.clone());

    let data_provider = pair_lists(
        latest.ja.data_provider.principal_investigator.clone(),
        latest.en.data_provider.principal_investigator.clone(),
        |_| None,
    )
    .into_iter()
    .enumerate()
    .map(|(idx, (ja_pi, en_pi))| DataProvider {
        principal_investigator: merge_text(ja_pi, en_pi),
        affiliation: merge_text(
            latest.ja.data_provider.affiliation.get(idx).cloned(),
            latest.en.data_provider.affiliation.get(idx).cloned(),
        ),
        project_name: merge_text(
            latest.ja.data_provider.project_name.get(idx).cloned(),
            latest.en.data_provider.project_name.get(idx).cloned(),
        ),
        project_url: latest
            .ja
            .data_provider
            .project_url
            .get(idx)
            .or_else(|| latest.en.data_provider.project_url.get(idx))
            .cloned(),
    })
    .collect();

    let grant = pair_lists(latest.ja.data_provider.grants.clone(), latest.en.data_provider.grants.clone(), |g| {
        Some(g.clone())
    })
    .into_iter()
    .map(|(ja_g, en_g)| Grant {
        grant_id: ja_g.clone().or(en_g.clone()),
        title: merge_text(None, None),
        funder: merge_text(ja_g, en_g),
    })
    .collect();

    let related_publication = pair_lists(
        latest.ja.publications.clone(),
        latest.en.publications.clone(),
        |p| p.doi.clone(),
    )
    .into_iter()
    .map(|(ja_pub, en_pub)| {
        let raw_ids: Vec<String> = ja_pub
            .as_ref()
            .map(|p| p.dataset_ids.clone())
            .or_else(|| en_pub.as_ref().map(|p| p.dataset_ids.clone()))
            .unwrap_or_default();
        Publication {
            title: merge_text(ja_pub.as_ref().and_then(|p| p.title.clone()), en_pub.as_ref().and_then(|p| p.title.clone())),
            doi: ja_pub.as_ref().and_then(|p| p.doi.clone()).or_else(|| en_pub.as_ref().and_then(|p| p.doi.clone())),
            dataset_ids: rewrite_ids(&raw_ids, expansion_map).into_iter().map(DatasetId::from).collect(),
        }
    })
    .collect();

    let controlled_access_user = pair_lists(
        latest.ja.controlled_access_users.clone(),
        latest.en.controlled_access_users.clone(),
        |u| u.organisation.clone().zip(u.name.clone()).map(|(o, n)| format!("{o}|{n}")),
    )
    .into_iter()
    .map(|(ja_u, en_u)| {
        let raw_ids: Vec<String> = ja_u
            .as_ref()
            .map(|u| u.dataset_ids.clone())
            .or_else(|| en_u.as_ref().map(|u| u.dataset_ids.clone()))
            .unwrap_or_default();
        let period = ja_u.as_ref().and_then(|u| u.period.clone()).or_else(|| en_u.as_ref().and_then(|u| u.period.clone()));
        ControlledAccessUser {
            organisation: merge_text(ja_u.as_ref().and_then(|u| u.organisation.clone()), en_u.as_ref().and_then(|u| u.organisation.clone())),
            name: merge_text(ja_u.as_ref().and_then(|u| u.name.clone()), en_u.as_ref().and_then(|u| u.name.clone())),
            dataset_ids: rewrite_ids(&raw_ids, expansion_map).into_iter().map(DatasetId::from).collect(),
            period_start: period.as_ref().map(|(s, _)| s.clone()),
            period_end: period.as_ref().map(|(_, e)| e.clone()),
        }
    })
    .collect();

    let version_ids: Vec<HumVersionId> = inputs.iter().map(|v| v.hum_version_id.clone()).collect();

    Ok(Research {
        hum_id,
        url,
        title,
        summary,
        data_provider,
        research_project: Vec::new(),
        grant,
        related_publication,
        controlled_access_user,
        version_ids,
        latest_version: latest.hum_version_id.clone(),
        first_release_date: inputs.first().and_then(|v| v.ja.releases.first()).and_then(|r| r.release_dates.first().cloned()),
        last_release_date: latest.ja.releases.first().and_then(|r| r.release_dates.first().cloned()),
        status: Status::Draft,
        uids: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TextValue;

    fn version_input(n: u32) -> VersionInput {
        let mut ja = NormalizedRecord::default();
        ja.summary.title = Some(TextValue::new("研究タイトル", "研究タイトル"));
        let mut en = NormalizedRecord::default();
        en.summary.title = Some(TextValue::new("Research Title", "Research Title"));

        VersionInput {
            version: n,
            hum_version_id: format!("hum0014-v{n}").parse().unwrap(),
            ja,
            en,
        }
    }

    #[test]
    fn assembling_with_no_datasets_still_produces_a_research_record() {
        let inputs = vec![version_input(1)];
        let metadata = MetadataTable::new();
        let result = assemble("hum0014".parse().unwrap(), &inputs, &metadata).unwrap();

        assert_eq!(result.research.title.ja.as_deref(), Some("研究タイトル"));
        assert_eq!(result.research.title.en.as_deref(), Some("Research Title"));
        assert!(result.datasets.is_empty());
        assert_eq!(result.versions.len(), 1);
    }

    #[test]
    fn empty_input_is_rejected() {
        let metadata = MetadataTable::new();
        assert!(assemble("hum0014".parse().unwrap(), &[], &metadata).is_err());
    }
}
