//! Research search (§4.7.4): a two-phase query when Dataset-level filters
//! are present, followed by a `ResearchSummary` projection that picks the
//! requested language out of every bilingual field.

use std::collections::{BTreeSet, HashMap};

use common::{Dataset, HumId, Lang, Research, ResearchVersion};
use serde::Serialize;

use crate::dataset_search;
use crate::filters::{has_dataset_level_filters, DatasetFilters};

#[derive(Debug, Clone)]
pub struct ResearchSearchParams {
    pub dataset_filters: DatasetFilters,
    pub query: Option<String>,
    pub status_filter: Option<common::Status>,
    pub release_date_from: Option<String>,
    pub release_date_to: Option<String>,
    pub lang: Lang,
    pub page: usize,
    pub size: usize,
    /// Admin-only escape hatch to widen accessibility to deleted records
    /// (§4.7.2's "or all if the query explicitly requests deleted").
    pub include_deleted: bool,
}

impl Default for ResearchSearchParams {
    fn default() -> Self {
        Self {
            dataset_filters: DatasetFilters::default(),
            query: None,
            status_filter: None,
            release_date_from: None,
            release_date_to: None,
            lang: Lang::En,
            page: 0,
            size: 20,
            include_deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSummary {
    pub hum_id: HumId,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub latest_version: String,
    pub dataset_ids: Vec<String>,
    pub first_release_date: Option<String>,
    pub last_release_date: Option<String>,
}

pub fn project(research: &Research, versions: &[ResearchVersion], lang: Lang) -> ResearchSummary {
    let dataset_ids = versions
        .iter()
        .filter(|v| v.hum_version_id == research.latest_version)
        .flat_map(|v| v.datasets.iter())
        .map(|d| d.dataset_id.to_string())
        .collect();

    ResearchSummary {
        hum_id: research.hum_id.clone(),
        title: research.title.pick_lang(lang).map(str::to_string),
        summary: research.summary.pick_lang(lang).map(|v| v.text.clone()),
        url: research.url.pick_lang(lang).map(str::to_string),
        latest_version: research.latest_version.to_string(),
        dataset_ids,
        first_release_date: research.first_release_date.clone(),
        last_release_date: research.last_release_date.clone(),
    }
}

fn research_matches(research: &Research, params: &ResearchSearchParams) -> bool {
    if let Some(status) = params.status_filter {
        if research.status != status {
            return false;
        }
    }
    if let Some(from) = &params.release_date_from {
        if research.last_release_date.as_deref().map(|d| d < from.as_str()).unwrap_or(true) {
            return false;
        }
    }
    if let Some(to) = &params.release_date_to {
        if research.first_release_date.as_deref().map(|d| d > to.as_str()).unwrap_or(true) {
            return false;
        }
    }
    if let Some(query) = &params.query {
        let needle = query.to_lowercase();
        let title_matches = [research.title.ja.as_deref(), research.title.en.as_deref()]
            .into_iter()
            .flatten()
            .any(|t| t.to_lowercase().contains(&needle));
        if !title_matches {
            return false;
        }
    }
    true
}

/// Phase one of §4.7.4: collect the humId set a Dataset-level filter
/// restricts the result to, returning `None` when there are no Dataset
/// filters at all (so the caller skips straight to phase two).
pub fn dataset_phase_hum_ids(all_datasets: &[Dataset], filters: &DatasetFilters) -> Option<BTreeSet<HumId>> {
    if !has_dataset_level_filters(filters) {
        return None;
    }
    let ids = all_datasets
        .iter()
        .filter(|d| filters.matches(d))
        .map(|d| d.hum_id.clone())
        .collect::<BTreeSet<_>>();
    Some(ids)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSearchResult {
    pub hits: Vec<ResearchSummary>,
    pub total: usize,
}

/// Phase two of §4.7.4: filter, paginate, and multi-get the ResearchVersion/
/// Dataset context needed to project each hit. `accessible` restricts the
/// candidate set per §4.7.2, `dataset_phase_ids` is the phase-one humId
/// restriction (or `None` if there were no Dataset-level filters).
pub fn execute(
    researches: &[Research],
    versions_by_hum_id: &HashMap<HumId, Vec<ResearchVersion>>,
    accessible: &BTreeSet<HumId>,
    dataset_phase_ids: Option<&BTreeSet<HumId>>,
    params: &ResearchSearchParams,
) -> ResearchSearchResult {
    let mut matched: Vec<&Research> = researches
        .iter()
        .filter(|r| accessible.contains(&r.hum_id))
        .filter(|r| dataset_phase_ids.map(|ids| ids.contains(&r.hum_id)).unwrap_or(true))
        .filter(|r| research_matches(r, params))
        .collect();

    matched.sort_by(|a, b| a.hum_id.cmp(&b.hum_id));
    let total = matched.len();

    let hits = matched
        .into_iter()
        .skip(params.page * params.size)
        .take(params.size)
        .map(|research| {
            let empty = Vec::new();
            let versions = versions_by_hum_id.get(&research.hum_id).unwrap_or(&empty);
            project(research, versions, params.lang)
        })
        .collect();

    ResearchSearchResult { hits, total }
}
