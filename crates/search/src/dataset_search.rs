//! Dataset search execution (§4.7.3): collapse by `datasetId`, sort, and a
//! cardinality aggregation standing in for the true distinct-dataset total.

use std::cmp::Ordering;
use std::collections::HashMap;

use common::Dataset;
use serde::Serialize;

use crate::filters::DatasetFilters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// `_score` desc then `datasetId` asc — only valid when a free-text
    /// query is present.
    Relevance,
    /// `releaseDate`, missing sorts last, then `datasetId` asc.
    ReleaseDate,
    DatasetId,
}

#[derive(Debug, Clone)]
pub struct DatasetSearchParams {
    pub filters: DatasetFilters,
    pub query: Option<String>,
    pub page: usize,
    pub size: usize,
    /// Admin-only escape hatch to widen accessibility to deleted records
    /// (§4.7.2's "or all if the query explicitly requests deleted").
    pub include_deleted: bool,
}

impl Default for DatasetSearchParams {
    fn default() -> Self {
        Self { filters: DatasetFilters::default(), query: None, page: 0, size: 20, include_deleted: false }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSearchResult {
    pub hits: Vec<Dataset>,
    /// Cardinality aggregation over `datasetId` (§4.7.3): the count of
    /// distinct datasets after collapsing, not the row count.
    pub total: usize,
}

fn sort_key(params: &DatasetSearchParams) -> SortKey {
    if params.query.is_some() {
        SortKey::Relevance
    } else {
        SortKey::ReleaseDate
    }
}

/// A crude relevance score standing in for `_score`: the number of
/// free-text terms that appear in the dataset's `typeOfData` bilingual
/// fields. Real relevance scoring lives in the search engine this document
/// store does not have; this keeps sort order deterministic and testable.
fn relevance_score(dataset: &Dataset, query: &str) -> u32 {
    let haystacks = [dataset.type_of_data.ja.as_deref(), dataset.type_of_data.en.as_deref()];
    let needle = query.to_lowercase();
    haystacks
        .iter()
        .flatten()
        .filter(|text| text.to_lowercase().contains(&needle))
        .count() as u32
}

fn version_number(dataset: &Dataset) -> u32 {
    dataset.version.trim_start_matches('v').parse().unwrap_or(0)
}

/// Executes a Dataset search against an already-fetched candidate set. The
/// caller is responsible for restricting `candidates` to accessible humIds
/// (§4.7.2) before calling this.
pub fn execute(candidates: &[Dataset], params: &DatasetSearchParams) -> DatasetSearchResult {
    let matched: Vec<&Dataset> = candidates.iter().filter(|d| params.filters.matches(d)).collect();

    let mut best_by_dataset_id: HashMap<&str, &Dataset> = HashMap::new();
    for dataset in matched {
        let key = dataset.dataset_id.as_str();
        match best_by_dataset_id.get(key) {
            Some(existing) => {
                let better = (version_number(dataset), dataset.release_date.as_deref())
                    > (version_number(existing), existing.release_date.as_deref());
                if better {
                    best_by_dataset_id.insert(key, dataset);
                }
            }
            None => {
                best_by_dataset_id.insert(key, dataset);
            }
        }
    }

    let mut collapsed: Vec<&Dataset> = best_by_dataset_id.into_values().collect();
    let total = collapsed.len();

    match sort_key(params) {
        SortKey::Relevance => {
            let query = params.query.as_deref().unwrap_or("");
            collapsed.sort_by(|a, b| {
                relevance_score(b, query)
                    .cmp(&relevance_score(a, query))
                    .then_with(|| a.dataset_id.as_str().cmp(b.dataset_id.as_str()))
            });
        }
        SortKey::ReleaseDate => {
            collapsed.sort_by(|a, b| match (&a.release_date, &b.release_date) {
                (Some(x), Some(y)) => x.cmp(y).then_with(|| a.dataset_id.as_str().cmp(b.dataset_id.as_str())),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.dataset_id.as_str().cmp(b.dataset_id.as_str()),
            });
        }
        SortKey::DatasetId => collapsed.sort_by(|a, b| a.dataset_id.as_str().cmp(b.dataset_id.as_str())),
    }

    let hits = collapsed
        .into_iter()
        .skip(params.page * params.size)
        .take(params.size)
        .cloned()
        .collect();

    DatasetSearchResult { hits, total }
}
