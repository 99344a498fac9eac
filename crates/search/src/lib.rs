//! SearchQuerier (§4.7): two entry points, `search_datasets` and
//! `search_researches`, layered over the document store in `indexwriter`.
//!
//! There is no external search engine in this stack, so "query execution"
//! means scanning the relevant logical index and evaluating the same
//! declarative filter/sort/aggregate shapes a real engine would — the way
//! `crates/matcher` evaluated a `MatchExpr` tree against scored hits
//! in-process instead of delegating to one.

mod auth;
mod dataset_search;
mod error;
mod facets;
mod filters;
mod research_search;

pub use auth::{accessible_hum_ids, is_research_visible, Principal};
pub use dataset_search::{DatasetSearchParams, DatasetSearchResult, SortKey};
pub use error::SearchError;
pub use facets::{facet_counts, platform_facet_counts, FacetBucket};
pub use filters::{has_dataset_level_filters, DatasetFilters, FacetField, PlatformFilter, RangeBound, RangeField};
pub use research_search::{ResearchSearchParams, ResearchSearchResult, ResearchSummary};

use std::collections::HashMap;

use common::{Dataset, HumId, Research, ResearchVersion};
use indexwriter::{IndexWriter, DATASET_INDEX, RESEARCH_INDEX, RESEARCH_VERSION_INDEX};

pub struct SearchQuerier {
    writer: std::sync::Arc<IndexWriter>,
}

impl SearchQuerier {
    pub fn new(writer: std::sync::Arc<IndexWriter>) -> Self {
        Self { writer }
    }

    fn all_researches(&self) -> Result<Vec<Research>, SearchError> {
        Ok(self.writer.scan::<Research>(RESEARCH_INDEX)?.into_iter().map(|r| r.doc).collect())
    }

    fn all_datasets(&self) -> Result<Vec<Dataset>, SearchError> {
        Ok(self.writer.scan::<Dataset>(DATASET_INDEX)?.into_iter().map(|r| r.doc).collect())
    }

    fn versions_by_hum_id(&self) -> Result<HashMap<HumId, Vec<ResearchVersion>>, SearchError> {
        let mut map: HashMap<HumId, Vec<ResearchVersion>> = HashMap::new();
        for entry in self.writer.scan::<ResearchVersion>(RESEARCH_VERSION_INDEX)? {
            map.entry(entry.doc.hum_id.clone()).or_default().push(entry.doc);
        }
        Ok(map)
    }

    /// §4.7: resolves the caller's accessible humId set first; datasets
    /// belonging to an invisible Research never reach the index scan.
    pub fn search_datasets(&self, params: &DatasetSearchParams, principal: &Principal) -> Result<DatasetSearchResult, SearchError> {
        let researches = self.all_researches()?;
        let accessible = accessible_hum_ids(&researches, principal, params.include_deleted);
        if accessible.is_empty() {
            tracing::debug!("no accessible humIds for principal; skipping dataset index scan");
            return Ok(DatasetSearchResult { hits: Vec::new(), total: 0 });
        }

        let mut params = params.clone();
        params.filters.terms_hum_ids = Some(accessible.iter().map(|id| id.to_string()).collect());

        let datasets = self.all_datasets()?;
        Ok(dataset_search::execute(&datasets, &params))
    }

    /// §4.7.4: two-phase research search. Phase one (Dataset index,
    /// aggregation-only) only runs when a Dataset-level filter is present.
    pub fn search_researches(&self, params: &ResearchSearchParams, principal: &Principal) -> Result<ResearchSearchResult, SearchError> {
        let researches = self.all_researches()?;
        let accessible = accessible_hum_ids(&researches, principal, params.include_deleted);
        if accessible.is_empty() {
            tracing::debug!("no accessible humIds for principal; skipping research search");
            return Ok(ResearchSearchResult { hits: Vec::new(), total: 0 });
        }

        let dataset_phase_ids = if has_dataset_level_filters(&params.dataset_filters) {
            let datasets = self.all_datasets()?;
            let ids = research_search::dataset_phase_hum_ids(&datasets, &params.dataset_filters);
            match &ids {
                Some(ids) if ids.is_empty() => return Ok(ResearchSearchResult { hits: Vec::new(), total: 0 }),
                _ => {}
            }
            ids
        } else {
            None
        };

        let versions = self.versions_by_hum_id()?;
        Ok(research_search::execute(&researches, &versions, &accessible, dataset_phase_ids.as_ref(), params))
    }

    /// §4.7.5: facet counts over every dataset accessible to `principal`,
    /// independent of any other filter on the current search.
    pub fn facets(&self, field: FacetField, principal: &Principal) -> Result<Vec<FacetBucket>, SearchError> {
        let researches = self.all_researches()?;
        let accessible = accessible_hum_ids(&researches, principal, false);
        let datasets: Vec<Dataset> = self
            .all_datasets()?
            .into_iter()
            .filter(|d| accessible.contains(&d.hum_id))
            .collect();
        Ok(facet_counts(&datasets, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BilingualText, BilingualTextValue, Criteria, DatasetRef, Experiment, HumVersionId, Status};
    use indexwriter::InMemoryBackend;

    fn research(hum_id: &str, status: Status) -> Research {
        let hum_id: HumId = hum_id.parse().unwrap();
        Research {
            hum_id: hum_id.clone(),
            url: BilingualText::default(),
            title: BilingualText::new(Some("title".into()), Some("title".into())),
            summary: BilingualTextValue::default(),
            data_provider: Vec::new(),
            research_project: Vec::new(),
            grant: Vec::new(),
            related_publication: Vec::new(),
            controlled_access_user: Vec::new(),
            version_ids: vec![HumVersionId::new(hum_id.clone(), 1)],
            latest_version: HumVersionId::new(hum_id.clone(), 1),
            first_release_date: Some("2024-01-01".into()),
            last_release_date: Some("2024-01-01".into()),
            status,
            uids: Vec::new(),
        }
    }

    fn dataset(dataset_id: &str, hum_id: &str) -> Dataset {
        Dataset {
            dataset_id: dataset_id.into(),
            version: "v1".into(),
            version_release_date: None,
            hum_id: hum_id.parse::<HumId>().unwrap(),
            hum_version_id: format!("{hum_id}-v1").parse::<HumVersionId>().unwrap(),
            release_date: Some("2024-01-01".into()),
            criteria: vec![Criteria::UnrestrictedAccess],
            type_of_data: BilingualText::default(),
            experiments: vec![Experiment::default()],
        }
    }

    fn version(hum_id: &str, dataset_id: &str) -> ResearchVersion {
        let hum_id: HumId = hum_id.parse().unwrap();
        ResearchVersion {
            hum_id: hum_id.clone(),
            hum_version_id: HumVersionId::new(hum_id, 1),
            version: 1,
            version_release_date: None,
            datasets: vec![DatasetRef { dataset_id: dataset_id.into(), version: "v1".into() }],
            release_note: BilingualTextValue::default(),
        }
    }

    fn querier_with_fixtures() -> SearchQuerier {
        let writer = IndexWriter::new(Box::new(InMemoryBackend::new()));
        writer.create(RESEARCH_INDEX, "hum0001", &research("hum0001", Status::Published)).unwrap();
        writer.create(RESEARCH_INDEX, "hum0002", &research("hum0002", Status::Draft)).unwrap();
        writer.create(DATASET_INDEX, "JGAD000001-v1", &dataset("JGAD000001", "hum0001")).unwrap();
        writer.create(DATASET_INDEX, "JGAD000002-v1", &dataset("JGAD000002", "hum0002")).unwrap();
        writer.create(RESEARCH_VERSION_INDEX, "hum0001-v1", &version("hum0001", "JGAD000001")).unwrap();
        writer.create(RESEARCH_VERSION_INDEX, "hum0002-v1", &version("hum0002", "JGAD000002")).unwrap();
        SearchQuerier::new(std::sync::Arc::new(writer))
    }

    #[test]
    fn anonymous_dataset_search_never_returns_non_published() {
        let querier = querier_with_fixtures();
        let result = querier.search_datasets(&DatasetSearchParams::default(), &Principal::anonymous()).unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].dataset_id.as_str(), "JGAD000001");
    }

    #[test]
    fn admin_research_search_sees_drafts_too() {
        let querier = querier_with_fixtures();
        let result = querier
            .search_researches(&ResearchSearchParams { size: 10, ..Default::default() }, &Principal::admin())
            .unwrap();
        assert_eq!(result.total, 2);
    }

    #[test]
    fn empty_accessible_set_short_circuits_without_scanning_datasets() {
        let writer = IndexWriter::new(Box::new(InMemoryBackend::new()));
        writer.create(RESEARCH_INDEX, "hum0001", &research("hum0001", Status::Draft)).unwrap();
        let querier = SearchQuerier::new(std::sync::Arc::new(writer));
        let result = querier.search_datasets(&DatasetSearchParams::default(), &Principal::anonymous()).unwrap();
        assert_eq!(result.total, 0);
        assert!(result.hits.is_empty());
    }
}
