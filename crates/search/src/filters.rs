//! Filter clause construction (§4.7.1). A real Elasticsearch client would
//! serialize these into query DSL; here the same declarative shapes are
//! evaluated directly against in-memory `Dataset`/`Experiment` values, the
//! way `crates/matcher` evaluates a `MatchExpr` tree against scored hits
//! instead of delegating to an external query engine.

use common::{Dataset, Platform, Searchable};

/// A single named facet field over `experiments.searchable.*`, used to
/// drive both the terms-filter table and the reverse-nested facet table
/// (§4.7.1, §4.7.5) from one source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetField {
    AssayType,
    Tissues,
    Population,
    FileTypes,
    HealthStatus,
    Sex,
    AgeGroup,
    LibraryKits,
    ReadType,
    ProcessedDataTypes,
    CellLine,
}

impl FacetField {
    pub const ALL: [FacetField; 11] = [
        FacetField::AssayType,
        FacetField::Tissues,
        FacetField::Population,
        FacetField::FileTypes,
        FacetField::HealthStatus,
        FacetField::Sex,
        FacetField::AgeGroup,
        FacetField::LibraryKits,
        FacetField::ReadType,
        FacetField::ProcessedDataTypes,
        FacetField::CellLine,
    ];

    pub fn values<'a>(self, searchable: &'a Searchable) -> &'a [String] {
        match self {
            FacetField::AssayType => &searchable.assay_type,
            FacetField::Tissues => &searchable.tissues,
            FacetField::Population => &searchable.population,
            FacetField::FileTypes => &searchable.file_types,
            FacetField::HealthStatus => &searchable.health_status,
            FacetField::Sex => &searchable.sex,
            FacetField::AgeGroup => &searchable.age_group,
            FacetField::LibraryKits => &searchable.library_kits,
            FacetField::ReadType => &searchable.read_type,
            FacetField::ProcessedDataTypes => &searchable.processed_data_types,
            FacetField::CellLine => &searchable.cell_line,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            FacetField::AssayType => "assayType",
            FacetField::Tissues => "tissues",
            FacetField::Population => "population",
            FacetField::FileTypes => "fileTypes",
            FacetField::HealthStatus => "healthStatus",
            FacetField::Sex => "sex",
            FacetField::AgeGroup => "ageGroup",
            FacetField::LibraryKits => "libraryKits",
            FacetField::ReadType => "readType",
            FacetField::ProcessedDataTypes => "processedDataTypes",
            FacetField::CellLine => "cellLine",
        }
    }
}

/// A single named numeric-range field over `experiments.searchable.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    DataVolumeGb,
}

impl RangeField {
    fn value(self, searchable: &Searchable) -> Option<f64> {
        match self {
            RangeField::DataVolumeGb => searchable.data_volume_gb,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RangeBound {
    pub gte: Option<f64>,
    pub lte: Option<f64>,
}

impl RangeBound {
    fn matches(&self, value: f64) -> bool {
        self.gte.map(|gte| value >= gte).unwrap_or(true) && self.lte.map(|lte| value <= lte).unwrap_or(true)
    }
}

/// The `vendor||model` platform filter special case (§4.7.1): `bool.must`
/// when both sides are present, `bool.should` otherwise.
#[derive(Debug, Clone, Default)]
pub struct PlatformFilter {
    pub vendor: Option<String>,
    pub model: Option<String>,
}

impl PlatformFilter {
    pub fn from_wire(raw: &str) -> Self {
        let parsed = Platform::from_wire(raw);
        Self { vendor: parsed.vendor, model: parsed.model }
    }

    fn matches(&self, platform: &Platform) -> bool {
        match (&self.vendor, &self.model) {
            (Some(vendor), Some(model)) => {
                platform.vendor.as_deref() == Some(vendor.as_str()) && platform.model.as_deref() == Some(model.as_str())
            }
            (Some(vendor), None) => platform.vendor.as_deref() == Some(vendor.as_str()),
            (None, Some(model)) => platform.model.as_deref() == Some(model.as_str()),
            (None, None) => true,
        }
    }
}

/// Every filter `searchDatasets`/`searchResearches` may carry (§4.7.1). All
/// fields default to "no constraint"; `terms_hum_ids` is never set directly
/// by a caller — the authorization layer injects it (§4.7.2).
#[derive(Debug, Clone, Default)]
pub struct DatasetFilters {
    pub terms_hum_ids: Option<Vec<String>>,
    pub criteria: Vec<String>,
    pub type_of_data_wildcard: Option<String>,
    pub release_date_from: Option<String>,
    pub release_date_to: Option<String>,
    pub terms: Vec<(FacetField, Vec<String>)>,
    pub ranges: Vec<(RangeField, RangeBound)>,
    pub platforms: Vec<PlatformFilter>,
    pub is_tumor: Option<bool>,
    pub has_phenotype_data: Option<bool>,
    pub disease: Option<String>,
    pub disease_icd10_prefix: Option<String>,
    pub policy_id: Option<String>,
}

impl DatasetFilters {
    pub fn is_empty(&self) -> bool {
        self.terms_hum_ids.is_none()
            && self.criteria.is_empty()
            && self.type_of_data_wildcard.is_none()
            && self.release_date_from.is_none()
            && self.release_date_to.is_none()
            && self.terms.is_empty()
            && self.ranges.is_empty()
            && self.platforms.is_empty()
            && self.is_tumor.is_none()
            && self.has_phenotype_data.is_none()
            && self.disease.is_none()
            && self.disease_icd10_prefix.is_none()
            && self.policy_id.is_none()
    }

    /// Whether `dataset` matches every configured filter. A dataset matches
    /// a nested filter (terms/range/platform/disease/icd10/policy/boolean
    /// flag) if at least one of its experiments matches it, mirroring a
    /// real `nested` query's per-array-element semantics.
    pub fn matches(&self, dataset: &Dataset) -> bool {
        if let Some(hum_ids) = &self.terms_hum_ids {
            if !hum_ids.iter().any(|id| id == dataset.hum_id.to_string().as_str()) {
                return false;
            }
        }

        if !self.criteria.is_empty() && !dataset.criteria.iter().any(|c| self.criteria.iter().any(|wanted| wanted == c.as_str())) {
            return false;
        }

        if let Some(wildcard) = &self.type_of_data_wildcard {
            let needle = wildcard.to_lowercase();
            let ja_matches = dataset.type_of_data.ja.as_deref().map(|v| v.to_lowercase().contains(&needle)).unwrap_or(false);
            let en_matches = dataset.type_of_data.en.as_deref().map(|v| v.to_lowercase().contains(&needle)).unwrap_or(false);
            if !ja_matches && !en_matches {
                return false;
            }
        }

        if let Some(from) = &self.release_date_from {
            if dataset.release_date.as_deref().map(|d| d < from.as_str()).unwrap_or(true) {
                return false;
            }
        }
        if let Some(to) = &self.release_date_to {
            if dataset.release_date.as_deref().map(|d| d > to.as_str()).unwrap_or(true) {
                return false;
            }
        }

        for (field, wanted) in &self.terms {
            if !dataset.experiments.iter().any(|exp| {
                field.values(&exp.searchable).iter().any(|value| wanted.iter().any(|w| w == value))
            }) {
                return false;
            }
        }

        for (field, bound) in &self.ranges {
            if !dataset.experiments.iter().any(|exp| field.value(&exp.searchable).map(|v| bound.matches(v)).unwrap_or(false)) {
                return false;
            }
        }

        for platform_filter in &self.platforms {
            if !dataset.experiments.iter().any(|exp| exp.searchable.platform.iter().any(|p| platform_filter.matches(p))) {
                return false;
            }
        }

        if let Some(is_tumor) = self.is_tumor {
            if !dataset.experiments.iter().any(|exp| exp.searchable.is_tumor == Some(is_tumor)) {
                return false;
            }
        }

        if let Some(has_phenotype_data) = self.has_phenotype_data {
            if !dataset.experiments.iter().any(|exp| exp.searchable.has_phenotype_data == Some(has_phenotype_data)) {
                return false;
            }
        }

        if let Some(disease) = &self.disease {
            let needle = disease.to_lowercase();
            if !dataset
                .experiments
                .iter()
                .any(|exp| exp.searchable.diseases.iter().any(|d| d.label.to_lowercase().contains(&needle)))
            {
                return false;
            }
        }

        if let Some(prefix) = &self.disease_icd10_prefix {
            let needle = prefix.to_lowercase();
            if !dataset.experiments.iter().any(|exp| {
                exp.searchable
                    .diseases
                    .iter()
                    .any(|d| d.icd10.as_deref().map(|code| code.to_lowercase().starts_with(&needle)).unwrap_or(false))
            }) {
                return false;
            }
        }

        if let Some(policy_id) = &self.policy_id {
            if !dataset.experiments.iter().any(|exp| exp.searchable.policies.iter().any(|p| &p.id == policy_id)) {
                return false;
            }
        }

        true
    }
}

/// True if `dataset` carries at least one filter that would require
/// consulting the Dataset index (§4.7.4's "if any Dataset filter is
/// present" gate for Research search's two-phase path).
pub fn has_dataset_level_filters(filters: &DatasetFilters) -> bool {
    !filters.criteria.is_empty()
        || filters.type_of_data_wildcard.is_some()
        || filters.release_date_from.is_some()
        || filters.release_date_to.is_some()
        || !filters.terms.is_empty()
        || !filters.ranges.is_empty()
        || !filters.platforms.is_empty()
        || filters.is_tumor.is_some()
        || filters.has_phenotype_data.is_some()
        || filters.disease.is_some()
        || filters.disease_icd10_prefix.is_some()
        || filters.policy_id.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BilingualText, BilingualTextValue, Criteria, Disease, Experiment, HumId, HumVersionId};

    fn dataset_with(experiments: Vec<Experiment>) -> Dataset {
        Dataset {
            dataset_id: "JGAD000001".into(),
            version: "v1".into(),
            version_release_date: None,
            hum_id: "hum0014".parse::<HumId>().unwrap(),
            hum_version_id: "hum0014-v1".parse::<HumVersionId>().unwrap(),
            release_date: Some("2024-01-01".into()),
            criteria: vec![Criteria::UnrestrictedAccess],
            type_of_data: BilingualText { ja: Some("全ゲノム".into()), en: Some("Whole genome".into()) },
            experiments,
        }
    }

    #[test]
    fn empty_filters_match_everything() {
        let dataset = dataset_with(vec![Experiment::default()]);
        assert!(DatasetFilters::default().matches(&dataset));
    }

    #[test]
    fn terms_filter_requires_at_least_one_matching_experiment() {
        let mut exp = Experiment::default();
        exp.searchable.tissues = vec!["Blood".into()];
        let dataset = dataset_with(vec![exp]);

        let mut filters = DatasetFilters::default();
        filters.terms.push((FacetField::Tissues, vec!["Blood".into()]));
        assert!(filters.matches(&dataset));

        filters.terms = vec![(FacetField::Tissues, vec!["Saliva".into()])];
        assert!(!filters.matches(&dataset));
    }

    #[test]
    fn platform_filter_requires_both_sides_when_both_given() {
        let mut exp = Experiment::default();
        exp.searchable.platform = vec![Platform { vendor: Some("Illumina".into()), model: Some("NovaSeq".into()) }];
        let dataset = dataset_with(vec![exp]);

        let mut filters = DatasetFilters::default();
        filters.platforms.push(PlatformFilter { vendor: Some("Illumina".into()), model: Some("HiSeq".into()) });
        assert!(!filters.matches(&dataset));

        filters.platforms = vec![PlatformFilter { vendor: Some("Illumina".into()), model: None }];
        assert!(filters.matches(&dataset));
    }

    #[test]
    fn disease_icd10_prefix_is_case_insensitive() {
        let mut exp = Experiment::default();
        exp.searchable.diseases = vec![Disease { label: "Breast cancer".into(), icd10: Some("C50.9".into()) }];
        let dataset = dataset_with(vec![exp]);

        let mut filters = DatasetFilters::default();
        filters.disease_icd10_prefix = Some("c50".into());
        assert!(filters.matches(&dataset));
    }

    #[test]
    fn type_of_data_wildcard_checks_both_languages() {
        let dataset = dataset_with(vec![Experiment::default()]);
        let mut filters = DatasetFilters::default();
        filters.type_of_data_wildcard = Some("genome".into());
        assert!(filters.matches(&dataset));

        filters.type_of_data_wildcard = Some("transcriptome".into());
        assert!(!filters.matches(&dataset));
    }
}
