//! Facet aggregations (§4.7.5). A real `reverse_nested` aggregation counts
//! the parent documents behind matching nested children rather than the
//! children themselves; here that's just "count distinct datasetIds", since
//! facet values are deduplicated per-dataset before counting, not per-row.

use std::collections::BTreeMap;

use common::Dataset;

use crate::filters::FacetField;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetBucket {
    pub key: String,
    /// Number of distinct datasets carrying this value in at least one
    /// experiment — the reverse-nested count, not a row count.
    pub dataset_count: u64,
}

/// Counts distinct datasets per value of `field` across `datasets`.
pub fn facet_counts(datasets: &[Dataset], field: FacetField) -> Vec<FacetBucket> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for dataset in datasets {
        let mut seen = std::collections::BTreeSet::new();
        for experiment in &dataset.experiments {
            for value in field.values(&experiment.searchable) {
                seen.insert(value.clone());
            }
        }
        for value in seen {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    let mut buckets: Vec<FacetBucket> = counts.into_iter().map(|(key, dataset_count)| FacetBucket { key, dataset_count }).collect();
    buckets.sort_by(|a, b| b.dataset_count.cmp(&a.dataset_count).then_with(|| a.key.cmp(&b.key)));
    buckets
}

/// The `platform` facet (§4.7.5): a composite aggregation over
/// `(vendor, model)`, with bucket keys serialized back to `vendor||model`.
pub fn platform_facet_counts(datasets: &[Dataset]) -> Vec<FacetBucket> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for dataset in datasets {
        let mut seen = std::collections::BTreeSet::new();
        for experiment in &dataset.experiments {
            for platform in &experiment.searchable.platform {
                seen.insert(platform.to_wire());
            }
        }
        for key in seen {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut buckets: Vec<FacetBucket> = counts.into_iter().map(|(key, dataset_count)| FacetBucket { key, dataset_count }).collect();
    buckets.sort_by(|a, b| b.dataset_count.cmp(&a.dataset_count).then_with(|| a.key.cmp(&b.key)));
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BilingualText, Criteria, Experiment, HumId, HumVersionId, Platform};

    fn dataset(dataset_id: &str, tissues: Vec<&str>, platform: Option<Platform>) -> Dataset {
        let mut exp = Experiment::default();
        exp.searchable.tissues = tissues.into_iter().map(String::from).collect();
        if let Some(p) = platform {
            exp.searchable.platform = vec![p];
        }
        Dataset {
            dataset_id: dataset_id.into(),
            version: "v1".into(),
            version_release_date: None,
            hum_id: "hum0001".parse::<HumId>().unwrap(),
            hum_version_id: "hum0001-v1".parse::<HumVersionId>().unwrap(),
            release_date: None,
            criteria: vec![Criteria::UnrestrictedAccess],
            type_of_data: BilingualText::default(),
            experiments: vec![exp],
        }
    }

    #[test]
    fn facet_counts_are_per_dataset_not_per_experiment() {
        let mut exp2 = Experiment::default();
        exp2.searchable.tissues = vec!["Blood".into()];
        let mut d = dataset("JGAD000001", vec!["Blood"], None);
        d.experiments.push(exp2);

        let buckets = facet_counts(&[d], FacetField::Tissues);
        assert_eq!(buckets, vec![FacetBucket { key: "Blood".into(), dataset_count: 1 }]);
    }

    #[test]
    fn platform_facet_serializes_to_wire_form() {
        let platform = Platform { vendor: Some("Illumina".into()), model: Some("NovaSeq".into()) };
        let datasets = vec![dataset("JGAD000001", vec![], Some(platform))];
        let buckets = platform_facet_counts(&datasets);
        assert_eq!(buckets, vec![FacetBucket { key: "Illumina||NovaSeq".into(), dataset_count: 1 }]);
    }
}
