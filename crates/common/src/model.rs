//! Structured, post-pipeline entity shapes (§3): `Research`, `ResearchVersion`,
//! `Dataset`, `Experiment`, and the `searchable` facet projection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bilingual::{BilingualText, BilingualTextValue};
use crate::ids::{DatasetId, HumId, HumVersionId};

/// One of the three canonical access criteria a Dataset may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criteria {
    #[serde(rename = "Controlled-access (Type I)")]
    ControlledAccessTypeI,
    #[serde(rename = "Controlled-access (Type II)")]
    ControlledAccessTypeII,
    #[serde(rename = "Unrestricted-access")]
    UnrestrictedAccess,
}

impl Criteria {
    pub fn as_str(self) -> &'static str {
        match self {
            Criteria::ControlledAccessTypeI => "Controlled-access (Type I)",
            Criteria::ControlledAccessTypeII => "Controlled-access (Type II)",
            Criteria::UnrestrictedAccess => "Unrestricted-access",
        }
    }
}

/// Lifecycle state of a Research record, gating visibility per §4.7.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Review,
    Published,
    Deleted,
}

/// A principal investigator / affiliation entry, one element of
/// `Research.dataProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProvider {
    pub principal_investigator: BilingualText,
    pub affiliation: BilingualText,
    pub project_name: BilingualText,
    pub project_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub grant_id: Option<String>,
    pub title: BilingualText,
    pub funder: BilingualText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub title: BilingualText,
    pub doi: Option<String>,
    pub dataset_ids: Vec<DatasetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlledAccessUser {
    pub organisation: BilingualText,
    pub name: BilingualText,
    pub dataset_ids: Vec<DatasetId>,
    /// `YYYY-MM-DD` period-of-data-use bounds, parsed per §4.3.7.
    pub period_start: Option<String>,
    pub period_end: Option<String>,
}

/// One vendor/model pair, the special-cased `platform` facet (§4.7.1/§4.7.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub vendor: Option<String>,
    pub model: Option<String>,
}

impl Platform {
    /// Serializes to the `vendor||model` wire form used in query params and
    /// composite aggregation bucket keys (§4.7.1, §4.7.5).
    pub fn to_wire(&self) -> String {
        format!(
            "{}||{}",
            self.vendor.as_deref().unwrap_or(""),
            self.model.as_deref().unwrap_or("")
        )
    }

    /// Parses the `vendor||model` wire form back into a `Platform`. Either
    /// side may be empty, meaning "unspecified".
    pub fn from_wire(raw: &str) -> Self {
        match raw.split_once("||") {
            Some((vendor, model)) => Platform {
                vendor: (!vendor.is_empty()).then(|| vendor.to_string()),
                model: (!model.is_empty()).then(|| model.to_string()),
            },
            None => Platform {
                vendor: (!raw.is_empty()).then(|| raw.to_string()),
                model: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    pub label: String,
    pub icd10: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCounts {
    pub snv: Option<u64>,
    pub indel: Option<u64>,
    pub cnv: Option<u64>,
    pub sv: Option<u64>,
    pub total: Option<u64>,
}

/// The post-normalization facet projection indexed for search (§3, §4.7.1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Searchable {
    pub assay_type: Vec<String>,
    pub tissues: Vec<String>,
    pub population: Vec<String>,
    pub platform: Vec<Platform>,
    pub file_types: Vec<String>,
    pub health_status: Vec<String>,
    /// Keyed by subject-count type (e.g. "case", "control").
    pub subject_count: BTreeMap<String, u64>,
    pub sex: Vec<String>,
    pub age_group: Vec<String>,
    pub library_kits: Vec<String>,
    pub read_type: Vec<String>,
    pub read_length: Option<String>,
    pub reference_genome: Option<String>,
    pub processed_data_types: Vec<String>,
    pub cell_line: Vec<String>,
    pub is_tumor: Option<bool>,
    pub has_phenotype_data: Option<bool>,
    pub diseases: Vec<Disease>,
    pub policies: Vec<PolicyRef>,
    pub variant_counts: Option<VariantCounts>,
    pub sequencing_depth: Option<String>,
    pub target_coverage: Option<String>,
    pub data_volume_gb: Option<f64>,
}

/// One field value in an experiment's `data` map: either a single bilingual
/// cell, or — when the source row repeats a header — several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(BilingualTextValue),
    Multi(Vec<BilingualTextValue>),
}

impl FieldValue {
    /// The first element regardless of shape, per the Structurer's "prefer
    /// the first element when a field is multi-valued" rule (§4.4.1).
    pub fn first(&self) -> Option<&BilingualTextValue> {
        match self {
            FieldValue::Single(v) => Some(v),
            FieldValue::Multi(vs) => vs.first(),
        }
    }
}

/// One row of a molecular-data table, post-canonicalization (§3, §4.4.1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentBase {
    pub header: BilingualTextValue,
    pub data: BTreeMap<String, FieldValue>,
    pub footers: Vec<BilingualTextValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    #[serde(flatten)]
    pub base: ExperimentBase,
    pub searchable: Searchable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    pub dataset_id: DatasetId,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Research {
    pub hum_id: HumId,
    pub url: BilingualText,
    pub title: BilingualText,
    pub summary: BilingualTextValue,
    pub data_provider: Vec<DataProvider>,
    pub research_project: Vec<BilingualText>,
    pub grant: Vec<Grant>,
    pub related_publication: Vec<Publication>,
    pub controlled_access_user: Vec<ControlledAccessUser>,
    pub version_ids: Vec<HumVersionId>,
    pub latest_version: HumVersionId,
    pub first_release_date: Option<String>,
    pub last_release_date: Option<String>,
    pub status: Status,
    pub uids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchVersion {
    pub hum_id: HumId,
    pub hum_version_id: HumVersionId,
    pub version: u32,
    pub version_release_date: Option<String>,
    pub datasets: Vec<DatasetRef>,
    pub release_note: BilingualTextValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub dataset_id: DatasetId,
    pub version: String,
    pub version_release_date: Option<String>,
    pub hum_id: HumId,
    pub hum_version_id: HumVersionId,
    pub release_date: Option<String>,
    pub criteria: Vec<Criteria>,
    pub type_of_data: BilingualText,
    pub experiments: Vec<Experiment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_wire_roundtrip() {
        let p = Platform {
            vendor: Some("Illumina".into()),
            model: Some("NovaSeq 6000".into()),
        };
        assert_eq!(p.to_wire(), "Illumina||NovaSeq 6000");
        assert_eq!(Platform::from_wire("Illumina||NovaSeq 6000"), p);
    }

    #[test]
    fn platform_wire_with_missing_half() {
        let p = Platform::from_wire("Illumina||");
        assert_eq!(p.vendor.as_deref(), Some("Illumina"));
        assert_eq!(p.model, None);
    }

    #[test]
    fn field_value_first_handles_both_shapes() {
        let single = FieldValue::Single(BilingualTextValue::default());
        assert!(single.first().is_some());

        let multi = FieldValue::Multi(vec![]);
        assert!(multi.first().is_none());
    }
}
