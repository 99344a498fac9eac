//! The `RawRecord` shape DetailParser and ReleaseParser produce: one record
//! per `(humVersionId, language)`, pre-normalization (§4.2).

use std::collections::BTreeMap;

use common::TextValue;
use serde::{Deserialize, Serialize};

/// A cell that repeats its header within one row becomes `Multi`; otherwise
/// `Single`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFieldValue {
    Single(TextValue),
    Multi(Vec<TextValue>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSummary {
    pub title: Option<TextValue>,
    pub aims: Option<TextValue>,
    pub methods: Option<TextValue>,
    pub targets: Option<TextValue>,
    pub url: Option<String>,
    pub datasets: Vec<String>,
    pub footers: Vec<TextValue>,
}

/// One row of a molecular-data table, pre-normalization. `extracted_dataset_ids`
/// is harvested here from the header text and a fixed set of ID-bearing data
/// fields, ready for the Structurer's inversion pass (§4.4.1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MolecularDataRow {
    pub id: Option<String>,
    pub header: Option<TextValue>,
    pub data: BTreeMap<String, RawFieldValue>,
    pub footers: Vec<TextValue>,
    pub extracted_dataset_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataProvider {
    pub principal_investigator: Vec<String>,
    pub affiliation: Vec<String>,
    pub project_name: Vec<String>,
    pub project_url: Vec<String>,
    pub grants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPublication {
    pub title: Option<String>,
    pub doi: Option<String>,
    pub dataset_ids_raw: Vec<String>,
    pub period_raw: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawControlledAccessUser {
    pub organisation: Option<String>,
    pub name: Option<String>,
    pub dataset_ids_raw: Vec<String>,
    pub period_raw: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRelease {
    pub version: Option<String>,
    pub release_date_raw: Option<String>,
    pub note: Option<TextValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub hum_version_id: String,
    pub summary: RawSummary,
    pub molecular_data: Vec<MolecularDataRow>,
    pub data_provider: RawDataProvider,
    pub publications: Vec<RawPublication>,
    pub controlled_access_users: Vec<RawControlledAccessUser>,
    pub releases: Vec<RawRelease>,
}
