//! ICD10-Normalizer (§4.5): rewrites `searchable.diseases` into
//! `{label, icd10}` pairs using a master ICD10 label table plus per-humId
//! manual split definitions, and validates the result in `--check` mode.

use std::collections::BTreeMap;

use common::Disease;
use serde::Deserialize;

use crate::error::ValidationError;

/// The master `icd10 -> label` table (`icd10-labels.json`, §6).
#[derive(Debug, Clone, Default)]
pub struct Icd10LabelTable {
    by_code: BTreeMap<String, String>,
    by_label: BTreeMap<String, String>,
}

impl Icd10LabelTable {
    pub fn from_map(codes_to_labels: BTreeMap<String, String>) -> Self {
        let by_label = codes_to_labels.iter().map(|(code, label)| (label.clone(), code.clone())).collect();
        Self { by_code: codes_to_labels, by_label }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let codes_to_labels: BTreeMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self::from_map(codes_to_labels))
    }

    pub fn master_label(&self, icd10: &str) -> Option<&str> {
        self.by_code.get(icd10).map(String::as_str)
    }

    pub fn code_for_label(&self, label: &str) -> Option<&str> {
        self.by_label.get(label).map(String::as_str)
    }
}

/// One manual split: a combined disease label for a given humId expands
/// into several distinct `{label, icd10}` entries.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitEntry {
    pub hum_id: String,
    pub raw_label: String,
    pub diseases: Vec<Disease>,
}

#[derive(Debug, Clone, Default)]
pub struct Icd10SplitTable {
    splits: BTreeMap<(String, String), Vec<Disease>>,
}

impl Icd10SplitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<SplitEntry>) -> Self {
        let splits = entries.into_iter().map(|e| ((e.hum_id, e.raw_label), e.diseases)).collect();
        Self { splits }
    }

    pub fn lookup(&self, hum_id: &str, raw_label: &str) -> Option<&[Disease]> {
        self.splits.get(&(hum_id.to_string(), raw_label.to_string())).map(Vec::as_slice)
    }
}

/// Rewrites one dataset's disease list. A manual split for `(hum_id,
/// label)` takes precedence over master-table lookup entirely.
pub fn normalize_diseases(hum_id: &str, diseases: &[Disease], labels: &Icd10LabelTable, splits: &Icd10SplitTable) -> Vec<Disease> {
    let mut out = Vec::with_capacity(diseases.len());
    for disease in diseases {
        if let Some(split_entries) = splits.lookup(hum_id, &disease.label) {
            out.extend(split_entries.iter().cloned());
            continue;
        }

        let icd10 = disease.icd10.clone().or_else(|| labels.code_for_label(&disease.label).map(str::to_string));
        let label = icd10.as_deref().and_then(|code| labels.master_label(code)).map(str::to_string).unwrap_or_else(|| disease.label.clone());
        out.push(Disease { label, icd10 });
    }
    out
}

/// `--check` mode (§4.5): every disease must carry a non-null icd10 code
/// whose master label matches exactly.
pub fn check(hum_id: &str, dataset_id: &str, diseases: &[Disease], labels: &Icd10LabelTable) -> Vec<ValidationError> {
    let mut violations = Vec::new();
    for disease in diseases {
        match &disease.icd10 {
            None => violations.push(ValidationError::MissingIcd10 {
                hum_id: hum_id.to_string(),
                dataset_id: dataset_id.to_string(),
                label: disease.label.clone(),
            }),
            Some(code) => {
                let expected = labels.master_label(code).unwrap_or_default();
                if expected != disease.label {
                    violations.push(ValidationError::LabelMismatch {
                        hum_id: hum_id.to_string(),
                        dataset_id: dataset_id.to_string(),
                        icd10: code.clone(),
                        expected: expected.to_string(),
                        actual: disease.label.clone(),
                    });
                }
            }
        }
    }
    violations
}
