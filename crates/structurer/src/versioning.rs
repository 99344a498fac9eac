//! Dataset version assignment (§4.4.4): a version string is reused when
//! both language sides of a dataset's experiments are canonically identical
//! to a previously emitted version; otherwise a new `v{n+1}` is assigned.
//! History is carried across humVersionIds in processing order.

use common::{canonical_eq, Experiment};

#[derive(Debug, Clone)]
struct VersionEntry {
    version: String,
    experiments_json: serde_json::Value,
}

/// Per-`datasetId` version history, built up as humVersionIds are processed
/// in ascending order.
#[derive(Debug, Clone, Default)]
pub struct VersionHistory {
    entries: Vec<VersionEntry>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns (or reuses) a version string for one dataset's experiment
    /// list at a given humVersionId, recording it in the history.
    pub fn assign(&mut self, experiments: &[Experiment]) -> String {
        let experiments_json = serde_json::to_value(experiments).unwrap_or(serde_json::Value::Null);

        for entry in &self.entries {
            if canonical_eq(&entry.experiments_json, &experiments_json) {
                return entry.version.clone();
            }
        }

        let version = format!("v{}", self.entries.len() + 1);
        self.entries.push(VersionEntry { version: version.clone(), experiments_json });
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BilingualTextValue, ExperimentBase, Searchable};

    fn experiment(text: &str) -> Experiment {
        Experiment {
            base: ExperimentBase {
                header: BilingualTextValue {
                    ja: Some(common::TextValue::new(text, text)),
                    en: None,
                },
                data: Default::default(),
                footers: Vec::new(),
            },
            searchable: Searchable::default(),
        }
    }

    #[test]
    fn identical_experiments_reuse_the_same_version() {
        let mut history = VersionHistory::new();
        let v1 = history.assign(&[experiment("a")]);
        let v2 = history.assign(&[experiment("a")]);
        assert_eq!(v1, "v1");
        assert_eq!(v2, "v1");
    }

    #[test]
    fn different_experiments_get_a_new_version() {
        let mut history = VersionHistory::new();
        let v1 = history.assign(&[experiment("a")]);
        let v2 = history.assign(&[experiment("b")]);
        assert_eq!(v1, "v1");
        assert_eq!(v2, "v2");
    }
}
