use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacetError {
    #[error("unknown facet field {0:?}")]
    UnknownField(String),

    #[error("failed to read mapping file {path}: {source}")]
    MappingRead { path: String, source: csv::Error },

    #[error("failed to write mapping file {path}: {source}")]
    MappingWrite { path: String, source: csv::Error },

    #[error("failed to read ICD10 label table: {0}")]
    Icd10TableRead(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One violation surfaced by `icd10::check` (§4.5 `--check` mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingIcd10 { hum_id: String, dataset_id: String, label: String },
    LabelMismatch { hum_id: String, dataset_id: String, icd10: String, expected: String, actual: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingIcd10 { hum_id, dataset_id, label } => {
                write!(f, "{hum_id}/{dataset_id}: disease {label:?} has no icd10 code")
            }
            ValidationError::LabelMismatch { hum_id, dataset_id, icd10, expected, actual } => {
                write!(
                    f,
                    "{hum_id}/{dataset_id}: icd10 {icd10} label {actual:?} does not match master label {expected:?}"
                )
            }
        }
    }
}
