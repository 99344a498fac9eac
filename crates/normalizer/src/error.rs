use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    #[error("unknown criteria value: {0}")]
    UnknownCriteria(String),

    #[error("relation service lookup failed for {jgas_id}: {message}")]
    RelationLookup { jgas_id: String, message: String },

    #[error("invalid record shape: {0}")]
    InvalidRecord(String),
}
