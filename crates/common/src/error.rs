//! The pipeline-wide error taxonomy (§7).
//!
//! Every stage surfaces failures through [`PipelineError`] so callers can
//! match on kind (`ConfigError` is fatal, `IndexConflict` is a retry signal
//! rather than a failure, the rest are per-record and get folded into a
//! [`crate::StageReport`]) without each crate inventing its own enum.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("normalize error: {0}")]
    Normalize(String),

    #[error("relation service error: {0}")]
    RelationService(String),

    /// Not surfaced as a failure at the pipeline level; callers retry with a
    /// fresh read (§7).
    #[error("index conflict on {0}")]
    IndexConflict(String),

    #[error("index io error: {0}")]
    IndexIo(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl PipelineError {
    /// `ConfigError` is the one kind that must abort the pipeline outright
    /// rather than being absorbed into a per-record `StageReport` (§7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Config(_))
    }
}
