use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StructureError {
    #[error("no normalized records supplied for humId {0}")]
    EmptyHumId(String),

    #[error("version {0} appears more than once for the same humId")]
    DuplicateVersion(u32),
}
