use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RelationError {
    #[error("relation service request failed: {0}")]
    Request(String),

    #[error("relation service returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("relation cache io error: {0}")]
    CacheIo(String),
}
