use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexWriterError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("document already exists at {0}")]
    Conflict(String),

    #[error("humId allocation did not settle after {0} create-only retries")]
    HumIdAllocationExhausted(u32),
}

impl IndexWriterError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}
