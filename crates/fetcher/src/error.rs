use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    #[error("non-retryable fetch failure for {url}: {message}")]
    NonRetryable { url: String, message: String },

    #[error("fetch retries exhausted for {url}: {message}")]
    RetriesExhausted { url: String, message: String },

    #[error("cache io error: {0}")]
    CacheIo(String),

    #[error("{hum_id} is on the skip list for page kind {page_kind:?}")]
    Skipped { hum_id: String, page_kind: PageKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Detail,
    Release,
}
