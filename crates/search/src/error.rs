use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid search params: {0}")]
    InvalidParams(String),

    #[error("index error: {0}")]
    Index(#[from] indexwriter::IndexWriterError),
}
