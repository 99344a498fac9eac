use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("expected section {0} not found in page")]
    MissingSection(String),

    #[error("table structure did not match the expected shape: {0}")]
    MalformedTable(String),

    #[error("malformed html: {0}")]
    Html(String),
}
