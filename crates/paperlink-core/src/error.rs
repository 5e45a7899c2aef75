use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation failed: {0}")]
    Operation(String),
}
