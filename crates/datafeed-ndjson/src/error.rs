use thiserror::Error;

#[derive(Error, Debug)]
pub enum NdjsonError {
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Entity source error: {0}")]
    Source(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NdjsonError>;
