use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Data source error: {0}")]
    Source(#[from] anyhow::Error),

    #[error("Header serialization error: {0}")]
    Header(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StreamError>;
