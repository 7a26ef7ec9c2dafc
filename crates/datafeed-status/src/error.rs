use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Status connection closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to start status executor: {0}")]
    Executor(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatusError>;
