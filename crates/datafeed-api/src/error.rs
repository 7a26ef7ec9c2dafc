use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing session id: send the x-session-id header or a session_id query parameter")]
    MissingSession,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Status connection error: {0}")]
    Status(#[from] datafeed_status::StatusError),

    #[error("Data stream error: {0}")]
    Stream(#[from] datafeed_stream::StreamError),

    #[error("HTTP error: {0}")]
    Http(#[from] axum::http::Error),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingSession | ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Status(ref e) => {
                tracing::error!("Status connection error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Status connection error".to_string())
            }
            ApiError::Stream(ref e) => {
                tracing::error!("Data stream error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Data source error".to_string())
            }
            ApiError::Http(_) | ApiError::Internal => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
