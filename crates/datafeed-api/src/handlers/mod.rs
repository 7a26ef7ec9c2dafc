pub mod data;
pub mod status;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use std::collections::HashMap;

use crate::error::ApiError;

pub const SESSION_HEADER: &str = "x-session-id";
pub const SESSION_QUERY_PARAM: &str = "session_id";

/// Client identity of a request: the session id from the `x-session-id`
/// header, or the `session_id` query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let session_id = from_header.or_else(|| {
            Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(mut params)| params.remove(SESSION_QUERY_PARAM))
        });

        match session_id {
            Some(id) if !id.trim().is_empty() => Ok(ClientId(id)),
            _ => Err(ApiError::MissingSession),
        }
    }
}
