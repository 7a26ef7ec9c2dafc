use axum::{
    body::Body,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::Response,
    Json,
};
use datafeed_status::Timestamps;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    handlers::ClientId,
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpsertResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub entity_type: String,
    pub timestamp: i64,
}

/// Stream all entities of a type as NDJSON
///
/// With a session id, the entity type is also registered for status
/// events, starting from the timestamp the data was read at.
#[utoipa::path(
    get,
    path = "/data/{entity_type}",
    params(
        ("entity_type" = String, Path, description = "Entity type"),
        ("x-session-id" = Option<String>, Header, description = "Client session id")
    ),
    responses(
        (status = 200, description = "Header line, then one [key, entity] row per entity", content_type = "application/x-ndjson")
    ),
    tag = "data"
)]
pub async fn stream_entities(
    State(state): State<Arc<AppState>>,
    Path(entity_type): Path<String>,
    client: Option<ClientId>,
) -> ApiResult<Response> {
    if let Some(ClientId(client_id)) = client {
        let time = state.store.timestamp(&entity_type).await;
        state.registry.register_entity_type(
            &client_id,
            &entity_type,
            &Timestamps::from([(entity_type.clone(), time)]),
        );
    }

    let response = state.bulk.serve(entity_type).await?;

    Ok(Response::builder()
        .status(response.status)
        .header(CONTENT_TYPE, response.content_type)
        .body(Body::from_stream(response.body))?)
}

/// Insert or replace an entity
#[utoipa::path(
    post,
    path = "/data/{entity_type}",
    params(
        ("entity_type" = String, Path, description = "Entity type")
    ),
    responses(
        (status = 200, description = "Entity stored", body = UpsertResponse),
        (status = 400, description = "Invalid entity")
    ),
    tag = "data"
)]
pub async fn upsert_entity(
    State(state): State<Arc<AppState>>,
    Path(entity_type): Path<String>,
    Json(entity): Json<Map<String, Value>>,
) -> ApiResult<Json<UpsertResponse>> {
    if entity_type.trim().is_empty() {
        return Err(ApiError::BadRequest("Entity type must not be empty".to_string()));
    }

    let (id, timestamp) = state.store.upsert(&entity_type, entity).await;

    Ok(Json(UpsertResponse {
        id,
        entity_type,
        timestamp,
    }))
}
