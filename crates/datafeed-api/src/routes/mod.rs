pub mod health;

use axum::{
    http::Method,
    middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    config::Config,
    handlers::{data, status},
    middleware::logging,
    state::AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        status::status_stream,
        data::stream_entities,
        data::upsert_entity,
    ),
    components(schemas(health::HealthResponse, data::UpsertResponse)),
    tags(
        (name = "status", description = "Entity status events"),
        (name = "data", description = "Bulk entity transfer")
    )
)]
pub struct ApiDoc;

/// Path the status handler is documented under before mounting
const STATUS_DOC_PATH: &str = "/status";

/// OpenAPI document with the status channel at its mounted route
pub fn api_doc(status_route: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if let Some(item) = doc.paths.paths.remove(STATUS_DOC_PATH) {
        doc.paths.paths.insert(status_route.to_string(), item);
    }
    doc
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.timeout_secs);
    let doc = Arc::new(api_doc(&state.config.status_route()));

    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Data
        .route("/data/:entity_type", get(data::stream_entities).post(data::upsert_entity))
        // Docs
        .route(
            "/api/openapi.json",
            get(move || {
                let doc = Arc::clone(&doc);
                async move { Json(doc.as_ref().clone()) }
            }),
        )
        .layer(TimeoutLayer::new(timeout));

    // long-lived, so kept out of the timeout layer
    let status_routes = Router::new().route(&state.config.status_route(), get(status::status_stream));

    Router::new()
        .merge(api_routes)
        .merge(status_routes)
        .layer(middleware::from_fn(logging::log_request))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            let origins: Vec<_> = config
                .cors
                .origins
                .iter()
                .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
                .collect();
            cors = cors.allow_origin(origins);
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}
