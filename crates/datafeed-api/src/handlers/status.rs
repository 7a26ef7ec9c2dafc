use axum::{
    body::Body,
    extract::State,
    response::Response,
};
use datafeed_status::{ChannelSink, Frame};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    error::{ApiError, ApiResult},
    handlers::ClientId,
    state::AppState,
};

/// Open the entity status event stream for the requesting client
///
/// The response stays open; dropping it (client disconnect) closes the
/// status connection. Mounted at `<event_prefix>/status`; the OpenAPI
/// document is rewritten to that route in `routes::api_doc`.
#[utoipa::path(
    get,
    path = "/status",
    params(
        ("x-session-id" = Option<String>, Header, description = "Client session id"),
        ("session_id" = Option<String>, Query, description = "Client session id, if no header is sent")
    ),
    responses(
        (status = 200, description = "Status event stream", content_type = "text/event-stream"),
        (status = 400, description = "Missing session id")
    ),
    tag = "status"
)]
pub async fn status_stream(
    State(state): State<Arc<AppState>>,
    ClientId(client_id): ClientId,
) -> ApiResult<Response> {
    let (sink, mut frames) = ChannelSink::new();
    state.registry.status_connect(&client_id, Arc::new(sink))?;

    // the preamble is queued synchronously by status_connect
    let Some(Frame::Head { status, headers }) = frames.recv().await else {
        return Err(ApiError::Internal);
    };

    let body = UnboundedReceiverStream::new(frames).filter_map(|frame| {
        std::future::ready(match frame {
            Frame::Chunk(chunk) => Some(Ok::<_, Infallible>(chunk)),
            Frame::Head { .. } => None,
        })
    });

    let mut response = Response::builder().status(status);
    for (name, value) in headers {
        response = response.header(name, value);
    }

    Ok(response.body(Body::from_stream(body))?)
}
