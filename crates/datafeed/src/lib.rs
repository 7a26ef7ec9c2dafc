//! # Datafeed
//!
//! Building blocks for services that hand clients whole entity collections
//! and then tell them when those collections change.
//!
//! - **Bulk transfer**: a collection is streamed as NDJSON, a header line
//!   followed by one `[key, entity]` row per entity.
//! - **Status events**: every client keeps one server-sent event stream
//!   open; when a timestamp the client loaded is superseded, it receives an
//!   event naming the entity type and the newer timestamps. Bursts of
//!   changes are coalesced into one event.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use datafeed::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = StatusRegistry::new(StatusConfig::new("/svc"))?;
//!
//!     // The client loaded suppliers as of time 100
//!     registry.register_entity_type(
//!         "client-1",
//!         "supplier",
//!         &Timestamps::from([("supplier".to_string(), 100)]),
//!     );
//!
//!     let (sink, mut frames) = ChannelSink::new();
//!     registry.status_connect("client-1", Arc::new(sink))?;
//!
//!     // A write elsewhere supersedes it
//!     registry.record_timestamp_changes(&Timestamps::from([("supplier".to_string(), 200)]));
//!
//!     while let Some(frame) = frames.recv().await {
//!         if let Frame::Chunk(chunk) = frame {
//!             print!("{}", chunk);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`datafeed-ndjson`**: NDJSON row encoder and key functions
//! - **`datafeed-status`**: status registry and the event-stream protocol
//! - **`datafeed-stream`**: bulk stream service over a pluggable data source
//!
//! The `datafeed-api` crate wires all three into an axum server.

pub mod prelude;

pub use datafeed_ndjson::{
    encode_line, make_key_fn, EntityStream, KeyFn, KeySpec, LineStream, NdjsonEncoder,
    NdjsonError, DEFAULT_KEY_PROPERTY,
};

pub use datafeed_status::{
    ChannelSink, Frame, SinkError, StatusConfig, StatusData, StatusError, StatusNotification,
    StatusRegistry, StatusSink, Timestamps, EVENT_STREAM_HEADERS, EVENT_STREAM_STATUS,
};

pub use datafeed_stream::{
    BulkStreamService, DataSet, DataSource, NdjsonResponse, StreamError, StreamHeader,
    NDJSON_CONTENT_TYPE,
};
