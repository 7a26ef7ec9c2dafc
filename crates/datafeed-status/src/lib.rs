//! Entity status notifications.
//!
//! Clients register the entity types they hold, each with a vector of named
//! timestamps. Timestamp changes reported through
//! [`StatusRegistry::record_timestamp_changes`] are coalesced per
//! (client, entity type) and pushed to the client's Server-Sent-Events
//! connection as one `<prefix>/<entity type>` event.

pub mod config;
pub mod error;
mod executor;
pub mod protocol;
pub mod registry;
pub mod sink;
mod state;

pub use config::StatusConfig;
pub use error::{Result, SinkError, StatusError};
pub use protocol::{StatusData, StatusNotification, EVENT_STREAM_HEADERS, EVENT_STREAM_STATUS};
pub use registry::StatusRegistry;
pub use sink::{ChannelSink, Frame, StatusSink};
pub use state::Timestamps;
