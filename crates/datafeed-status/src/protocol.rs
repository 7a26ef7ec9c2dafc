use serde::Serialize;

use crate::error::Result;
use crate::sink::StatusSink;
use crate::state::Timestamps;

/// Status of the event-stream response
pub const EVENT_STREAM_STATUS: u16 = 200;

/// Headers of the event-stream response
pub const EVENT_STREAM_HEADERS: [(&str, &str); 3] = [
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache, no-transform"),
    ("Connection", "keep-alive"),
];

/// Payload of a status event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub entity_type: String,
    pub superseded: Timestamps,
}

/// One status event: `event`, `id` and `data` lines followed by a blank line
#[derive(Debug, Clone, PartialEq)]
pub struct StatusNotification {
    pub event: String,
    pub id: u64,
    pub data: StatusData,
}

impl StatusNotification {
    pub fn new(event_prefix: &str, entity_type: &str, id: u64, superseded: Timestamps) -> Self {
        Self {
            event: format!("{}/{}", event_prefix, entity_type),
            id,
            data: StatusData {
                entity_type: entity_type.to_string(),
                superseded,
            },
        }
    }

    /// Serializes the event as a complete SSE block
    pub fn encode(&self) -> Result<String> {
        let data = serde_json::to_string(&self.data)?;
        Ok(format!("event: {}\nid: {}\ndata: {}\n\n", self.event, self.id, data))
    }
}

/// Writes the response head and the opening blank line
pub fn write_preamble(sink: &dyn StatusSink) -> Result<()> {
    sink.write_head(EVENT_STREAM_STATUS, &EVENT_STREAM_HEADERS)?;
    sink.write("\n")?;
    Ok(())
}

/// Writes one notification as a single chunk, then flushes the sink
pub fn write_notification(sink: &dyn StatusSink, notification: &StatusNotification) -> Result<()> {
    let block = notification.encode()?;
    sink.write(&block)?;
    sink.flush()?;
    Ok(())
}
