use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SinkError;

/// Write side of a live status connection, supplied by the connection host
///
/// Writes are fire-and-forget: implementations must not block, and a
/// failed write is reported but never retried.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Sends the response status line and headers
    fn write_head(&self, status: u16, headers: &[(&'static str, &'static str)]) -> Result<(), SinkError>;

    /// Writes a chunk of the response body
    fn write(&self, chunk: &str) -> Result<(), SinkError>;

    /// Pushes buffered output to the client (needed behind compressing layers)
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Opts the connection out of idle/read timeouts; status connections are long-lived
    fn disable_idle_timeout(&self) {}

    /// Resolves once the client side of the connection has gone away
    async fn closed(&self);
}

/// Item delivered through a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Head {
        status: u16,
        headers: Vec<(String, String)>,
    },
    Chunk(String),
}

/// Status sink backed by an unbounded channel
///
/// The receiving half is turned into the response by the host; dropping it
/// is what closes the connection.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Frame>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, frame: Frame) -> Result<(), SinkError> {
        self.tx.send(frame).map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl StatusSink for ChannelSink {
    fn write_head(&self, status: u16, headers: &[(&'static str, &'static str)]) -> Result<(), SinkError> {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.send(Frame::Head { status, headers })
    }

    fn write(&self, chunk: &str) -> Result<(), SinkError> {
        self.send(Frame::Chunk(chunk.to_string()))
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.write_head(200, &[("Content-Type", "text/event-stream")]).unwrap();
        sink.write("\n").unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Frame::Head {
                status: 200,
                headers: vec![("Content-Type".to_string(), "text/event-stream".to_string())],
            })
        );
        assert_eq!(rx.recv().await, Some(Frame::Chunk("\n".to_string())));
    }

    #[tokio::test]
    async fn test_dropped_receiver_closes_sink() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);

        sink.closed().await;
        assert_eq!(sink.write("data"), Err(SinkError::Closed));
    }
}
