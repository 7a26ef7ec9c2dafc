use datafeed_ndjson::{KeyFn, KeySpec, LineStream, NdjsonEncoder};

use crate::error::Result;
use crate::source::DataSource;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Response produced by [`BulkStreamService::serve`]
///
/// The host writes `status` and `content_type`, then pipes `body` to the
/// client. Body errors are transport errors of the transfer.
pub struct NdjsonResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: LineStream,
}

/// Serves a data source as an NDJSON stream: the header line, then one
/// `[key, entity]` row per entity
pub struct BulkStreamService<S> {
    source: S,
    key: KeyFn,
}

impl<S: DataSource> BulkStreamService<S> {
    /// Service keyed by the default `_id` property
    pub fn new(source: S) -> Self {
        Self::with_key(source, KeySpec::default())
    }

    pub fn with_key(source: S, key: KeySpec) -> Self {
        Self {
            source,
            key: key.resolve(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn serve(&self, request: S::Request) -> Result<NdjsonResponse> {
        let data = self.source.get_data(request).await?;
        let header = serde_json::to_value(&data.header)?;

        tracing::debug!(count = data.header.count, "Streaming data set");

        let encoder = NdjsonEncoder::with_key_fn(self.key.clone()).prefix(header);

        Ok(NdjsonResponse {
            status: 200,
            content_type: NDJSON_CONTENT_TYPE,
            body: encoder.encode(data.entities),
        })
    }
}
