use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;

use datafeed_ndjson::EntityStream;

use crate::header::StreamHeader;

/// Result of a data source lookup: a header and the entities to stream
pub struct DataSet {
    pub header: StreamHeader,
    /// Consumed exactly once; must end for the transfer to finish
    pub entities: EntityStream,
}

impl DataSet {
    pub fn new<S>(header: StreamHeader, entities: S) -> Self
    where
        S: Stream<Item = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            header,
            entities: Box::pin(entities),
        }
    }
}

/// Supplies the data served by a [`crate::BulkStreamService`]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Request context handed over by the host
    type Request: Send;

    async fn get_data(&self, request: Self::Request) -> anyhow::Result<DataSet>;
}

#[async_trait]
impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    type Request = T::Request;

    async fn get_data(&self, request: Self::Request) -> anyhow::Result<DataSet> {
        (**self).get_data(request).await
    }
}
