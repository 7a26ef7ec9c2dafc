pub mod header;
pub mod source;
pub mod service;
pub mod error;

pub use header::StreamHeader;
pub use source::{DataSet, DataSource};
pub use service::{BulkStreamService, NdjsonResponse, NDJSON_CONTENT_TYPE};
pub use error::{Result, StreamError};

pub use datafeed_ndjson::{EntityStream, KeySpec, LineStream};
