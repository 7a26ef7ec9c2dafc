//! Prelude module for convenient imports
//!
//! ```rust
//! use datafeed::prelude::*;
//! ```

pub use crate::{
    KeySpec, NdjsonEncoder,
    ChannelSink, Frame, StatusConfig, StatusRegistry, StatusSink, Timestamps,
    BulkStreamService, DataSet, DataSource, StreamHeader,
};
