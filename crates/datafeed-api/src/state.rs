use datafeed_status::StatusRegistry;
use datafeed_stream::BulkStreamService;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ApiResult;
use crate::store::MemoryStore;

/// Shared application state passed to all handlers
///
/// The status registry is the single owner of per-client status state; it
/// lives as long as the server.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: StatusRegistry,
    pub store: Arc<MemoryStore>,
    pub bulk: Arc<BulkStreamService<Arc<MemoryStore>>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<MemoryStore>) -> ApiResult<Self> {
        let registry = StatusRegistry::new(config.status.clone())?;
        let bulk = BulkStreamService::with_key(Arc::clone(&store), config.stream.key_spec());

        Ok(Self {
            config: Arc::new(config),
            registry,
            store,
            bulk: Arc::new(bulk),
        })
    }
}
