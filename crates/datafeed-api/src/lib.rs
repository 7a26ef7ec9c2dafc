//! HTTP surface of the datafeed service: bulk NDJSON transfer of entity
//! collections and the per-client status event stream that tells clients
//! when a collection they loaded has changed.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
pub mod timestamps;

pub use routes::build_router;
