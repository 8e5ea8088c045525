//! Query frontend with a synchronous response cache.
//!
//! Queries arrive over HTTP, are classified by path, keyed, and sent
//! through a pipeline of stages ending at a querier. Search and metrics
//! responses for time ranges that can no longer change are cached per role,
//! with per-request execution metrics scrubbed on replay.

pub mod api;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;

pub use config::schema::FrontendConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
