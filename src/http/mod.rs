//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → query handler (classify, derive cache key, attach deadline)
//!     → search | metrics | passthrough pipeline
//!     → response.rs (pipeline errors → status codes)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use server::{HttpServer, Pipelines};
