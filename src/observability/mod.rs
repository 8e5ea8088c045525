//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (key, kind, role, status, error)
//!     → tower-http spans per HTTP request, tagged with x-request-id
//!
//! Consumers:
//!     → logging.rs (fmt subscriber to stdout)
//! ```
//!
//! # Design Decisions
//! - Cache hits, misses and skips log at debug; absorbed failures at warn
//! - RUST_LOG wins over the configured level

pub mod logging;

pub use logging::init_logging;
