//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     CacheConfig
//!     → provider.rs (one store per role, or none when disabled)
//!     → pipeline caching stage binds the store for its role
//!
//! Per request:
//!     caching stage → store.rs (fetch_key / store)
//!     → memory.rs (bounded in-process map) or any other Cache impl
//! ```
//!
//! # Design Decisions
//! - Stores are best-effort: callers absorb every error
//! - Values are opaque bytes; the pipeline owns their layout
//! - Eviction, TTLs and replication belong to the store, not the pipeline

pub mod memory;
pub mod provider;
pub mod store;

pub use memory::InMemoryCache;
pub use provider::{CacheProvider, ConfiguredProvider, Role};
pub use store::{Cache, CacheError};
