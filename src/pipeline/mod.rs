//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! http server
//!     → request.rs (PipelineRequest: http request + deadline + cache key)
//!     → round_tripper.rs (chain of stages, outermost first)
//!     → caching.rs (fetch → hit | delegate → admit → store)
//!         → classify.rs (path → ResponseKind)
//!         → entry.rs (envelope: representation + kind + payload)
//!         → scrub.rs (clear per-request metrics on cached bodies)
//!     → upstream.rs (forward to querier)
//! ```
//!
//! # Design Decisions
//! - Every stage has the same interface and only sees the request/response
//! - Cache failures degrade to misses and never fail a request
//! - No stage spawns work that outlives the request

pub mod cache_key;
pub mod caching;
pub mod classify;
pub mod entry;
pub mod error;
pub mod request;
pub mod round_tripper;
pub mod scrub;
pub mod upstream;

pub use cache_key::CacheKeyBuilder;
pub use caching::{CacheBinding, CachingMiddleware};
pub use classify::{classify, ResponseKind};
pub use error::PipelineError;
pub use request::{PipelineRequest, RequestContext};
pub use round_tripper::{build, BoxRoundTripper, Chain, Middleware, MiddlewareFn, RoundTripper, RoundTripperFn};
pub use scrub::{scrub, MetricsBearing, ScrubError};
pub use upstream::{QuerierRoundTripper, UpstreamConfigError};
