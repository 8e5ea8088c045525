//! Query API surface shared by the pipeline and the HTTP server.
//!
//! # Responsibilities
//! - Path constants for the cacheable query endpoints
//! - Header names and content types used for negotiation
//! - Response message types, encodable as JSON and protobuf
//!
//! # Design Decisions
//! - One message type per cacheable response kind
//! - JSON field names follow the camelCase wire format of the queriers

pub mod tempopb;

use axum::http::{HeaderMap, HeaderName, header};

pub const PATH_SEARCH: &str = "/api/search";
pub const PATH_SEARCH_TAGS: &str = "/api/search/tags";
pub const PATH_SEARCH_TAGS_V2: &str = "/api/v2/search/tags";
pub const PATH_SEARCH_TAG_VALUES_PATTERN: &str = r"^/api(/v2)?/search/tag/[^/]+/values";
pub const PATH_METRICS_QUERY_RANGE: &str = "/api/metrics/query_range";
pub const PATH_METRICS_QUERY_INSTANT: &str = "/api/metrics/query";

pub const HEADER_ACCEPT_JSON: &str = "application/json";
pub const HEADER_ACCEPT_PROTOBUF: &str = "application/protobuf";

/// Marker header telling clients whether a response came from the cache.
pub static HEADER_CACHE_STATUS: HeaderName = HeaderName::from_static("x-tempo-cache");
/// Tenant header; only used to partition cache keys.
pub static HEADER_TENANT_ID: HeaderName = HeaderName::from_static("x-scope-orgid");

pub const CACHE_HIT: &str = "HIT";
pub const CACHE_MISS: &str = "MISS";

/// Wire encoding of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    Json,
    Protobuf,
}

impl Representation {
    pub fn content_type(self) -> &'static str {
        match self {
            Representation::Json => HEADER_ACCEPT_JSON,
            Representation::Protobuf => HEADER_ACCEPT_PROTOBUF,
        }
    }

    /// Resolve the representation announced by a `content-type` header.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
        let mime = value.split(';').next().unwrap_or_default().trim();
        match mime {
            HEADER_ACCEPT_JSON => Some(Representation::Json),
            HEADER_ACCEPT_PROTOBUF => Some(Representation::Protobuf),
            _ => None,
        }
    }

    /// Representation requested by an `accept` header: the first listed
    /// media type the queriers can produce. `None` leaves it to the querier.
    pub fn from_accept(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .find_map(|media| match media.split(';').next().unwrap_or_default().trim() {
                HEADER_ACCEPT_JSON => Some(Representation::Json),
                HEADER_ACCEPT_PROTOBUF => Some(Representation::Protobuf),
                _ => None,
            })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Representation::Json => "json",
            Representation::Protobuf => "protobuf",
        }
    }

    /// Guess the representation of a body from its first byte.
    ///
    /// Only used for cache entries that carry no explicit tag.
    pub fn sniff(body: &[u8]) -> Self {
        if body.first() == Some(&b'{') {
            Representation::Json
        } else {
            Representation::Protobuf
        }
    }
}
