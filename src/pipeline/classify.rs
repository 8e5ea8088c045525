//! Response classification.
//!
//! # Design Decisions
//! - Pure function of the request path
//! - Tag values are checked before tags and tags before search, since the
//!   search path is a substring of both; the range path is checked before
//!   the instant path for the same reason

use std::sync::LazyLock;

use regex::Regex;

use crate::api;
use crate::cache::Role;
use crate::pipeline::request::PipelineRequest;

static TAG_VALUES_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(api::PATH_SEARCH_TAG_VALUES_PATTERN).expect("tag values pattern is a valid regex")
});

/// Closed set of response shapes the cache understands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Uncacheable = 0,
    Search = 1,
    Tags = 2,
    TagValues = 3,
    QueryRange = 4,
    QueryInstant = 5,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 6] = [
        ResponseKind::Uncacheable,
        ResponseKind::Search,
        ResponseKind::Tags,
        ResponseKind::TagValues,
        ResponseKind::QueryRange,
        ResponseKind::QueryInstant,
    ];

    /// Classify a pipeline request by its path.
    pub fn of(req: &PipelineRequest) -> Self {
        classify(Some(req.path()))
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| *k as u8 == value)
    }

    /// Short name used as the cache key prefix and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Uncacheable => "uncacheable",
            ResponseKind::Search => "search",
            ResponseKind::Tags => "tags",
            ResponseKind::TagValues => "tag-values",
            ResponseKind::QueryRange => "query-range",
            ResponseKind::QueryInstant => "query-instant",
        }
    }

    /// Cache role whose store holds responses of this kind.
    pub fn role(&self) -> Option<Role> {
        match self {
            ResponseKind::Uncacheable => None,
            ResponseKind::Search | ResponseKind::Tags | ResponseKind::TagValues => Some(Role::FrontendSearch),
            ResponseKind::QueryRange | ResponseKind::QueryInstant => Some(Role::FrontendMetrics),
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a request path to its response kind. `None` is uncacheable.
pub fn classify(path: Option<&str>) -> ResponseKind {
    let Some(path) = path else {
        return ResponseKind::Uncacheable;
    };

    if TAG_VALUES_PATH.is_match(path) {
        return ResponseKind::TagValues;
    }

    if path.contains(api::PATH_SEARCH_TAGS) || path.contains(api::PATH_SEARCH_TAGS_V2) {
        return ResponseKind::Tags;
    }

    if path.contains(api::PATH_SEARCH) {
        return ResponseKind::Search;
    }

    if path.contains(api::PATH_METRICS_QUERY_RANGE) {
        return ResponseKind::QueryRange;
    }

    if path.contains(api::PATH_METRICS_QUERY_INSTANT) {
        return ResponseKind::QueryInstant;
    }

    ResponseKind::Uncacheable
}
