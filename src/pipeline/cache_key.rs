//! Cache key derivation.
//!
//! A key is only produced for a closed time range that ended at least
//! `min_age` ago; answers about more recent data still change as spans are
//! ingested. Only `GET` requests are keyed. The digest covers the tenant,
//! the requested representation, the path and the query parameters in
//! sorted, decoded form, so parameter order and percent encoding never
//! matter while any real difference does.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Method, Request};
use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::api::{self, Representation};
use crate::pipeline::classify::ResponseKind;

/// Tenant used when the request carries no tenant header.
pub const DEFAULT_TENANT: &str = "single-tenant";

// Time parameters at or above this are nanoseconds, below it seconds.
const NANOS_THRESHOLD: u64 = 1_000_000_000_000;

#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    min_age: Duration,
}

impl CacheKeyBuilder {
    pub fn new(min_age: Duration) -> Self {
        Self { min_age }
    }

    /// Key for an HTTP request of the given kind; empty when not cacheable.
    pub fn key_for(&self, req: &Request<Body>, kind: ResponseKind, now: SystemTime) -> String {
        if *req.method() != Method::GET {
            return String::new();
        }

        let tenant = req
            .headers()
            .get(&api::HEADER_TENANT_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TENANT);

        let accept = Representation::from_accept(req.headers());

        self.derive(kind, req.uri().path(), req.uri().query(), tenant, accept, now)
    }

    /// `accept` is the representation the client asked for, `None` when it
    /// left the choice to the querier.
    pub fn derive(
        &self,
        kind: ResponseKind,
        path: &str,
        query: Option<&str>,
        tenant: &str,
        accept: Option<Representation>,
        now: SystemTime,
    ) -> String {
        if kind == ResponseKind::Uncacheable {
            return String::new();
        }

        let mut params: Vec<(String, String)> = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

        let Some((_, end)) = time_range(&params) else {
            return String::new();
        };

        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        if end.saturating_add(self.min_age.as_secs()) > now_secs {
            return String::new();
        }

        params.sort();

        let mut hasher = Sha256::new();
        write_field(&mut hasher, tenant);
        write_field(&mut hasher, accept.map_or("any", Representation::as_str));
        write_field(&mut hasher, path);
        for (name, value) in &params {
            write_field(&mut hasher, name);
            write_field(&mut hasher, value);
        }

        format!("{}:{:x}", kind.as_str(), hasher.finalize())
    }
}

// Length-prefixed so adjacent fields can never run into each other.
fn write_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Closed `start..=end` range in seconds, if the parameters carry one.
fn time_range(params: &[(String, String)]) -> Option<(u64, u64)> {
    let start = time_param(params, "start")?;
    let end = time_param(params, "end")?;
    (start <= end).then_some((start, end))
}

fn time_param(params: &[(String, String)], name: &str) -> Option<u64> {
    let (_, raw) = params.iter().find(|(k, _)| k == name)?;
    let value: u64 = raw.parse().ok()?;
    if value >= NANOS_THRESHOLD {
        Some(value / 1_000_000_000)
    } else {
        Some(value)
    }
}
