//! Caching stage.
//!
//! # Data Flow
//! ```text
//! request (cache key)
//!     → fetch entry ── hit ──→ decode envelope → scrub metrics → 200 + HIT
//!     └─ miss ─→ next stage → MISS → admission (status, size)
//!                                  → buffer body up to the item limit
//!                                  → reinstate body for caller
//!                                  → envelope → store (best effort)
//! ```
//!
//! # Design Decisions
//! - Cache fetch and store failures are absorbed; a broken cache only makes
//!   requests slower
//! - Fetch and store are bounded by the request deadline; running out of
//!   time is reported as `CacheError::Timeout` and handled like any other
//!   cache failure
//! - The store completes before the response is returned, nothing runs
//!   after the request

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderValue, Response, StatusCode};
use bytes::{Bytes, BytesMut};
use futures_util::{future, stream, StreamExt};

use crate::api::{self, Representation};
use crate::cache::{Cache, CacheError, CacheProvider, Role};
use crate::pipeline::classify::ResponseKind;
use crate::pipeline::entry::CacheEntry;
use crate::pipeline::error::PipelineError;
use crate::pipeline::request::{PipelineRequest, RequestContext};
use crate::pipeline::round_tripper::{BoxRoundTripper, Middleware, RoundTripper};
use crate::pipeline::scrub;

/// Store bound to a caching stage.
#[derive(Clone)]
pub enum CacheBinding {
    /// No store for the role; the stage passes requests straight through.
    Disabled,
    Enabled(Arc<dyn Cache>),
}

impl CacheBinding {
    pub fn resolve(provider: Option<&dyn CacheProvider>, role: Role) -> Self {
        let binding = match provider.and_then(|p| p.cache_for(role)) {
            Some(cache) => CacheBinding::Enabled(cache),
            None => CacheBinding::Disabled,
        };
        tracing::info!(role = %role, enabled = binding.is_enabled(), "Resolved frontend cache");
        binding
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheBinding::Enabled(_))
    }
}

/// Middleware inserting a caching stage for one role.
pub struct CachingMiddleware {
    binding: CacheBinding,
}

impl CachingMiddleware {
    pub fn new(provider: Option<&dyn CacheProvider>, role: Role) -> Self {
        Self {
            binding: CacheBinding::resolve(provider, role),
        }
    }

    pub fn with_binding(binding: CacheBinding) -> Self {
        Self { binding }
    }
}

impl Middleware for CachingMiddleware {
    fn wrap(&self, next: BoxRoundTripper) -> BoxRoundTripper {
        Arc::new(CachingWare {
            next,
            binding: self.binding.clone(),
        })
    }
}

struct CachingWare {
    next: BoxRoundTripper,
    binding: CacheBinding,
}

#[async_trait]
impl RoundTripper for CachingWare {
    async fn round_trip(&self, req: PipelineRequest) -> Result<Response<Body>, PipelineError> {
        let cache = match &self.binding {
            CacheBinding::Disabled => return self.next.round_trip(req).await,
            CacheBinding::Enabled(cache) => cache.clone(),
        };

        let key = req.cache_key().to_string();
        let context = *req.context();
        let kind = ResponseKind::of(&req);

        if !key.is_empty() {
            if let Some(entry) = fetch_entry(cache.as_ref(), &context, &key).await {
                tracing::debug!(key = %key, kind = %kind, "Frontend cache hit");
                return Ok(hit_response(entry, kind));
            }
        }

        let mut resp = self.next.round_trip(req).await?;
        resp.headers_mut()
            .insert(api::HEADER_CACHE_STATUS.clone(), HeaderValue::from_static(api::CACHE_MISS));

        if key.is_empty() || !resp.status().is_success() {
            return Ok(resp);
        }

        let max_item_size = cache.max_item_size();
        if max_item_size > 0 {
            if let Some(declared) = declared_length(&resp) {
                if declared > max_item_size as u64 {
                    tracing::debug!(key = %key, size = declared, max_item_size, "Response too large to cache");
                    return Ok(resp);
                }
            }
        }

        let (parts, body) = resp.into_parts();
        let bytes = match buffer_body(body, max_item_size).await.map_err(PipelineError::Buffer)? {
            Buffered::Complete(bytes) => bytes,
            Buffered::Overflow(body) => {
                tracing::debug!(key = %key, max_item_size, "Response too large to cache");
                return Ok(Response::from_parts(parts, body));
            }
        };
        let representation =
            Representation::from_headers(&parts.headers).unwrap_or_else(|| Representation::sniff(&bytes));
        let resp = Response::from_parts(parts, Body::from(bytes.clone()));

        if bytes.is_empty() {
            return Ok(resp);
        }

        let encoded = CacheEntry::new(kind, representation, bytes).encode();
        store_entry(cache.as_ref(), &context, key, encoded).await;
        Ok(resp)
    }
}

/// Outcome of reading a response body for the cache.
enum Buffered {
    Complete(Bytes),
    /// The entry would exceed the store's limit; the body is handed back
    /// with the chunks read so far in front of the unread remainder.
    Overflow(Body),
}

/// Read `body` chunk by chunk until it ends or its cache entry would exceed
/// `max_item_size` (`0` is unlimited).
async fn buffer_body(body: Body, max_item_size: usize) -> Result<Buffered, axum::Error> {
    let mut chunks = body.into_data_stream();
    let mut buffered = BytesMut::new();

    while let Some(chunk) = chunks.next().await {
        buffered.extend_from_slice(&chunk?);
        if max_item_size > 0 && CacheEntry::encoded_len(buffered.len()) > max_item_size {
            let head = stream::once(future::ready(Ok::<_, axum::Error>(buffered.freeze())));
            return Ok(Buffered::Overflow(Body::from_stream(head.chain(chunks))));
        }
    }

    Ok(Buffered::Complete(buffered.freeze()))
}

/// Run a cache call within the request deadline.
async fn bounded<T, F>(context: &RequestContext, call: F) -> Result<T, CacheError>
where
    F: std::future::Future<Output = Result<T, CacheError>>,
{
    context.run(call).await.map_err(|_| CacheError::Timeout)?
}

/// Fetch and decode the entry under `key`. Every failure is a miss.
async fn fetch_entry(cache: &dyn Cache, context: &RequestContext, key: &str) -> Option<CacheEntry> {
    let raw = match bounded(context, cache.fetch_key(key)).await {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache fetch failed");
            return None;
        }
    };

    match CacheEntry::decode(raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry");
            None
        }
    }
}

async fn store_entry(cache: &dyn Cache, context: &RequestContext, key: String, value: Bytes) {
    let keys = [key];
    let values = [value];
    match bounded(context, cache.store(&keys, &values)).await {
        Ok(()) => tracing::debug!(key = %keys[0], "Stored response in frontend cache"),
        Err(e) => tracing::warn!(key = %keys[0], error = %e, "Cache store failed"),
    }
}

fn hit_response(entry: CacheEntry, request_kind: ResponseKind) -> Response<Body> {
    let kind = entry.kind.unwrap_or(request_kind);
    let representation = entry.representation;

    let body = match scrub::scrub(&entry.payload, kind, representation) {
        Ok(scrubbed) => scrubbed,
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, "Serving cached response without scrubbing metrics");
            entry.payload
        }
    };

    let len = body.len();
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = StatusCode::OK;
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(representation.content_type()));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(api::HEADER_CACHE_STATUS.clone(), HeaderValue::from_static(api::CACHE_HIT));
    resp
}

/// Length announced by the response, if known before reading the body.
fn declared_length(resp: &Response<Body>) -> Option<u64> {
    resp.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| resp.body().size_hint().exact())
}
