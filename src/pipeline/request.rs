//! The request object that flows through the pipeline.

use std::future::Future;

use axum::body::Body;
use axum::http::Request;
use tokio::time::{error::Elapsed, Instant};

/// Deadline carried alongside a request.
///
/// Cancellation is future drop: when the inbound request goes away, every
/// in-flight cache and upstream call goes with it. The deadline additionally
/// bounds individual calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run `fut` to completion or until the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut).await,
            None => Ok(fut.await),
        }
    }
}

/// An inbound query on its way through the pipeline.
#[derive(Debug)]
pub struct PipelineRequest {
    request: Request<Body>,
    context: RequestContext,
    cache_key: String,
}

impl PipelineRequest {
    /// Wrap an HTTP request with no deadline and no cache key.
    pub fn new(request: Request<Body>) -> Self {
        Self {
            request,
            context: RequestContext::default(),
            cache_key: String::new(),
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.context = RequestContext::with_deadline(deadline);
        self
    }

    /// Key under which the response may be cached. Empty when not cacheable.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn http_request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn http_request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    pub fn into_parts(self) -> (Request<Body>, RequestContext) {
        (self.request, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder() {
        let req = PipelineRequest::new(
            Request::builder()
                .uri("/api/search?tags=foo")
                .body(Body::empty())
                .unwrap(),
        )
        .with_cache_key("k1");

        assert_eq!(req.cache_key(), "k1");
        assert_eq!(req.path(), "/api/search");
        assert!(req.context().deadline().is_none());
    }

    #[tokio::test]
    async fn test_context_without_deadline_runs_to_completion() {
        let ctx = RequestContext::default();
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_context_deadline_elapses() {
        let ctx = RequestContext::with_deadline(Instant::now() + Duration::from_millis(20));
        let result = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(result.is_err());
        assert!(ctx.deadline().is_some_and(|d| d <= Instant::now()));
    }
}
