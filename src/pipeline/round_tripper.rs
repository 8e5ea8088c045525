//! Stage and middleware abstractions.
//!
//! A [`RoundTripper`] turns a request into a response. A [`Middleware`]
//! takes the next round tripper and returns a new one exposing the same
//! interface, so stages stack without knowing what they wrap.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;

use crate::pipeline::error::PipelineError;
use crate::pipeline::request::PipelineRequest;

/// A single request-processing stage.
#[async_trait]
pub trait RoundTripper: Send + Sync {
    async fn round_trip(&self, req: PipelineRequest) -> Result<Response<Body>, PipelineError>;
}

pub type BoxRoundTripper = Arc<dyn RoundTripper>;

/// Wraps a stage into a new stage.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: BoxRoundTripper) -> BoxRoundTripper;
}

/// Adapts a closure into a [`Middleware`].
pub struct MiddlewareFn<F>(F);

impl<F> MiddlewareFn<F>
where
    F: Fn(BoxRoundTripper) -> BoxRoundTripper + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(BoxRoundTripper) -> BoxRoundTripper + Send + Sync,
{
    fn wrap(&self, next: BoxRoundTripper) -> BoxRoundTripper {
        (self.0)(next)
    }
}

/// Adapts an async closure into a [`RoundTripper`].
pub struct RoundTripperFn<F>(F);

impl<F, Fut> RoundTripperFn<F>
where
    F: Fn(PipelineRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Body>, PipelineError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> RoundTripper for RoundTripperFn<F>
where
    F: Fn(PipelineRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Body>, PipelineError>> + Send + 'static,
{
    async fn round_trip(&self, req: PipelineRequest) -> Result<Response<Body>, PipelineError> {
        (self.0)(req).await
    }
}

/// An ordered group of middleware that is itself a middleware.
///
/// The first element ends up outermost. Nesting chains is equivalent to
/// flattening them.
#[derive(Clone, Default)]
pub struct Chain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl Middleware for Chain {
    fn wrap(&self, next: BoxRoundTripper) -> BoxRoundTripper {
        build(&self.middleware, next)
    }
}

/// Stack `middleware` on top of `terminal`; `middleware[0]` sees requests first.
pub fn build(middleware: &[Arc<dyn Middleware>], terminal: BoxRoundTripper) -> BoxRoundTripper {
    middleware
        .iter()
        .rev()
        .fold(terminal, |next, m| m.wrap(next))
}
