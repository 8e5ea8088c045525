//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the query and readiness handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Build one pipeline per cache role plus a pass-through pipeline
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::{CacheProvider, ConfiguredProvider, Role};
use crate::config::FrontendConfig;
use crate::pipeline::{
    build, classify, BoxRoundTripper, CacheKeyBuilder, CachingMiddleware, Middleware, PipelineError,
    PipelineRequest, QuerierRoundTripper, ResponseKind, RoundTripper, UpstreamConfigError,
};

/// The request pipelines, one per cache role.
#[derive(Clone)]
pub struct Pipelines {
    pub search: BoxRoundTripper,
    pub metrics: BoxRoundTripper,
    /// Uncacheable requests go straight to the querier.
    pub passthrough: BoxRoundTripper,
}

impl Pipelines {
    pub fn new(provider: Option<&dyn CacheProvider>, upstream: BoxRoundTripper) -> Self {
        let search: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(CachingMiddleware::new(provider, Role::FrontendSearch))];
        let metrics: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(CachingMiddleware::new(provider, Role::FrontendMetrics))];

        Self {
            search: build(&search, upstream.clone()),
            metrics: build(&metrics, upstream.clone()),
            passthrough: upstream,
        }
    }

    pub fn for_kind(&self, kind: ResponseKind) -> &BoxRoundTripper {
        match kind.role() {
            Some(Role::FrontendSearch) => &self.search,
            Some(Role::FrontendMetrics) => &self.metrics,
            None => &self.passthrough,
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipelines: Pipelines,
    pub key_builder: CacheKeyBuilder,
    pub request_timeout: Duration,
}

/// HTTP server for the query frontend.
pub struct HttpServer {
    router: Router,
    config: FrontendConfig,
}

impl HttpServer {
    /// Create a server forwarding to the configured querier, with in-memory
    /// caches for every enabled role.
    pub fn new(config: FrontendConfig) -> Result<Self, UpstreamConfigError> {
        let provider = ConfiguredProvider::from_config(&config.cache);
        let upstream = QuerierRoundTripper::new(&config.upstream.querier_url)?;
        Ok(Self::from_parts(config, Arc::new(provider), Arc::new(upstream)))
    }

    /// Create a server from an explicit cache provider and terminal stage.
    pub fn from_parts(config: FrontendConfig, provider: Arc<dyn CacheProvider>, upstream: BoxRoundTripper) -> Self {
        let state = AppState {
            pipelines: Pipelines::new(Some(provider.as_ref()), upstream),
            key_builder: CacheKeyBuilder::new(Duration::from_secs(config.cache.min_age_secs)),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &FrontendConfig, state: AppState) -> Router {
        Router::new()
            .route("/ready", get(ready_handler))
            .route("/api/{*path}", any(query_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving or for driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            querier = %self.config.upstream.querier_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }
}

async fn ready_handler() -> &'static str {
    "ready"
}

/// Classify the query, key it and hand it to the pipeline for its role.
async fn query_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response<Body>, PipelineError> {
    let kind = classify(Some(request.uri().path()));
    let key = state.key_builder.key_for(&request, kind, SystemTime::now());

    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        kind = %kind,
        cacheable = !key.is_empty(),
        "Dispatching query"
    );

    let req = PipelineRequest::new(request)
        .with_cache_key(key)
        .with_deadline(Instant::now() + state.request_timeout);

    state.pipelines.for_kind(kind).round_trip(req).await
}
