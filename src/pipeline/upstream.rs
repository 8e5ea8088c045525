//! Terminal stage forwarding queries to a querier.

use std::str::FromStr;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, InvalidUri, Scheme};
use axum::http::{header, Request, Response, Uri, Version};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::pipeline::error::PipelineError;
use crate::pipeline::request::PipelineRequest;
use crate::pipeline::round_tripper::RoundTripper;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamConfigError {
    #[error("invalid querier url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported querier url '{0}'")]
    Unsupported(String),

    #[error("invalid querier authority: {0}")]
    Authority(#[from] InvalidUri),
}

/// Sends each request to `querier_url` and returns the querier's response
/// unchanged.
#[derive(Clone)]
pub struct QuerierRoundTripper {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    /// Prefix prepended to every forwarded path, without a trailing slash.
    base_path: String,
}

impl QuerierRoundTripper {
    pub fn new(querier_url: &str) -> Result<Self, UpstreamConfigError> {
        let url = Url::parse(querier_url)?;
        let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
            return Err(UpstreamConfigError::Unsupported(querier_url.to_string()));
        };
        if url.scheme() != "http" {
            return Err(UpstreamConfigError::Unsupported(querier_url.to_string()));
        }

        let authority = Authority::from_str(&format!("{host}:{port}"))?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    fn target(&self, uri: &Uri) -> Result<Uri, PipelineError> {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl RoundTripper for QuerierRoundTripper {
    async fn round_trip(&self, req: PipelineRequest) -> Result<Response<Body>, PipelineError> {
        let (request, context) = req.into_parts();
        let (mut parts, body) = request.into_parts();

        parts.uri = self.target(&parts.uri)?;
        parts.version = Version::HTTP_11;
        parts.headers.remove(header::HOST);

        tracing::debug!(uri = %parts.uri, method = %parts.method, "Forwarding to querier");

        let outbound = Request::from_parts(parts, body);
        let response = match context.run(self.client.request(outbound)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(querier = %self.authority, "Querier request exceeded deadline");
                return Err(PipelineError::Timeout);
            }
        };

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
