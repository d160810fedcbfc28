//! Dispatch orchestration.
//!
//! # Responsibilities
//! - Compose the URL and normalize the request
//! - Run the middleware chain over a fresh response record
//! - Return the middleware response, or make exactly one network call
//!
//! # Design Decisions
//! - The registry is snapshotted when a dispatch starts
//! - The network call uses the request record as middlewares left it
//! - Transport errors are returned as-is; no retries at this layer

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{FetchError, FetchResult};
use crate::http::body::WireBody;
use crate::http::{
    compose, FetchInit, FetchInput, FetchResponse, RequestDefaults, RequestRecord, ResponseRecord,
};
use crate::middleware::engine::Chain;
use crate::middleware::{Middleware, MiddlewareStack, RequestIdMiddleware};
use crate::observability::metrics::{self, Outcome};

/// HTTP client with an interceptor pipeline in front of `reqwest`.
///
/// Cloning is cheap; clones share the transport and the middleware registry.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    stack: Arc<MiddlewareStack>,
    defaults: Arc<RequestDefaults>,
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    /// A client with no middlewares and no defaults.
    pub fn new() -> Self {
        Self::with_transport(reqwest::Client::new())
    }

    /// A client dispatching through the given `reqwest` client.
    pub fn with_transport(http: reqwest::Client) -> Self {
        Self {
            http,
            stack: Arc::new(MiddlewareStack::new()),
            defaults: Arc::new(RequestDefaults::default()),
        }
    }

    /// Build a client from configuration.
    ///
    /// The config is expected to have passed `validate_config`; invalid
    /// values are still reported rather than ignored.
    pub fn from_config(config: &ClientConfig) -> FetchResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|base| {
                Url::parse(base).map_err(|source| FetchError::InvalidUrl {
                    url: base.to_string(),
                    source,
                })
            })
            .transpose()?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            headers.insert(name, header_value(value)?);
        }

        let client = Self {
            http: reqwest::Client::new(),
            stack: Arc::new(MiddlewareStack::new()),
            defaults: Arc::new(RequestDefaults { base_url, headers }),
        };

        if config.request_id.enabled {
            client
                .stack
                .push(RequestIdMiddleware::with_header(&config.request_id.header)?);
        }

        tracing::debug!(
            base_url = ?config.base_url,
            middlewares = client.stack.len(),
            "Client configured"
        );
        Ok(client)
    }

    /// Replace the transport, keeping middlewares and defaults.
    pub fn transport(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Register a middleware and return the client, for chained setup.
    pub fn with<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.stack.push(middleware);
        self
    }

    /// The shared middleware registry.
    pub fn middleware(&self) -> &Arc<MiddlewareStack> {
        &self.stack
    }

    /// `GET` shorthand.
    pub async fn get(&self, input: impl Into<FetchInput>) -> FetchResult<FetchResponse> {
        self.fetch(input, FetchInit::new()).await
    }

    /// Dispatch one request through the middleware chain.
    pub async fn fetch(
        &self,
        input: impl Into<FetchInput>,
        init: FetchInit,
    ) -> FetchResult<FetchResponse> {
        let start = Instant::now();
        let input = input.into();

        let composed = compose(input.as_str(), init.query.as_ref());
        let mut request = RequestRecord::normalize_with(&composed, init, &self.defaults)?;
        let mut response = ResponseRecord::new();
        let method = request.method.clone();

        let chain = Chain::new(self.stack.snapshot());
        tracing::debug!(
            method = %method,
            url = %request.target(),
            middlewares = chain.len(),
            "Dispatching request"
        );

        if let Err(e) = chain.run(&mut request, &mut response).await {
            tracing::warn!(method = %method, error = %e, "Dispatch aborted by middleware chain");
            metrics::record_dispatch(&method, Outcome::Error, start);
            return Err(e);
        }

        if let Some(deliverable) = response.into_deliverable() {
            tracing::debug!(status = deliverable.status, "Response finalized by middleware");
            metrics::record_dispatch(&method, Outcome::Middleware, start);
            return Ok(deliverable);
        }

        let result = self.send(request).await;
        let outcome = if result.is_ok() {
            Outcome::Network
        } else {
            Outcome::Error
        };
        metrics::record_dispatch(&method, outcome, start);
        result
    }

    /// The network fall-through: one transport call, buffered.
    async fn send(&self, request: RequestRecord) -> FetchResult<FetchResponse> {
        let (method, target, headers, wire) = request.into_parts();

        let builder = self.http.request(method, target).headers(headers);
        let builder = match wire {
            WireBody::Empty => builder,
            WireBody::Text(text) => builder.body(text),
            WireBody::Bytes(bytes) => builder.body(bytes),
            WireBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Network request failed");
            FetchError::Transport(e)
        })?;
        tracing::debug!(status = response.status().as_u16(), url = %response.url(), "Network response");

        Ok(FetchResponse::from_network(response).await?)
    }
}

fn header_value(value: &str) -> FetchResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(value.to_string()))
}
