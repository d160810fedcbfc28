//! Request normalization.
//!
//! # Responsibilities
//! - Turn a URL plus `FetchInit` options into a mutable `RequestRecord`
//! - Resolve the method, merge headers, encode the body
//! - Derive the path, protocol and decoded query from the composed URL
//!
//! # Design Decisions
//! - `protocol`, `url`, `query` and `body` are only changed through setters that
//!   re-derive their dependents, so middlewares cannot desynchronize them
//! - The query is decoded exactly once per URL change
//! - Default headers are applied first; caller headers replace them by name

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::http::body::{self, FormParams, Payload, RequestBody, WireBody};
use crate::http::compose::{path_and_query, protocol_of, resolve};
use crate::http::query;

/// Caller options for a single dispatch.
#[derive(Debug, Default)]
pub struct FetchInit {
    pub method: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub query: Option<Value>,
}

impl FetchInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(RequestBody::text(text))
    }

    /// Send a structured value as JSON.
    pub fn json(self, value: Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    /// Send pre-encoded URL parameters.
    pub fn form(self, params: FormParams) -> Self {
        self.body(RequestBody::Form(params))
    }

    pub fn multipart(self, form: reqwest::multipart::Form) -> Self {
        self.body(RequestBody::Multipart(form))
    }

    /// Query object merged into the URL before dispatch.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }
}

/// Anything that names a dispatch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchInput(String);

impl FetchInput {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FetchInput {
    fn from(s: &str) -> Self {
        FetchInput(s.to_string())
    }
}

impl From<String> for FetchInput {
    fn from(s: String) -> Self {
        FetchInput(s)
    }
}

impl From<&String> for FetchInput {
    fn from(s: &String) -> Self {
        FetchInput(s.clone())
    }
}

impl From<Url> for FetchInput {
    fn from(url: Url) -> Self {
        FetchInput(url.into())
    }
}

impl From<&Url> for FetchInput {
    fn from(url: &Url) -> Self {
        FetchInput(url.as_str().to_string())
    }
}

impl From<&reqwest::Request> for FetchInput {
    fn from(req: &reqwest::Request) -> Self {
        FetchInput(req.url().as_str().to_string())
    }
}

/// Client-level values applied to every normalized request.
#[derive(Debug, Clone, Default)]
pub struct RequestDefaults {
    pub base_url: Option<Url>,
    pub headers: HeaderMap,
}

/// One outbound call, as seen and mutated by middlewares.
#[derive(Debug)]
pub struct RequestRecord {
    /// Uppercase request method.
    pub method: Method,
    pub headers: HeaderMap,
    protocol: String,
    url: String,
    query: Map<String, Value>,
    body: Payload,
    target: Url,
    wire: WireBody,
}

impl RequestRecord {
    /// Normalize an absolute, already composed URL with no client defaults.
    pub fn normalize(composed: &str, init: FetchInit) -> FetchResult<Self> {
        Self::normalize_with(composed, init, &RequestDefaults::default())
    }

    /// Normalize a composed URL, applying client defaults.
    pub fn normalize_with(
        composed: &str,
        init: FetchInit,
        defaults: &RequestDefaults,
    ) -> FetchResult<Self> {
        let method = resolve_method(init.method.as_deref(), init.body.is_some())?;

        let mut headers = defaults.headers.clone();
        headers.extend(caller_headers(&init.headers)?);

        let target = resolve(composed, defaults.base_url.as_ref())?;
        let protocol = derive_protocol(composed, &target);

        let wire = body::encode(init.body, &mut headers)?;
        let body = body::decode(&wire, &headers);

        Ok(Self {
            method,
            protocol,
            headers,
            url: path_and_query(&target),
            query: query::parse(target.query().unwrap_or_default()),
            body,
            target,
            wire,
        })
    }

    /// Scheme token, e.g. `https`. Changes only through `set_url`.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Path and query string, e.g. `/users?id=1`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query string decoded into a nested map.
    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    /// Decoded body view.
    pub fn body(&self) -> &Payload {
        &self.body
    }

    /// Absolute URL the network call will target.
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Point the request somewhere else.
    ///
    /// `url` may be a path (`/other?x=1`), joined onto the current origin, or
    /// an absolute URL. The decoded query is re-derived from the result.
    pub fn set_url(&mut self, url: &str) -> FetchResult<()> {
        let target = self.target.join(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        self.protocol = derive_protocol(url, &target);
        self.url = path_and_query(&target);
        self.query = query::parse(target.query().unwrap_or_default());
        self.target = target;
        Ok(())
    }

    /// Replace the body, re-running encoding and decoding.
    pub fn set_body(&mut self, body: Option<RequestBody>) -> FetchResult<()> {
        self.wire = body::encode(body, &mut self.headers)?;
        self.body = body::decode(&self.wire, &self.headers);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Method, Url, HeaderMap, WireBody) {
        (self.method, self.target, self.headers, self.wire)
    }
}

fn resolve_method(explicit: Option<&str>, has_body: bool) -> FetchResult<Method> {
    match explicit {
        Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(method.to_string())),
        None if has_body => Ok(Method::POST),
        None => Ok(Method::GET),
    }
}

fn caller_headers(pairs: &[(String, String)]) -> FetchResult<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| FetchError::InvalidHeader(format!("{name}: {value}")))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

fn derive_protocol(raw: &str, parsed: &Url) -> String {
    protocol_of(raw)
        .or(Some(parsed.scheme()).filter(|s| !s.is_empty()))
        .unwrap_or("http")
        .to_string()
}
