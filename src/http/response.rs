//! Response construction.
//!
//! # Responsibilities
//! - Give middlewares a writable response (`status`, headers, chunked body)
//! - Freeze it into a `FetchResponse` when `end` is called
//! - Buffer network responses into the same `FetchResponse` shape
//!
//! # Design Decisions
//! - Header keys are stored exactly as written; lookup is case-sensitive
//! - The deliverable is rebuilt on every `end`; writes after `end` only show
//!   up if `end` is called again
//! - `Content-Type` defaults to `text/plain` in the deliverable

use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::FetchResult;
use crate::http::body::JSON_CONTENT_TYPE;

const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A piece of body data for `ResponseRecord::write`.
///
/// `None` chunks (and JSON `null`) are ignored by the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk(Option<Bytes>);

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk(Some(Bytes::copy_from_slice(s.as_bytes())))
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk(Some(Bytes::from(s)))
    }
}

impl From<&[u8]> for Chunk {
    fn from(b: &[u8]) -> Self {
        Chunk(Some(Bytes::copy_from_slice(b)))
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(b: Vec<u8>) -> Self {
        Chunk(Some(Bytes::from(b)))
    }
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Chunk(Some(b))
    }
}

impl From<Value> for Chunk {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Chunk(None),
            Value::String(s) => s.into(),
            other => other.to_string().into(),
        }
    }
}

impl<T: Into<Chunk>> From<Option<T>> for Chunk {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or_default()
    }
}

macro_rules! chunk_from_display {
    ($($t:ty),*) => {
        $(impl From<$t> for Chunk {
            fn from(v: $t) -> Self {
                v.to_string().into()
            }
        })*
    };
}

chunk_from_display!(i32, i64, u16, u32, u64, usize, f64, bool, char);

/// Where a `FetchResponse` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Finalized by a middleware; no network call was made.
    Middleware,
    /// Returned by the HTTP transport.
    Network,
}

/// A fully buffered response, returned by every dispatch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL, for network responses.
    pub url: Option<Url>,
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl FetchResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Buffer a transport response.
    pub(crate) async fn from_network(res: reqwest::Response) -> Result<Self, reqwest::Error> {
        let url = res.url().clone();
        let status = res.status();
        let headers = res.headers().clone();

        // Not streamed: middlewares and callers see the whole body.
        let body = res.bytes().await?;

        Ok(Self {
            url: Some(url),
            status: status.as_u16(),
            status_text: status_text(status.as_u16()),
            headers,
            body,
            source: ResponseSource::Network,
        })
    }
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
        .to_string()
}

/// A response under construction by middlewares.
#[derive(Debug)]
pub struct ResponseRecord {
    status_code: u16,
    headers: Vec<(String, String)>,
    chunks: Vec<Bytes>,
    finalized: bool,
    deliverable: Option<FetchResponse>,
}

impl Default for ResponseRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseRecord {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: Vec::new(),
            chunks: Vec::new(),
            finalized: false,
            deliverable: None,
        }
    }

    /// Set the status code.
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Set a header, replacing an entry with exactly the same key.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Exact-key header lookup.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Append a chunk to the body buffer. `None` chunks are ignored.
    pub fn write(&mut self, chunk: impl Into<Chunk>) -> &mut Self {
        if let Chunk(Some(bytes)) = chunk.into() {
            self.chunks.push(bytes);
        }
        self
    }

    /// Finalize the response and build the deliverable.
    pub fn end(&mut self) -> &mut Self {
        self.finalized = true;
        self.deliverable = Some(self.build_deliverable());
        self
    }

    /// Write one last chunk, then finalize.
    pub fn end_with(&mut self, chunk: impl Into<Chunk>) -> &mut Self {
        self.write(chunk);
        self.end()
    }

    /// Serialize `data` as JSON and finalize.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> FetchResult<&mut Self> {
        let payload = serde_json::to_vec(data)?;
        self.set_header("Content-Type", JSON_CONTENT_TYPE);
        Ok(self.end_with(payload))
    }

    /// Objects and arrays are sent as JSON, anything else as a text chunk.
    pub fn send(&mut self, data: impl Into<Value>) -> FetchResult<&mut Self> {
        match data.into() {
            data @ (Value::Object(_) | Value::Array(_)) => self.json(&data),
            other => Ok(self.end_with(other)),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The frozen response, once `end` has been called.
    pub fn deliverable(&self) -> Option<&FetchResponse> {
        self.deliverable.as_ref()
    }

    pub(crate) fn into_deliverable(self) -> Option<FetchResponse> {
        if self.finalized {
            self.deliverable
        } else {
            None
        }
    }

    fn build_deliverable(&self) -> FetchResponse {
        let mut body = BytesMut::with_capacity(self.chunks.iter().map(Bytes::len).sum());
        for chunk in &self.chunks {
            body.extend_from_slice(chunk);
        }

        let mut headers = HeaderMap::with_capacity(self.headers.len() + 1);
        for (key, value) in &self.headers {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %key, "Skipping invalid response header"),
            }
        }

        if let Some(value) = self
            .get_header("Content-Type")
            .and_then(|v| HeaderValue::from_str(v).ok())
        {
            headers.insert(CONTENT_TYPE, value);
        } else if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }

        FetchResponse {
            url: None,
            status: self.status_code,
            status_text: status_text(self.status_code),
            headers,
            body: body.freeze(),
            source: ResponseSource::Middleware,
        }
    }
}
