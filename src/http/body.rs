//! Request body encoding and decoding.
//!
//! # Responsibilities
//! - Classify caller payloads (text, bytes, structured, form, multipart)
//! - Encode them for the wire, inferring `Content-Type` where missing
//! - Decode a structured view for middlewares from the encoded payload
//!
//! # Design Decisions
//! - Payload kinds are explicit enum variants, never sniffed at runtime
//! - Decoding is best-effort: malformed JSON or forms degrade to raw text
//! - An explicit `Content-Type` from the caller is never overwritten

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart;
use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::FetchResult;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// An already URL-encoded parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a=1&b=2` style input.
    pub fn parse(input: &str) -> Self {
        form_urlencoded::parse(input.as_bytes())
            .into_owned()
            .collect()
    }

    /// Append a key/value pair.
    pub fn append(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Serialize to `application/x-www-form-urlencoded` text.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A request body as supplied by the caller.
#[derive(Debug)]
pub enum RequestBody {
    /// Text, sent as-is.
    Text(String),
    /// Binary payload, sent as-is.
    Bytes(Bytes),
    /// Structured value, serialized to JSON.
    Json(Value),
    /// URL-encoded parameters, sent as-is.
    Form(FormParams),
    /// Opaque multipart form, handed to the transport untouched.
    Multipart(multipart::Form),
}

impl RequestBody {
    /// Serialize any `Serialize` value into a structured body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> FetchResult<Self> {
        Ok(RequestBody::Json(serde_json::to_value(value)?))
    }

    pub fn text(text: impl Into<String>) -> Self {
        RequestBody::Text(text.into())
    }

    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        RequestBody::Bytes(bytes.into())
    }

    pub fn form(params: FormParams) -> Self {
        RequestBody::Form(params)
    }

    pub fn multipart(form: multipart::Form) -> Self {
        RequestBody::Multipart(form)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Text(s.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Text(s)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(v.into())
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<Value> for RequestBody {
    fn from(v: Value) -> Self {
        RequestBody::Json(v)
    }
}

impl From<FormParams> for RequestBody {
    fn from(p: FormParams) -> Self {
        RequestBody::Form(p)
    }
}

impl From<multipart::Form> for RequestBody {
    fn from(f: multipart::Form) -> Self {
        RequestBody::Multipart(f)
    }
}

/// The encoded payload handed to the transport.
#[derive(Debug, Default)]
pub(crate) enum WireBody {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Multipart(multipart::Form),
}

/// Structured view of the request body, for middleware consumption.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    /// Decoded JSON, or a form decoded into a flat object of strings.
    Structured(Value),
    /// Raw text (including JSON that failed to parse).
    Text(String),
    /// Raw bytes that were not decoded.
    Binary(Bytes),
    /// A multipart form; its parts are not inspectable.
    Multipart,
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

/// Encode `body` for the wire, filling in `Content-Type` when absent.
pub(crate) fn encode(body: Option<RequestBody>, headers: &mut HeaderMap) -> FetchResult<WireBody> {
    let wire = match body {
        None => WireBody::Empty,
        Some(RequestBody::Multipart(form)) => WireBody::Multipart(form),
        Some(RequestBody::Form(params)) => {
            set_default_content_type(headers, FORM_CONTENT_TYPE);
            WireBody::Text(params.encode())
        }
        Some(RequestBody::Json(value)) => {
            set_default_content_type(headers, JSON_CONTENT_TYPE);
            WireBody::Text(serde_json::to_string(&value)?)
        }
        Some(RequestBody::Text(text)) => WireBody::Text(text),
        Some(RequestBody::Bytes(bytes)) => WireBody::Bytes(bytes),
    };
    Ok(wire)
}

fn set_default_content_type(headers: &mut HeaderMap, content_type: &'static str) {
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
}

/// Build the structured view of `wire` according to its `Content-Type`.
pub(crate) fn decode(wire: &WireBody, headers: &HeaderMap) -> Payload {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let text = match wire {
        WireBody::Empty => return Payload::Empty,
        WireBody::Multipart(_) => return Payload::Multipart,
        WireBody::Text(text) => text.as_str(),
        WireBody::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return Payload::Binary(bytes.clone()),
        },
    };

    if content_type.contains("application/json") {
        match serde_json::from_str(text) {
            Ok(value) => Payload::Structured(value),
            Err(e) => {
                tracing::debug!(error = %e, "Request body is not valid JSON, keeping raw text");
                Payload::Text(text.to_string())
            }
        }
    } else if content_type.contains("application/x-www-form-urlencoded") {
        Payload::Structured(Value::Object(decode_form(text)))
    } else {
        match wire {
            WireBody::Bytes(bytes) => Payload::Binary(bytes.clone()),
            _ => Payload::Text(text.to_string()),
        }
    }
}

/// Flat form decoding: repeated keys collect into arrays, no bracket nesting.
fn decode_form(text: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in form_urlencoded::parse(text.as_bytes()).into_owned() {
        let value = Value::String(value);
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content_type(headers: &HeaderMap) -> Option<&str> {
        headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_no_body_no_content_type() {
        let mut headers = HeaderMap::new();
        let wire = encode(None, &mut headers).unwrap();
        assert!(matches!(wire, WireBody::Empty));
        assert!(headers.is_empty());
        assert_eq!(decode(&wire, &headers), Payload::Empty);
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let mut headers = HeaderMap::new();
        let wire = encode(Some(json!({"name": "Alice"}).into()), &mut headers).unwrap();
        assert_eq!(content_type(&headers), Some(JSON_CONTENT_TYPE));
        match &wire {
            WireBody::Text(text) => assert_eq!(text, r#"{"name":"Alice"}"#),
            other => panic!("unexpected wire body: {other:?}"),
        }
        assert_eq!(decode(&wire, &headers), Payload::Structured(json!({"name": "Alice"})));
    }

    #[test]
    fn test_json_body_keeps_explicit_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let wire = encode(Some(json!([1, 2]).into()), &mut headers).unwrap();
        assert_eq!(content_type(&headers), Some("text/plain"));
        assert_eq!(decode(&wire, &headers), Payload::Text("[1,2]".into()));
    }

    #[test]
    fn test_form_body_untouched() {
        let mut headers = HeaderMap::new();
        let params = FormParams::new().append("a", "1").append("b", "two words");
        let wire = encode(Some(params.into()), &mut headers).unwrap();
        assert_eq!(content_type(&headers), Some(FORM_CONTENT_TYPE));
        match &wire {
            WireBody::Text(text) => assert_eq!(text, "a=1&b=two+words"),
            other => panic!("unexpected wire body: {other:?}"),
        }
        assert_eq!(
            decode(&wire, &headers),
            Payload::Structured(json!({"a": "1", "b": "two words"}))
        );
    }

    #[test]
    fn test_malformed_json_degrades_to_text() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        let wire = encode(Some("{not json".into()), &mut headers).unwrap();
        assert_eq!(decode(&wire, &headers), Payload::Text("{not json".into()));
    }

    #[test]
    fn test_json_bytes_are_decoded() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let wire = encode(Some(b"{\"ok\":true}".to_vec().into()), &mut headers).unwrap();
        assert_eq!(decode(&wire, &headers), Payload::Structured(json!({"ok": true})));
    }

    #[test]
    fn test_opaque_payloads_pass_through() {
        let mut headers = HeaderMap::new();
        let wire = encode(Some(RequestBody::bytes(vec![0xff, 0x00])), &mut headers).unwrap();
        assert!(headers.is_empty());
        assert_eq!(decode(&wire, &headers), Payload::Binary(Bytes::from_static(&[0xff, 0x00])));

        let wire = encode(Some("plain".into()), &mut headers).unwrap();
        assert_eq!(decode(&wire, &headers), Payload::Text("plain".into()));
    }

    #[test]
    fn test_multipart_is_opaque() {
        let mut headers = HeaderMap::new();
        let form = multipart::Form::new().text("field", "value");
        let wire = encode(Some(form.into()), &mut headers).unwrap();
        assert!(headers.is_empty());
        assert_eq!(decode(&wire, &headers), Payload::Multipart);
    }

    #[test]
    fn test_form_decoding_collects_repeats() {
        let map = decode_form("k=1&k=2&x=y");
        assert_eq!(Value::Object(map), json!({"k": ["1", "2"], "x": "y"}));
    }
}
