//! URL composition.
//!
//! # Responsibilities
//! - Append a structured query object to a base URL
//! - Extract an explicit `scheme://` token from a raw URL string
//! - Resolve relative inputs against a configured base URL
//!
//! # Design Decisions
//! - Composition works on strings; parsing happens once, afterwards
//! - An empty serialized query leaves the base untouched (no dangling `?`)

use serde_json::Value;
use url::{Position, Url};

use crate::error::{FetchError, FetchResult};
use crate::http::query;

/// Merge an optional query object into `base`.
///
/// Uses `&` when `base` already carries a query string, `?` otherwise.
pub fn compose(base: &str, query: Option<&Value>) -> String {
    let Some(query) = query else {
        return base.to_string();
    };

    let encoded = query::stringify(query);
    if encoded.is_empty() {
        return base.to_string();
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{encoded}")
}

/// Return the scheme token of `^(\w+)://`, if the string starts with one.
pub fn protocol_of(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once("://")?;
    let is_word = !scheme.is_empty()
        && scheme.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    is_word.then_some(scheme)
}

/// Parse `url`, joining it onto `base` when it is relative.
pub fn resolve(url: &str, base: Option<&Url>) -> FetchResult<Url> {
    let parsed = match (Url::parse(url), base) {
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base.join(url),
        (result, _) => result,
    };
    parsed.map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

/// The path and query of `url`, without scheme, host or fragment.
pub fn path_and_query(url: &Url) -> String {
    url[Position::BeforePath..Position::AfterQuery].to_string()
}
