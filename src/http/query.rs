//! Nested query-string codec.
//!
//! # Responsibilities
//! - Serialize structured values into bracketed query strings (`a[b]=1`, `a[0]=x`)
//! - Parse query strings back into nested maps and arrays
//! - Coerce all-digit values into numbers
//!
//! # Design Decisions
//! - Brackets are percent-encoded on output, like most browser-side encoders
//! - Numeric bracket segments become arrays only when every key is an index
//!   no larger than `ARRAY_LIMIT`; anything else stays an object
//! - Repeated plain keys (`a=1&a=2`) collect into an array
//! - Bracket nesting stops at `MAX_DEPTH`; deeper groups stay one literal key
//! - `null` members are skipped when serializing

use serde_json::{Map, Number, Value};
use url::form_urlencoded;

/// Highest index that is still decoded into an array slot.
const ARRAY_LIMIT: usize = 20;

/// Bracket groups decoded per key before the remainder is kept literally.
const MAX_DEPTH: usize = 5;

/// Serialize a structured value into a query string (no leading `?`).
///
/// Objects and arrays are flattened with bracket notation. Scalars at the
/// top level have no key to attach to and serialize to an empty string.
pub fn stringify(value: &Value) -> String {
    let mut pairs = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                flatten(key.clone(), item, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(i.to_string(), item, &mut pairs);
            }
        }
        _ => {}
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((prefix, b.to_string())),
        Value::Number(n) => out.push((prefix, n.to_string())),
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{prefix}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten(format!("{prefix}[{key}]"), item, out);
            }
        }
    }
}

/// Parse a query string (without the leading `?`) into a nested map.
///
/// All-digit leaf values are coerced to numbers.
pub fn parse(query: &str) -> Map<String, Value> {
    let mut root = Map::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        let segments = split_key(&key);
        insert(&mut root, &segments, Value::String(value.into_owned()));
    }

    root.into_iter()
        .map(|(key, value)| (key, coerce_numbers(compact(value))))
        .collect()
}

/// Split `a[b][]` into `["a", "b", ""]`.
///
/// Past `MAX_DEPTH` groups the rest of the key becomes a single segment, so
/// `a[b][c][d][e][f][g][h]` ends in `"[g][h]"`.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[').filter(|&i| i > 0) else {
        return vec![key.to_string()];
    };

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        if segments.len() > MAX_DEPTH {
            break;
        }
        match stripped.find(']') {
            Some(close) => {
                segments.push(stripped[..close].to_string());
                rest = &stripped[close + 1..];
            }
            None => break,
        }
    }
    if segments.len() == 1 {
        return vec![key.to_string()];
    }
    if !rest.is_empty() {
        // Unbalanced brackets after a valid group: keep the tail literally.
        segments.push(rest.to_string());
    }
    segments
}

fn insert(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };
    let key = if head.is_empty() {
        map.len().to_string()
    } else {
        head.clone()
    };

    if tail.is_empty() {
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
        return;
    }

    let child = map.entry(key).or_insert(Value::Null);
    let nested = match child.take() {
        Value::Object(existing) => existing,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        _ => Map::new(),
    };
    *child = Value::Object(nested);
    if let Value::Object(child_map) = child {
        insert(child_map, tail, value);
    }
}

/// Turn index-keyed objects into arrays, recursively.
fn compact(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let all_indices = !map.is_empty()
                && map.keys().all(|k| {
                    is_digits(k) && k.parse::<usize>().is_ok_and(|i| i <= ARRAY_LIMIT)
                });
            if all_indices {
                let mut indexed: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, compact(v))))
                    .collect();
                indexed.sort_by_key(|(i, _)| *i);
                Value::Array(indexed.into_iter().map(|(_, v)| v).collect())
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, compact(v))).collect())
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(compact).collect()),
        other => other,
    }
}

/// Replace every all-digit string with a number, recursively.
pub fn coerce_numbers(value: Value) -> Value {
    match value {
        Value::String(s) if is_digits(&s) => to_number(&s).unwrap_or(Value::String(s)),
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, coerce_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn to_number(s: &str) -> Option<Value> {
    if let Ok(n) = s.parse::<u64>() {
        return Some(Value::Number(n.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
