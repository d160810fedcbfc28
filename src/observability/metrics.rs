//! Dispatch metrics.
//!
//! # Metrics
//! - `fetch_dispatch_total` (counter): dispatches by method and outcome
//! - `fetch_dispatch_duration_seconds` (histogram): latency by outcome
//!
//! Outcomes: `middleware` (short-circuited), `network`, `error`.

use std::time::Instant;

use reqwest::Method;

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Middleware,
    Network,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Middleware => "middleware",
            Outcome::Network => "network",
            Outcome::Error => "error",
        }
    }
}

/// Record a finished dispatch.
pub fn record_dispatch(method: &Method, outcome: Outcome, start: Instant) {
    ::metrics::counter!(
        "fetch_dispatch_total",
        "method" => method.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    ::metrics::histogram!("fetch_dispatch_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}
