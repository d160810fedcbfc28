//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every field has a default so an empty file is a valid configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for a `FetchClient`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL that relative request URLs are resolved against.
    pub base_url: Option<String>,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Headers added to every request; per-call headers override them.
    pub default_headers: BTreeMap<String, String>,

    /// Request ID middleware settings.
    pub request_id: RequestIdConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: concat!("fetch-middleware/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers: BTreeMap::new(),
            request_id: RequestIdConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Request ID middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestIdConfig {
    /// Register the request ID middleware on the client.
    pub enabled: bool,

    /// Header carrying the generated ID.
    pub header: String,
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header: "x-request-id".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. `info`, `fetch_middleware=debug`).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
