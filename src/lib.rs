//! HTTP fetch wrapper with an interceptor pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!   fetch(input, init)
//!        │
//!        ▼
//!   ┌──────────┐   ┌─────────────┐   ┌────────────────┐
//!   │ compose  │──▶│  normalize  │──▶│ ResponseRecord │
//!   │ URL+query│   │RequestRecord│   │    (empty)     │
//!   └──────────┘   └─────────────┘   └───────┬────────┘
//!                                            ▼
//!                        ┌───────────────────────────────────┐
//!                        │ middleware chain (registry order) │
//!                        │  mw[0] → next → mw[1] → next → …  │
//!                        └───────────────┬───────────────────┘
//!                         finalized?     │
//!                  ┌──────── yes ────────┴──────── no ───────┐
//!                  ▼                                          ▼
//!        deliverable from middleware              one reqwest call with the
//!                                                 (mutated) request record
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fetch_middleware::{FetchClient, FetchInit, TraceMiddleware};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), fetch_middleware::FetchError> {
//! let client = FetchClient::new().with(TraceMiddleware::new());
//! let res = client
//!     .fetch(
//!         "https://api.example.com/users",
//!         FetchInit::new().query(json!({"page": 2})).json(json!({"name": "Alice"})),
//!     )
//!     .await?;
//! println!("{} {}", res.status, res.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod observability;

pub use client::FetchClient;
pub use config::ClientConfig;
pub use error::{FetchError, FetchResult};
pub use http::{
    FetchInit, FetchInput, FetchResponse, FormParams, Payload, RequestBody, RequestRecord,
    ResponseRecord, ResponseSource,
};
pub use middleware::{
    from_fn, Middleware, MiddlewareStack, Next, RequestIdMiddleware, TraceMiddleware,
};
