//! Request ID middleware.
//!
//! Tags each outbound request with a UUID v4 header unless the caller (or an
//! earlier middleware) already set one.

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderName, HeaderValue};
use uuid::Uuid;

use crate::error::{FetchError, FetchResult};
use crate::http::{RequestRecord, ResponseRecord};
use crate::middleware::{Middleware, Next};

/// Default header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestIdMiddleware {
    header: HeaderName,
}

impl RequestIdMiddleware {
    pub fn new() -> Self {
        Self {
            header: HeaderName::from_static(X_REQUEST_ID),
        }
    }

    /// Use a custom header name.
    pub fn with_header(header: &str) -> FetchResult<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(header.to_string()))?;
        Ok(Self { header })
    }
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestIdMiddleware {
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestRecord,
        res: &'a mut ResponseRecord,
        next: Next<'a>,
    ) -> BoxFuture<'a, FetchResult<()>> {
        Box::pin(async move {
            if !req.headers.contains_key(&self.header) {
                let id = Uuid::new_v4().to_string();
                let value = HeaderValue::from_str(&id)
                    .map_err(|_| FetchError::InvalidHeader(id.clone()))?;
                req.headers.insert(self.header.clone(), value);
                tracing::debug!(request_id = %id, header = %self.header, "Assigned request ID");
            }
            next.run(req, res).await
        })
    }

    fn name(&self) -> &'static str {
        "request_id"
    }
}
