//! Tracing middleware.
//!
//! Opens a span around everything registered after it and logs how the
//! chain ended: short-circuited by a middleware, falling through to the
//! network, or failed.

use std::time::Instant;

use futures_util::future::BoxFuture;
use tracing::Instrument;

use crate::error::FetchResult;
use crate::http::{RequestRecord, ResponseRecord};
use crate::middleware::{Middleware, Next};

#[derive(Debug, Clone, Default)]
pub struct TraceMiddleware;

impl TraceMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for TraceMiddleware {
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestRecord,
        res: &'a mut ResponseRecord,
        next: Next<'a>,
    ) -> BoxFuture<'a, FetchResult<()>> {
        let span = tracing::info_span!(
            "fetch",
            method = %req.method,
            url = %req.url(),
            protocol = %req.protocol(),
        );

        Box::pin(
            async move {
                let start = Instant::now();
                let result = next.run(req, res).await;
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(()) if res.is_finalized() => tracing::info!(
                        status = res.status_code(),
                        elapsed_ms,
                        "Response produced by middleware"
                    ),
                    Ok(()) => tracing::debug!(elapsed_ms, "Chain complete, dispatching to network"),
                    Err(e) => tracing::warn!(error = %e, elapsed_ms, "Middleware chain failed"),
                }
                result
            }
            .instrument(span),
        )
    }

    fn name(&self) -> &'static str {
        "trace"
    }
}
