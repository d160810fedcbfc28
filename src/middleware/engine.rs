//! Chain execution.
//!
//! # States
//! ```text
//! reached = 0 (before index 0)
//! advance(i):  i < reached        → DoubleInvocation
//!              i >= reached       → reached = i + 1
//!                                   middleware[i] exists → run it with Next(i + 1)
//!                                   otherwise            → done (fall through)
//! ```
//!
//! # Design Decisions
//! - One `Chain` per dispatch; concurrent dispatches never share state
//! - Each `Next` is single-use on its own, independently of the index check
//! - Middleware futures are awaited in sequence; nothing runs in parallel

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::error::{FetchError, FetchResult};
use crate::http::{RequestRecord, ResponseRecord};
use crate::middleware::Middleware;

/// Per-dispatch walk over a snapshot of the middleware list.
pub(crate) struct Chain {
    stack: Arc<Vec<Arc<dyn Middleware>>>,
    /// One past the highest index entered so far.
    reached: AtomicUsize,
}

impl Chain {
    pub(crate) fn new(stack: Arc<Vec<Arc<dyn Middleware>>>) -> Self {
        Self {
            stack,
            reached: AtomicUsize::new(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.stack.len()
    }

    /// Run the chain from the first middleware.
    pub(crate) async fn run(
        &self,
        req: &mut RequestRecord,
        res: &mut ResponseRecord,
    ) -> FetchResult<()> {
        self.advance(0, req, res).await
    }

    fn advance<'a>(
        &'a self,
        index: usize,
        req: &'a mut RequestRecord,
        res: &'a mut ResponseRecord,
    ) -> BoxFuture<'a, FetchResult<()>> {
        async move {
            self.claim(index)?;

            let Some(middleware) = self.stack.get(index) else {
                tracing::trace!(index, "End of middleware chain");
                return Ok(());
            };

            tracing::debug!(index, middleware = middleware.name(), "Running middleware");
            middleware.handle(req, res, Next::new(self, index + 1)).await
        }
        .boxed()
    }

    /// Move the high-water mark to `index`, rejecting anything already passed.
    fn claim(&self, index: usize) -> FetchResult<()> {
        self.reached
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reached| {
                (index >= reached).then_some(index + 1)
            })
            .map(|_| ())
            .map_err(|_| FetchError::DoubleInvocation { index })
    }
}

/// Continuation handed to a middleware; advances to the next one.
pub struct Next<'a> {
    chain: &'a Chain,
    index: usize,
    called: AtomicBool,
}

impl<'a> Next<'a> {
    fn new(chain: &'a Chain, index: usize) -> Self {
        Self {
            chain,
            index,
            called: AtomicBool::new(false),
        }
    }

    /// Index of the middleware this continuation runs.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Run the rest of the chain.
    ///
    /// Fails with `FetchError::DoubleInvocation` when called a second time.
    pub fn run<'b>(
        &'b self,
        req: &'b mut RequestRecord,
        res: &'b mut ResponseRecord,
    ) -> BoxFuture<'b, FetchResult<()>> {
        if self.called.swap(true, Ordering::AcqRel) {
            tracing::warn!(index = self.index, "next() called more than once");
            return future::ready(Err(FetchError::DoubleInvocation { index: self.index })).boxed();
        }
        self.chain.advance(self.index, req, res)
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("called", &self.called.load(Ordering::Relaxed))
            .finish()
    }
}
