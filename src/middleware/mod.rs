//! Interceptor pipeline.
//!
//! # Data Flow
//! ```text
//! FetchClient::fetch
//!     → stack.rs (snapshot of registered middlewares)
//!     → engine.rs (Chain: walk the snapshot in order)
//!         → middleware[0](req, res, next)
//!             → next.run(req, res) → middleware[1](...) → ...
//!     → past the end, or a middleware stops calling next
//! ```
//!
//! # Design Decisions
//! - Middlewares borrow the request/response records for the length of
//!   their call and hand them to `Next::run` to continue
//! - Not calling `next` is a legal short-circuit
//! - A continuation used twice is an error, detected by both a per-`Next`
//!   flag and the chain's monotonic index

use futures_util::future::BoxFuture;

use crate::error::FetchResult;
use crate::http::{RequestRecord, ResponseRecord};

pub mod engine;
pub mod request_id;
pub mod stack;
pub mod trace;

pub use engine::Next;
pub use request_id::RequestIdMiddleware;
pub use stack::MiddlewareStack;
pub use trace::TraceMiddleware;

/// An interceptor run once per dispatch, in registration order.
pub trait Middleware: Send + Sync {
    /// Inspect or mutate the request, write to the response, and decide
    /// whether to continue with `next.run(req, res)`.
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestRecord,
        res: &'a mut ResponseRecord,
        next: Next<'a>,
    ) -> BoxFuture<'a, FetchResult<()>>;

    /// Name used in log output.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Middleware backed by a closure. See [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a mut RequestRecord,
            &'a mut ResponseRecord,
            Next<'a>,
        ) -> BoxFuture<'a, FetchResult<()>>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestRecord,
        res: &'a mut ResponseRecord,
        next: Next<'a>,
    ) -> BoxFuture<'a, FetchResult<()>> {
        (self.f)(req, res, next)
    }

    fn name(&self) -> &'static str {
        "fn"
    }
}

/// Build a middleware from a closure returning a boxed future.
///
/// ```no_run
/// use fetch_middleware::middleware::from_fn;
///
/// let mw = from_fn(|req, res, next| {
///     Box::pin(async move {
///         req.headers.insert("x-client", "docs".parse().unwrap());
///         next.run(req, res).await
///     })
/// });
/// # let _ = mw;
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a mut RequestRecord,
            &'a mut ResponseRecord,
            Next<'a>,
        ) -> BoxFuture<'a, FetchResult<()>>
        + Send
        + Sync,
{
    FnMiddleware { f }
}
