//! Middleware registry.
//!
//! # Responsibilities
//! - Hold the ordered list of registered middlewares
//! - Hand each dispatch an immutable snapshot of that list
//!
//! # Design Decisions
//! - Append-only; there is no removal
//! - Lock-free reads via `ArcSwap`; a push never affects a chain that is
//!   already walking its snapshot
//! - One registry per client rather than a process-wide global

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::middleware::Middleware;

/// Ordered, appendable list of middlewares shared by all dispatches of a client.
pub struct MiddlewareStack {
    entries: ArcSwap<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register a middleware at the end of the list.
    pub fn push<M: Middleware + 'static>(&self, middleware: M) {
        self.push_arc(Arc::new(middleware));
    }

    /// Register an already shared middleware.
    pub fn push_arc(&self, middleware: Arc<dyn Middleware>) {
        tracing::debug!(middleware = middleware.name(), "Registering middleware");
        self.entries.rcu(|current| {
            let mut entries = Vec::clone(current);
            entries.push(middleware.clone());
            entries
        });
    }

    /// The list as of now. Later pushes do not show up in the returned value.
    pub fn snapshot(&self) -> Arc<Vec<Arc<dyn Middleware>>> {
        self.entries.load_full()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MiddlewareStack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.entries.load().iter().map(|m| m.name()).collect();
        f.debug_struct("MiddlewareStack").field("entries", &names).finish()
    }
}
